//! Error types for the packager.
//!
//! Each pipeline module owns its error enum; [`PackagerError`] gathers them
//! for the command layer and decides how a failure is reported.

use crate::archive::ArchiveError;
use crate::component::ComponentKind;
use crate::config::ConfigError;
use crate::extractor::ExtractError;
use crate::framework::FrameworkError;
use crate::locator::LocatorError;
use crate::lock::LockError;
use crate::manifest::ManifestError;
use crate::package_name::InvalidPackageName;
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by packager commands.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The installer tree is unusable.
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// A component could not be extracted.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// A package could not be archived.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A platform manifest could not be patched.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The framework could not be repackaged.
    #[error(transparent)]
    Framework(#[from] FrameworkError),

    /// The output directory is locked or unlockable.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A package name given on the command line is malformed.
    #[error(transparent)]
    PackageName(#[from] InvalidPackageName),

    /// The only component a build asked for could not be built.
    #[error("failed to build {kind}: {reason}")]
    ComponentFailed {
        /// Component that failed.
        kind: ComponentKind,
        /// Error message, including its causes.
        reason: String,
    },

    /// No prebuilt toolchain archive was found for `link-local`.
    #[error("no local archive named {file_name} found in {}", display_paths(.searched))]
    LocalArchiveNotFound {
        /// Archive file name that was searched for.
        file_name: String,
        /// Directories that were searched.
        searched: Vec<PathBuf>,
    },

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackagerError {
    /// Return true for mistakes the user can fix from the command line.
    ///
    /// These are reported as a single line without their cause chain.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Locator(_)
                | Self::PackageName(_)
                | Self::Lock(LockError::Busy(_))
                | Self::LocalArchiveNotFound { .. }
        )
    }
}

/// Result type for packager commands.
pub type Result<T> = std::result::Result<T, PackagerError>;

/// Render an error followed by each of its sources, separated by `": "`.
///
/// Transparent wrappers repeat their inner message, so a source whose text
/// equals the previous one is skipped.
#[must_use]
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut previous = rendered.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if text != previous {
            // Writing to a String cannot fail.
            let _ignored = write!(rendered, ": {text}");
            previous = text;
        }
        source = cause.source();
    }
    rendered
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no search directories".to_owned();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
