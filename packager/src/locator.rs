//! Installer locator.
//!
//! Maps component kinds to their expected paths inside an extracted S32
//! Design Studio installer and measures what it finds. A missing component
//! is reported as [`Lookup::Absent`]; only a missing installer root or
//! layout directory is an error.

use crate::component::{ComponentKind, InstallerComponent, Lookup};
use crate::config::{ComponentSettings, PackagerConfig};
use log::{debug, trace};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised when the installer tree itself is unusable.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// The installer root does not exist.
    #[error("installer root not found: {0}")]
    InstallerRootNotFound(PathBuf),

    /// The installer root exists but has no layout directory.
    #[error("layout directory not found: {0}")]
    LayoutNotFound(PathBuf),

    /// A configured plugin pattern is not a valid glob.
    #[error("invalid plugin pattern \"{pattern}\" for {kind}")]
    InvalidPattern {
        /// Component whose settings carry the pattern.
        kind: ComponentKind,
        /// The rejected pattern.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: glob::PatternError,
    },
}

/// File count and byte total of a directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of regular files.
    pub files_count: u64,
    /// Sum of the sizes of the files that could be inspected.
    pub total_size: u64,
}

/// Walk `dir` once, counting regular files and summing their sizes.
///
/// Symlinks are followed. Entries that cannot be read, and files whose
/// size cannot be determined, are skipped rather than reported.
#[must_use]
pub fn tree_stats(dir: &Path) -> TreeStats {
    let mut stats = TreeStats::default();
    for entry in WalkDir::new(dir).follow_links(true).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                trace!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        stats.files_count += 1;
        match entry.metadata() {
            Ok(meta) => stats.total_size += meta.len(),
            Err(err) => trace!("skipping size of {}: {err}", entry.path().display()),
        }
    }
    stats
}

/// Locates installer components below `<installer_root>/<layout_dir>`.
#[derive(Debug)]
pub struct InstallerLocator<'a> {
    installer_root: PathBuf,
    layout_dir: PathBuf,
    config: &'a PackagerConfig,
}

impl<'a> InstallerLocator<'a> {
    /// Create a locator for an extracted installer.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::InstallerRootNotFound`] or
    /// [`LocatorError::LayoutNotFound`] when the tree is missing, and
    /// [`LocatorError::InvalidPattern`] for a malformed plugin glob.
    pub fn new(installer_root: &Path, config: &'a PackagerConfig) -> Result<Self, LocatorError> {
        if !installer_root.is_dir() {
            return Err(LocatorError::InstallerRootNotFound(
                installer_root.to_path_buf(),
            ));
        }
        let layout_dir = installer_root.join(config.layout_dir.as_std_path());
        if !layout_dir.is_dir() {
            return Err(LocatorError::LayoutNotFound(layout_dir));
        }
        for kind in ComponentKind::ALL {
            if let Some(pattern) = &config.component(kind).plugin_pattern {
                glob::Pattern::new(pattern).map_err(|source| LocatorError::InvalidPattern {
                    kind,
                    pattern: pattern.clone(),
                    source,
                })?;
            }
        }
        Ok(Self {
            installer_root: installer_root.to_path_buf(),
            layout_dir,
            config,
        })
    }

    /// Installer root this locator inspects.
    #[must_use]
    pub fn installer_root(&self) -> &Path {
        &self.installer_root
    }

    /// Layout directory below the installer root.
    #[must_use]
    pub fn layout_dir(&self) -> &Path {
        &self.layout_dir
    }

    /// Configuration the locator was built with.
    #[must_use]
    pub const fn config(&self) -> &'a PackagerConfig {
        self.config
    }

    /// Look up one component kind.
    #[must_use]
    pub fn find(&self, kind: ComponentKind) -> Lookup {
        let settings = self.config.component(kind);
        let source = self.layout_dir.join(settings.source.as_std_path());
        let found = match kind {
            ComponentKind::DebuggerServer => self.find_plugin(&source, settings),
            ComponentKind::Toolchain => {
                source.is_dir().then(|| (source, Some(settings.default_version.clone())))
            }
            ComponentKind::RuntimeLibrary | ComponentKind::Drivers => {
                source.is_dir().then_some((source, None))
            }
        };
        match found {
            Some((path, version)) => {
                let stats = tree_stats(&path);
                debug!(
                    "found {kind} at {} ({} files, {} bytes)",
                    path.display(),
                    stats.files_count,
                    stats.total_size
                );
                Lookup::Found(InstallerComponent {
                    kind,
                    path,
                    version,
                    description: Some(settings.description.clone()),
                    files_count: stats.files_count,
                    total_size: stats.total_size,
                })
            }
            None => {
                debug!("{kind} not present in {}", self.layout_dir.display());
                Lookup::Absent
            }
        }
    }

    /// Look up the GCC toolchain.
    #[must_use]
    pub fn find_toolchain(&self) -> Lookup {
        self.find(ComponentKind::Toolchain)
    }

    /// Look up the P&E Micro GDB server.
    #[must_use]
    pub fn find_pegdbserver(&self) -> Lookup {
        self.find(ComponentKind::DebuggerServer)
    }

    /// Look up the EWL runtime libraries.
    #[must_use]
    pub fn find_ewl_libraries(&self) -> Lookup {
        self.find(ComponentKind::RuntimeLibrary)
    }

    /// Look up the USB drivers.
    #[must_use]
    pub fn find_drivers(&self) -> Lookup {
        self.find(ComponentKind::Drivers)
    }

    /// Run every lookup and keep the components that were found.
    #[must_use]
    pub fn analyze(&self) -> BTreeMap<ComponentKind, InstallerComponent> {
        ComponentKind::ALL
            .into_iter()
            .filter_map(|kind| self.find(kind).into_option().map(|c| (kind, c)))
            .collect()
    }

    /// Pick the greatest plugin directory matching the configured pattern.
    fn find_plugin(
        &self,
        plugins_dir: &Path,
        settings: &ComponentSettings,
    ) -> Option<(PathBuf, Option<String>)> {
        let plugin = settings
            .plugin_pattern
            .as_deref()
            .and_then(|pattern| latest_match(plugins_dir, pattern))?;
        let version = plugin
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(version_from_dir_name);
        let path = match &settings.platform_subdir {
            Some(subdir) => plugin.join(subdir),
            None => plugin,
        };
        path.is_dir().then_some((path, version))
    }
}

/// Lexicographically greatest directory in `dir` whose name matches `pattern`.
fn latest_match(dir: &Path, pattern: &str) -> Option<PathBuf> {
    let pattern = glob::Pattern::new(pattern).ok()?;
    let entries = fs::read_dir(dir).ok()?;
    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| pattern.matches(name))
        .max()
        .map(|name| dir.join(name))
}

/// Derive a version from a plugin directory name.
///
/// Everything after the first underscore is the version, with any further
/// underscores read as dots: `com.pemicro.debug.gdbjtag.ppc_1.7.2.201709281658`
/// yields `1.7.2.201709281658`.
#[must_use]
pub fn version_from_dir_name(name: &str) -> Option<String> {
    let mut segments = name.split('_');
    segments.next()?;
    let version = segments.collect::<Vec<_>>().join(".");
    (!version.is_empty()).then_some(version)
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
