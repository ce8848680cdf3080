//! PlatformIO manifest patching.
//!
//! Points an existing `package.json` at a freshly built archive: the
//! per-platform URL becomes a `file://` reference, the per-platform digest
//! is replaced, and the version is refreshed when one is known. The whole
//! document is read, modified, and written back, so every other key keeps
//! its value and position.

use crate::archive::{ArchiveError, PackageArtifact, metadata_path_for, read_metadata};
use crate::digest::{Sha256Digest, compute_sha256};
use log::{info, warn};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while patching a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest exists but could not be read or written.
    #[error("failed to access manifest {path}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The manifest is not valid JSON.
    #[error("manifest {path} is not valid JSON")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest, or one of its `urls`/`sha256` members, is not an object.
    #[error("manifest {path}: `{key}` is not a JSON object")]
    NotAnObject {
        /// Manifest path.
        path: PathBuf,
        /// Offending key; `.` for the document root.
        key: String,
    },

    /// The patched document could not be serialized.
    #[error("failed to serialize manifest")]
    Serialization(#[source] serde_json::Error),

    /// The archive's metadata sidecar could not be used.
    #[error(transparent)]
    Metadata(#[from] ArchiveError),

    /// Hashing the archive failed.
    #[error("failed to hash archive {path}")]
    Digest {
        /// Archive path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Whether an existing remote URL may be replaced by a local one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UrlPolicy {
    /// Always write the new URL.
    #[default]
    Replace,
    /// Leave an existing `http://` or `https://` URL untouched.
    KeepRemote,
}

/// When a new version is written into a manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Replace the version only when the manifest already has one.
    #[default]
    IfPresent,
    /// Always write the version, adding the key when missing.
    Always,
}

/// Fields to write into a manifest for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestUpdate {
    /// Platform key inside `urls` and `sha256`, e.g. `linux_x86_64`.
    pub platform: String,
    /// New download URL, if the URL should change.
    pub url: Option<String>,
    /// New digest, if the digest should change.
    pub sha256: Option<Sha256Digest>,
    /// New version, applied according to `version_policy`.
    pub version: Option<String>,
    /// Treatment of existing remote URLs.
    pub url_policy: UrlPolicy,
    /// Treatment of a missing `version` key.
    pub version_policy: VersionPolicy,
}

impl ManifestUpdate {
    /// Update pointing `platform` at a built artifact.
    #[must_use]
    pub fn for_artifact(artifact: &PackageArtifact, platform: &str) -> Self {
        Self {
            platform: platform.to_owned(),
            url: Some(file_url(&artifact.archive_path)),
            sha256: Some(artifact.sha256.clone()),
            version: Some(artifact.version.clone()),
            url_policy: UrlPolicy::Replace,
            version_policy: VersionPolicy::IfPresent,
        }
    }

    /// Update built from an archive and its metadata sidecar.
    ///
    /// Digest and version come from the sidecar when it exists; otherwise
    /// the digest is computed from the archive and the version is left
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Metadata`] for an unreadable sidecar and
    /// [`ManifestError::Digest`] when hashing the archive fails.
    pub fn from_sidecar(archive_path: &Path, platform: &str) -> Result<Self, ManifestError> {
        let sidecar = metadata_path_for(archive_path);
        let (sha256, version) = if sidecar.is_file() {
            let metadata = read_metadata(&sidecar)?;
            (metadata.sha256, Some(metadata.version))
        } else {
            let digest = compute_sha256(archive_path).map_err(|source| ManifestError::Digest {
                path: archive_path.to_path_buf(),
                source,
            })?;
            (digest, None)
        };
        Ok(Self {
            platform: platform.to_owned(),
            url: Some(file_url(archive_path)),
            sha256: Some(sha256),
            version,
            url_policy: UrlPolicy::Replace,
            version_policy: VersionPolicy::IfPresent,
        })
    }

    /// Set the URL policy.
    #[must_use]
    pub const fn with_url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }
}

/// Result of a patch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The manifest does not exist; nothing was written.
    Skipped,
    /// The manifest was rewritten.
    Patched {
        /// URL now recorded for the platform, if any.
        url: Option<String>,
        /// Digest now recorded for the platform, if any.
        sha256: Option<Sha256Digest>,
    },
}

/// `file://` URL for an archive, made absolute against the working
/// directory when needed.
#[must_use]
pub fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

/// Apply `update` to the manifest at `path`.
///
/// A missing manifest is not an error: a warning is logged and
/// [`PatchOutcome::Skipped`] returned. Missing `urls` and `sha256` objects
/// are created. The document is written back as two-space indented JSON
/// with a trailing newline.
///
/// # Errors
///
/// Returns [`ManifestError`] if the manifest cannot be read, parsed, or
/// written, or has a non-object where an object is required.
pub fn patch_manifest(path: &Path, update: &ManifestUpdate) -> Result<PatchOutcome, ManifestError> {
    if !path.is_file() {
        warn!("package.json not found: {}", path.display());
        return Ok(PatchOutcome::Skipped);
    }
    let io_err = |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let text = fs::read_to_string(path).map_err(io_err)?;
    let mut document: Value = serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let root = document
        .as_object_mut()
        .ok_or_else(|| not_an_object(path, "."))?;

    let mut recorded_url = None;
    if let Some(url) = &update.url {
        let urls = child_object(root, "urls", path)?;
        let keep = update.url_policy == UrlPolicy::KeepRemote
            && urls
                .get(&update.platform)
                .and_then(Value::as_str)
                .is_some_and(is_remote_url);
        if keep {
            info!("keeping remote URL for {}", update.platform);
        } else {
            urls.insert(update.platform.clone(), Value::String(url.clone()));
        }
        recorded_url = urls
            .get(&update.platform)
            .and_then(Value::as_str)
            .map(str::to_owned);
    }
    if let Some(sha256) = &update.sha256 {
        let digests = child_object(root, "sha256", path)?;
        digests.insert(update.platform.clone(), Value::String(sha256.to_string()));
    }
    if let Some(version) = &update.version {
        match (update.version_policy, root.get_mut("version")) {
            (_, Some(slot)) => *slot = Value::String(version.clone()),
            (VersionPolicy::Always, None) => {
                root.insert("version".to_owned(), Value::String(version.clone()));
            }
            (VersionPolicy::IfPresent, None) => {}
        }
    }

    let mut json =
        serde_json::to_string_pretty(&document).map_err(ManifestError::Serialization)?;
    json.push('\n');
    fs::write(path, json).map_err(io_err)?;
    info!("updated {}", path.display());
    Ok(PatchOutcome::Patched {
        url: recorded_url,
        sha256: update.sha256.clone(),
    })
}

fn is_remote_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn not_an_object(path: &Path, key: &str) -> ManifestError {
    ManifestError::NotAnObject {
        path: path.to_path_buf(),
        key: key.to_owned(),
    }
}

/// Get `root[key]` as an object, inserting an empty one when missing.
fn child_object<'m>(
    root: &'m mut Map<String, Value>,
    key: &str,
    path: &Path,
) -> Result<&'m mut Map<String, Value>, ManifestError> {
    root.entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| not_an_object(path, key))
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
