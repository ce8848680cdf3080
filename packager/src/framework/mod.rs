//! FreeRTOS framework repackaging.
//!
//! Downloads the NXP FreeRTOS release for MPC57xx, extracts its `FreeRTOS`
//! tree into a package directory, and archives it like any harvested
//! component. PlatformIO installs the framework straight from the upstream
//! release, so the digest recorded for manifests is that of the downloaded
//! source archive rather than of the repackaged zip.

pub mod download;
pub mod extraction;

use crate::archive::{ArchiveError, ArchiveRequest, Archiver, PackageArtifact};
use crate::config::PackagerConfig;
use crate::copy::copy_tree;
use crate::digest::{Sha256Digest, compute_sha256};
use crate::locator::tree_stats;
use crate::manifest::{ManifestUpdate, UrlPolicy, VersionPolicy};
use download::{ArchiveDownloader, DownloadError};
use extraction::{ExtractionError, extract_zip};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the downloaded source archive inside the output directory.
pub const SOURCE_ARCHIVE_NAME: &str = "freertos-source.zip";

/// Errors raised while repackaging the framework.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// Downloading the source archive failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extracting the source archive failed.
    #[error("failed to extract {path}")]
    Extraction {
        /// Source archive path.
        path: PathBuf,
        /// Underlying extraction error.
        #[source]
        source: ExtractionError,
    },

    /// The source archive does not contain the expected tree.
    #[error("expected FreeRTOS directory not found in source archive: {0}")]
    MissingSourceTree(PathBuf),

    /// Archiving the package failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Framework metadata could not be serialized.
    #[error("failed to serialize framework metadata")]
    Serialization(#[from] serde_json::Error),

    /// Any other filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Per-run options for [`FrameworkPackager::package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkOptions {
    /// Directory receiving the source archive, package, and metadata.
    pub output_dir: PathBuf,
    /// Source URL overriding the configured one.
    pub url: Option<String>,
    /// Reuse an existing source archive instead of downloading.
    pub skip_download: bool,
}

/// Provenance record written to `<package>.source.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkMetadata {
    /// Framework version.
    pub version: String,
    /// Digest of the downloaded source archive.
    pub source_sha256: Sha256Digest,
    /// Digest of the repackaged zip.
    pub package_sha256: Sha256Digest,
    /// Where the source archive came from.
    pub source_url: String,
}

/// Outcome of a framework repackaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkArtifact {
    /// The repackaged archive.
    pub package: PackageArtifact,
    /// Downloaded source archive.
    pub source_archive: PathBuf,
    /// Provenance record.
    pub metadata: FrameworkMetadata,
    /// Path of the provenance record.
    pub metadata_path: PathBuf,
}

impl FrameworkArtifact {
    /// Manifest update recording the source digest and version.
    ///
    /// The version is written even when the manifest has none.
    ///
    /// The URL is left alone: it keeps pointing at the upstream release.
    #[must_use]
    pub fn manifest_update(&self, platform: &str) -> ManifestUpdate {
        ManifestUpdate {
            platform: platform.to_owned(),
            url: None,
            sha256: Some(self.metadata.source_sha256.clone()),
            version: Some(self.metadata.version.clone()),
            url_policy: UrlPolicy::KeepRemote,
            version_policy: VersionPolicy::Always,
        }
    }
}

/// Repackages the FreeRTOS release.
#[derive(Debug)]
pub struct FrameworkPackager<'a, D> {
    config: &'a PackagerConfig,
    downloader: D,
    archiver: Archiver,
}

impl<'a, D: ArchiveDownloader> FrameworkPackager<'a, D> {
    /// Packager fetching sources through `downloader`.
    #[must_use]
    pub fn new(config: &'a PackagerConfig, downloader: D) -> Self {
        Self {
            config,
            downloader,
            archiver: Archiver::new(),
        }
    }

    /// Use a specific archiver, e.g. one with a fixed timestamp.
    #[must_use]
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = archiver;
        self
    }

    /// Download, extract, repackage, and record provenance.
    ///
    /// # Errors
    ///
    /// Returns [`FrameworkError`] when any step fails.
    pub fn package(&self, options: &FrameworkOptions) -> Result<FrameworkArtifact, FrameworkError> {
        let settings = &self.config.framework;
        let url = options.url.as_deref().unwrap_or(&settings.url);
        fs::create_dir_all(&options.output_dir)?;

        let source_archive = options.output_dir.join(SOURCE_ARCHIVE_NAME);
        if options.skip_download && source_archive.is_file() {
            info!("reusing {}", source_archive.display());
        } else {
            self.downloader.download(url, &source_archive)?;
        }
        let source_sha256 = compute_sha256(&source_archive)?;
        info!("source sha256 {source_sha256}");

        let scratch = tempfile::tempdir_in(&options.output_dir)?;
        extract_zip(&source_archive, scratch.path()).map_err(|source| {
            FrameworkError::Extraction {
                path: source_archive.clone(),
                source,
            }
        })?;
        let tree = scratch.path().join(settings.source_subdir.as_std_path());
        if !tree.is_dir() {
            return Err(FrameworkError::MissingSourceTree(
                settings.source_subdir.clone().into_std_path_buf(),
            ));
        }

        let package_dir = options.output_dir.join(settings.package_name.as_str());
        if package_dir.exists() {
            fs::remove_dir_all(&package_dir)?;
        }
        let target_name = tree.file_name().map_or_else(|| PathBuf::from("FreeRTOS"), PathBuf::from);
        copy_tree(&tree, &package_dir.join(target_name))?;
        let stats = tree_stats(&tree);
        drop(scratch);

        let package = self.archiver.archive(
            &package_dir,
            &ArchiveRequest {
                package_name: settings.package_name.clone(),
                version: settings.version.clone(),
                source: source_archive.clone(),
                files_count: stats.files_count,
                total_size: stats.total_size,
            },
        )?;

        let metadata = FrameworkMetadata {
            version: settings.version.clone(),
            source_sha256,
            package_sha256: package.sha256.clone(),
            source_url: url.to_owned(),
        };
        let metadata_path = options
            .output_dir
            .join(format!("{}.source.json", settings.package_name));
        write_framework_metadata(&metadata_path, &metadata)?;

        Ok(FrameworkArtifact {
            package,
            source_archive,
            metadata,
            metadata_path,
        })
    }
}

fn write_framework_metadata(path: &Path, metadata: &FrameworkMetadata) -> Result<(), FrameworkError> {
    let mut json = serde_json::to_string_pretty(metadata)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests;
