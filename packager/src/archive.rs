//! Package archiving.
//!
//! Compresses a package directory into a deterministic zip next to it,
//! hashes the finished archive, and records the result in a JSON metadata
//! sidecar and a `sha256sum`-style checksum file.
//!
//! The zip is assembled in a temporary file in the output directory and
//! renamed into place only once it is complete, so an interrupted run never
//! leaves a truncated archive under the final name.

use crate::digest::{Sha256Digest, compute_sha256};
use crate::package_name::PackageName;
use crate::timestamp::CreatedAt;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTimeError;
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors raised while archiving a package.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The package directory does not exist or has no parent directory.
    #[error("package directory not usable: {0}")]
    InvalidPackageDir(PathBuf),

    /// The zip writer failed.
    #[error("failed to write archive {path}")]
    Zip {
        /// Archive being written.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A metadata sidecar could not be parsed.
    #[error("invalid package metadata in {path}")]
    InvalidMetadata {
        /// Sidecar path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Metadata could not be serialized.
    #[error("failed to serialize package metadata")]
    Serialization(#[from] serde_json::Error),

    /// The system clock is unusable for the creation timestamp.
    #[error("system clock is set before the Unix epoch")]
    Clock(#[from] SystemTimeError),

    /// Any other filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What is being archived and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Package identifier; names the archive and sidecar files.
    pub package_name: PackageName,
    /// Version recorded in the metadata.
    pub version: String,
    /// Installer path the package was harvested from.
    pub source: PathBuf,
    /// File count of the harvested source.
    pub files_count: u64,
    /// Byte total of the harvested source.
    pub total_size: u64,
}

/// JSON sidecar written next to every archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package identifier.
    pub package_name: PackageName,
    /// Package version.
    pub version: String,
    /// Installer path the package was harvested from.
    pub source: PathBuf,
    /// File count of the harvested source.
    pub files_count: u64,
    /// Byte total of the harvested source.
    pub total_size: u64,
    /// Digest of the complete archive.
    pub sha256: Sha256Digest,
    /// When the archive was created.
    pub created: CreatedAt,
}

/// A finished package archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArtifact {
    /// Package identifier.
    pub package_name: PackageName,
    /// Path of the zip archive.
    pub archive_path: PathBuf,
    /// Digest of the archive bytes.
    pub sha256: Sha256Digest,
    /// Package version.
    pub version: String,
    /// Installer path the package was harvested from.
    pub source: PathBuf,
    /// File count of the harvested source.
    pub files_count: u64,
    /// Byte total of the harvested source.
    pub total_size: u64,
    /// When the archive was created.
    pub created: CreatedAt,
    /// Size of the archive file in bytes.
    pub archive_size: u64,
}

impl PackageArtifact {
    /// Metadata sidecar contents for this artifact.
    #[must_use]
    pub fn metadata(&self) -> PackageMetadata {
        PackageMetadata {
            package_name: self.package_name.clone(),
            version: self.version.clone(),
            source: self.source.clone(),
            files_count: self.files_count,
            total_size: self.total_size,
            sha256: self.sha256.clone(),
            created: self.created.clone(),
        }
    }

    /// Path of the metadata sidecar.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.archive_path
            .with_file_name(self.package_name.metadata_file_name())
    }
}

/// Creates package archives.
#[derive(Debug, Clone, Default)]
pub struct Archiver {
    created: Option<CreatedAt>,
}

impl Archiver {
    /// Archiver stamping metadata with the current time.
    #[must_use]
    pub const fn new() -> Self {
        Self { created: None }
    }

    /// Archiver stamping metadata with a fixed time.
    #[must_use]
    pub const fn with_timestamp(created: CreatedAt) -> Self {
        Self {
            created: Some(created),
        }
    }

    /// Archive `package_dir` into `<parent>/<package>.zip`.
    ///
    /// Entries are added in sorted file-name order with paths relative to
    /// the package's parent, so the package directory is the top-level
    /// entry. Every entry carries the DOS epoch as its timestamp, which
    /// makes the digest a function of file names, contents, and modes only.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] on any I/O, zip, or serialization failure.
    /// No archive is left under the final name when writing fails.
    pub fn archive(
        &self,
        package_dir: &Path,
        request: &ArchiveRequest,
    ) -> Result<PackageArtifact, ArchiveError> {
        let output_dir = package_dir
            .parent()
            .filter(|_| package_dir.is_dir())
            .ok_or_else(|| ArchiveError::InvalidPackageDir(package_dir.to_path_buf()))?;
        let archive_path = output_dir.join(request.package_name.archive_file_name());
        info!("archiving {} into {}", package_dir.display(), archive_path.display());

        write_zip(package_dir, output_dir, &archive_path)?;

        let sha256 = compute_sha256(&archive_path)?;
        let archive_size = fs::metadata(&archive_path)?.len();
        let created = match &self.created {
            Some(created) => created.clone(),
            None => CreatedAt::now()?,
        };
        let artifact = PackageArtifact {
            package_name: request.package_name.clone(),
            archive_path,
            sha256,
            version: request.version.clone(),
            source: request.source.clone(),
            files_count: request.files_count,
            total_size: request.total_size,
            created,
            archive_size,
        };
        write_metadata(&artifact.metadata_path(), &artifact.metadata())?;
        write_checksum_file(output_dir, &artifact)?;
        debug!("{} sha256 {}", artifact.package_name, artifact.sha256);
        Ok(artifact)
    }
}

/// Sidecar path for an archive: `<dir>/<stem>.metadata.json`.
#[must_use]
pub fn metadata_path_for(archive_path: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    archive_path.with_file_name(format!("{stem}.metadata.json"))
}

/// Read a metadata sidecar.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if the file cannot be read and
/// [`ArchiveError::InvalidMetadata`] if it is not valid metadata.
pub fn read_metadata(path: &Path) -> Result<PackageMetadata, ArchiveError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| ArchiveError::InvalidMetadata {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a metadata sidecar as indented JSON.
///
/// # Errors
///
/// Returns [`ArchiveError`] on serialization or I/O failure.
pub fn write_metadata(path: &Path, metadata: &PackageMetadata) -> Result<(), ArchiveError> {
    let mut json = serde_json::to_string_pretty(metadata)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

fn write_checksum_file(output_dir: &Path, artifact: &PackageArtifact) -> io::Result<()> {
    let line = format!(
        "{}  {}\n",
        artifact.sha256,
        artifact.package_name.archive_file_name()
    );
    fs::write(
        output_dir.join(artifact.package_name.checksum_file_name()),
        line,
    )
}

/// Write the zip to a temporary file and rename it over `archive_path`.
fn write_zip(package_dir: &Path, base: &Path, archive_path: &Path) -> Result<(), ArchiveError> {
    let zip_err = |source| ArchiveError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };
    let staging = tempfile::Builder::new()
        .prefix(".s32ds-packager-")
        .suffix(".zip.part")
        .tempfile_in(base)?;
    let mut zip = ZipWriter::new(staging);

    for entry in WalkDir::new(package_dir)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry_name(entry.path(), base)?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(file_mode(&entry.metadata().map_err(io::Error::from)?));
        zip.start_file(name, options).map_err(zip_err)?;
        io::copy(&mut File::open(entry.path())?, &mut zip)?;
    }

    let staging = zip.finish().map_err(zip_err)?;
    staging
        .persist(archive_path)
        .map_err(|err| ArchiveError::Io(err.error))?;
    Ok(())
}

/// Zip entry name for `path`: relative to `base`, `/`-separated.
fn entry_name(path: &Path, base: &Path) -> io::Result<String> {
    let relative = path
        .strip_prefix(base)
        .map_err(|err| io::Error::other(format!("{}: {err}", path.display())))?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> u32 {
    0o644
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
