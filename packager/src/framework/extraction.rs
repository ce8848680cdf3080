//! Zip extraction with path traversal protection.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a readable zip archive.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An entry attempts to escape the destination directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Extract every entry of the zip at `archive_path` into `dest_dir`.
///
/// Returns the number of files written. Every entry name is validated
/// before anything is written for it.
///
/// # Errors
///
/// Returns [`ExtractionError::PathTraversal`] for absolute or `..` entry
/// names, [`ExtractionError::EmptyArchive`] when no files were found, and
/// [`ExtractionError::Io`] or [`ExtractionError::Zip`] otherwise.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut extracted = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_path = validate_entry_path(entry.name())?;
        let dest_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest_path)?;
        io::copy(&mut entry, &mut out)?;
        restore_mode(&dest_path, entry.unix_mode())?;
        extracted += 1;
    }

    if extracted == 0 {
        return Err(ExtractionError::EmptyArchive);
    }
    Ok(extracted)
}

/// Reject entry names that are absolute or contain `..` components.
fn validate_entry_path(name: &str) -> Result<PathBuf, ExtractionError> {
    let path = Path::new(name);
    let escapes = path.is_absolute()
        || name.starts_with('/')
        || name.starts_with('\\')
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: name.to_owned(),
        });
    }
    Ok(path.to_path_buf())
}

#[cfg(unix)]
fn restore_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn restore_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}
