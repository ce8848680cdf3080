//! Advisory lock on an output directory.
//!
//! Extraction deletes and recreates package directories, so two runs
//! writing to the same output directory would race. Each run holds an
//! exclusive lock on `<dir>/.s32ds-packager.lock` until it finishes; a
//! second run fails immediately instead of waiting.

use fs2::FileExt;
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the lock file created in locked directories.
pub const LOCK_FILE_NAME: &str = ".s32ds-packager.lock";

/// Errors raised while locking an output directory.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the lock.
    #[error("output directory {0} is in use by another s32ds-packager run")]
    Busy(PathBuf),

    /// The lock file could not be created or locked.
    #[error("failed to lock output directory {path}")]
    Io {
        /// Directory being locked.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// An exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct OutputLock {
    file: File,
    path: PathBuf,
}

impl OutputLock {
    /// Lock `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Busy`] when another process holds the lock and
    /// [`LockError::Io`] for any other failure.
    pub fn acquire(dir: &Path) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            path: dir.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_err)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("locked {}", path.display());
                Ok(Self { file, path })
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::Busy(dir.to_path_buf()))
            }
            Err(err) => Err(io_err(err)),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!("failed to unlock {}: {err}", self.path.display());
        }
    }
}
