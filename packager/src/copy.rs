//! Filesystem copy helpers used when laying out packages.

use log::trace;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy `src` into `dst`, creating `dst` and its parents.
///
/// Symlinks are followed and copied as the files they point to. Regular
/// files keep their permission bits, so executables stay executable.
///
/// # Errors
///
/// Returns the first I/O error raised while walking or copying.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in WalkDir::new(src)
        .follow_links(true)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| io::Error::other(err.to_string()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        } else {
            trace!("skipping special file {}", entry.path().display());
        }
    }
    Ok(copied)
}

/// Copy one file, creating the destination's parent directories.
///
/// # Errors
///
/// Returns an I/O error if the copy fails.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Mark `path` as executable (`0755`); a no-op off Unix.
///
/// # Errors
///
/// Returns an I/O error if the permissions cannot be changed.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

/// Mark `path` as executable (`0755`); a no-op off Unix.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
