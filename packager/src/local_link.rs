//! Pointing the toolchain manifest at a prebuilt archive on disk.
//!
//! Some users already hold the upstream toolchain zip. `link-local` finds
//! it and rewrites only the manifest URL, leaving digest and version alone.

use crate::error::{PackagerError, Result};
use crate::manifest::{
    ManifestError, ManifestUpdate, PatchOutcome, UrlPolicy, VersionPolicy, file_url, patch_manifest,
};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Fallback patterns matched when no file carries the exact name.
const FALLBACK_PATTERNS: [&str; 2] = ["*powerpc*.zip", "*eabivle*.zip"];

/// A directory to search, optionally including its subdirectories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoot {
    /// Directory to search.
    pub path: PathBuf,
    /// Whether subdirectories are searched too.
    pub recursive: bool,
}

impl SearchRoot {
    /// Search `path` itself only.
    #[must_use]
    pub fn direct(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
        }
    }

    /// Search `path` and everything below it.
    #[must_use]
    pub fn recursive(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: true,
        }
    }
}

/// Search roots used when none are given.
///
/// In order: the manifest's `toolchain/` directory, the platform root and
/// its `toolchain/` directory, the working directory and the PlatformIO
/// workspace (both recursively), and the home directory.
#[must_use]
pub fn default_search_roots(manifest: &Path) -> Vec<SearchRoot> {
    let package_dir = manifest.parent().unwrap_or_else(|| Path::new("."));
    let mut roots = vec![SearchRoot::direct(package_dir.join("toolchain"))];
    if let Some(platform_root) = package_dir.parent().and_then(Path::parent) {
        roots.push(SearchRoot::direct(platform_root.join("toolchain")));
        roots.push(SearchRoot::direct(platform_root));
    }
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(SearchRoot::recursive(cwd));
    }
    if let Some(workspace) = ["PLATFORMIO_WORKSPACE_DIR", "PIO_WORKSPACE_DIR"]
        .iter()
        .find_map(|var| std::env::var_os(var).filter(|v| !v.is_empty()))
    {
        roots.push(SearchRoot::recursive(workspace));
    }
    if let Some(dirs) = directories_next::BaseDirs::new() {
        roots.push(SearchRoot::direct(dirs.home_dir()));
    }
    roots
}

/// Find a local archive called `file_name`.
///
/// Every root is first checked directly, then recursive roots are walked
/// for the exact name, then for the `*powerpc*.zip` and `*eabivle*.zip`
/// patterns. The first hit wins; walks visit entries in name order.
#[must_use]
pub fn find_local_archive(roots: &[SearchRoot], file_name: &str) -> Option<PathBuf> {
    let direct = roots
        .iter()
        .map(|root| root.path.join(file_name))
        .find(|candidate| candidate.is_file());
    let found = direct
        .or_else(|| walk_recursive(roots, |name| name == file_name))
        .or_else(|| {
            let patterns: Vec<_> = FALLBACK_PATTERNS
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect();
            walk_recursive(roots, |name| patterns.iter().any(|p| p.matches(name)))
        })?;
    Some(fs::canonicalize(&found).unwrap_or(found))
}

fn walk_recursive(roots: &[SearchRoot], matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    roots.iter().filter(|root| root.recursive).find_map(|root| {
        debug!("searching {}", root.path.display());
        WalkDir::new(&root.path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .find(|entry| entry.file_name().to_str().is_some_and(&matches))
            .map(walkdir::DirEntry::into_path)
    })
}

/// Point `platform` in `manifest` at the archive found in `roots`.
///
/// Returns the archive path and the URL now recorded.
///
/// # Errors
///
/// Returns [`PackagerError::LocalArchiveNotFound`] when no archive is
/// found, and [`PackagerError::Manifest`] when the manifest is missing or
/// cannot be patched.
pub fn link_local(
    manifest: &Path,
    roots: &[SearchRoot],
    file_name: &str,
    platform: &str,
) -> Result<(PathBuf, String)> {
    if !manifest.is_file() {
        return Err(ManifestError::Io {
            path: manifest.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "package.json not found"),
        }
        .into());
    }
    let archive =
        find_local_archive(roots, file_name).ok_or_else(|| PackagerError::LocalArchiveNotFound {
            file_name: file_name.to_owned(),
            searched: roots.iter().map(|root| root.path.clone()).collect(),
        })?;
    info!("found local archive {}", archive.display());

    let url = file_url(&archive);
    let update = ManifestUpdate {
        platform: platform.to_owned(),
        url: Some(url.clone()),
        sha256: None,
        version: None,
        url_policy: UrlPolicy::Replace,
        version_policy: VersionPolicy::IfPresent,
    };
    match patch_manifest(manifest, &update)? {
        PatchOutcome::Patched { url: Some(recorded), .. } => Ok((archive, recorded)),
        PatchOutcome::Patched { url: None, .. } | PatchOutcome::Skipped => Ok((archive, url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_sample_manifest;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const ARCHIVE: &str = "gcc-4.9.4-Ee200-eabivle-x86_64-linux-g2724867.zip";

    #[fixture]
    fn tree() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn touch(dir: &Path, relative: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"zip").expect("write");
        fs::canonicalize(&path).expect("canonical")
    }

    #[rstest]
    fn direct_match_wins_over_recursive(tree: TempDir) {
        let direct = touch(&tree.path().join("b"), ARCHIVE);
        touch(&tree.path().join("a/deep"), ARCHIVE);
        let roots = [
            SearchRoot::recursive(tree.path().join("a")),
            SearchRoot::direct(tree.path().join("b")),
        ];

        assert_eq!(find_local_archive(&roots, ARCHIVE), Some(direct));
    }

    #[rstest]
    fn exact_name_wins_over_pattern(tree: TempDir) {
        touch(tree.path(), "a/other-powerpc.zip");
        let exact = touch(tree.path(), &format!("z/{ARCHIVE}"));

        let found = find_local_archive(&[SearchRoot::recursive(tree.path())], ARCHIVE);

        assert_eq!(found, Some(exact));
    }

    #[rstest]
    #[case::powerpc("dl/my-powerpc-build.zip")]
    #[case::eabivle("dl/gcc-eabivle.zip")]
    fn falls_back_to_patterns(tree: TempDir, #[case] relative: &str) {
        let expected = touch(tree.path(), relative);

        let found = find_local_archive(&[SearchRoot::recursive(tree.path())], ARCHIVE);

        assert_eq!(found, Some(expected));
    }

    #[rstest]
    fn direct_roots_are_not_walked(tree: TempDir) {
        touch(tree.path(), &format!("nested/{ARCHIVE}"));
        assert_eq!(find_local_archive(&[SearchRoot::direct(tree.path())], ARCHIVE), None);
    }

    #[rstest]
    fn link_patches_url_only(tree: TempDir) {
        let archive = touch(tree.path(), &format!("downloads/{ARCHIVE}"));
        let manifest = write_sample_manifest(
            &tree.path().join("tools/toolchain-powerpc-eabivle"),
            "toolchain-powerpc-eabivle",
        )
        .expect("manifest");

        let (found, url) = link_local(
            &manifest,
            &[SearchRoot::recursive(tree.path().join("downloads"))],
            ARCHIVE,
            "linux_x86_64",
        )
        .expect("link");

        assert_eq!(found, archive);
        assert_eq!(url, format!("file://{}", archive.display()));
        let patched: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&manifest).expect("read")).expect("json");
        assert_eq!(patched["urls"]["linux_x86_64"], url.as_str());
        assert_eq!(patched["sha256"]["linux_x86_64"], "0".repeat(64));
        assert_eq!(patched["version"], "0.0.0");
    }

    #[rstest]
    fn missing_archive_lists_searched_roots(tree: TempDir) {
        let manifest = write_sample_manifest(tree.path(), "toolchain-powerpc-eabivle").expect("manifest");

        let err = link_local(&manifest, &[SearchRoot::direct(tree.path())], ARCHIVE, "linux_x86_64")
            .expect_err("nothing to find");

        assert!(matches!(
            err,
            PackagerError::LocalArchiveNotFound { ref searched, .. } if searched == &[tree.path().to_path_buf()]
        ));
    }

    #[rstest]
    fn missing_manifest_is_an_error(tree: TempDir) {
        touch(tree.path(), ARCHIVE);
        let err = link_local(
            &tree.path().join("package.json"),
            &[SearchRoot::direct(tree.path())],
            ARCHIVE,
            "linux_x86_64",
        )
        .expect_err("no manifest");
        assert!(matches!(err, PackagerError::Manifest(ManifestError::Io { .. })));
    }

    #[test]
    fn default_roots_start_next_to_the_manifest() {
        let roots = default_search_roots(Path::new("/platform/tools/toolchain-powerpc-eabivle/package.json"));
        assert_eq!(
            roots.first(),
            Some(&SearchRoot::direct("/platform/tools/toolchain-powerpc-eabivle/toolchain"))
        );
        assert!(roots.contains(&SearchRoot::direct("/platform")));
    }
}
