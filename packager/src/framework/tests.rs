//! Unit tests for framework repackaging.

use super::download::MockArchiveDownloader;
use super::*;
use crate::digest::compute_sha256;
use crate::manifest::patch_manifest;
use crate::timestamp::CreatedAt;
use mockall::predicate::eq;
use rstest::{fixture, rstest};
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const RELEASE_DIR: &str = "freertos-9.0.0_MPC57XXX_public_rel_1";

/// A directory holding an upstream-shaped release zip.
#[fixture]
fn release() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("release.zip");
    let mut zip = zip::ZipWriter::new(File::create(&path).expect("create"));
    for (name, contents) in [
        (format!("{RELEASE_DIR}/FreeRTOS/Source/tasks.c"), "tasks"),
        (format!("{RELEASE_DIR}/FreeRTOS/Source/include/task.h"), "task"),
        (format!("{RELEASE_DIR}/Demo/readme.txt"), "demo"),
    ] {
        zip.start_file(name, SimpleFileOptions::default()).expect("entry");
        zip.write_all(contents.as_bytes()).expect("write");
    }
    zip.finish().expect("finish");
    (dir, path)
}

fn serving(fixture: PathBuf) -> MockArchiveDownloader {
    let mut downloader = MockArchiveDownloader::new();
    downloader
        .expect_download()
        .times(1)
        .returning(move |_, dest| {
            fs::copy(&fixture, dest)?;
            Ok(())
        });
    downloader
}

fn options(output: &Path) -> FrameworkOptions {
    FrameworkOptions {
        output_dir: output.to_path_buf(),
        url: None,
        skip_download: false,
    }
}

fn entry_names(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).expect("open")).expect("zip");
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("entry").name().to_owned())
        .collect()
}

#[rstest]
fn repackages_freertos_tree(release: (TempDir, PathBuf)) {
    let (_release_dir, fixture) = release;
    let output = tempfile::tempdir().expect("output");
    let config = PackagerConfig::default();

    let artifact = FrameworkPackager::new(&config, serving(fixture.clone()))
        .with_archiver(Archiver::with_timestamp(CreatedAt::new("2026-01-01T00:00:00Z")))
        .package(&options(output.path()))
        .expect("package");

    assert_eq!(
        entry_names(&artifact.package.archive_path),
        vec![
            "framework-freertos-nxp-mpc57xx/FreeRTOS/Source/include/task.h",
            "framework-freertos-nxp-mpc57xx/FreeRTOS/Source/tasks.c",
        ]
    );
    assert_eq!(
        artifact.metadata.source_sha256,
        compute_sha256(&fixture).expect("hash fixture")
    );
    assert_eq!(artifact.metadata.package_sha256, artifact.package.sha256);
    assert_eq!(artifact.metadata.version, "9.0.0.1");
    assert_eq!(artifact.metadata.source_url, config.framework.url);

    let recorded: FrameworkMetadata = serde_json::from_str(
        &fs::read_to_string(output.path().join("framework-freertos-nxp-mpc57xx.source.json"))
            .expect("read metadata"),
    )
    .expect("parse metadata");
    assert_eq!(recorded, artifact.metadata);
}

#[rstest]
fn url_override_is_requested(release: (TempDir, PathBuf)) {
    let (_release_dir, fixture) = release;
    let output = tempfile::tempdir().expect("output");
    let config = PackagerConfig::default();
    let mut downloader = MockArchiveDownloader::new();
    downloader
        .expect_download()
        .with(eq("https://mirror.invalid/freertos.zip"), mockall::predicate::always())
        .times(1)
        .returning(move |_, dest| {
            fs::copy(&fixture, dest)?;
            Ok(())
        });

    let artifact = FrameworkPackager::new(&config, downloader)
        .package(&FrameworkOptions {
            url: Some("https://mirror.invalid/freertos.zip".to_owned()),
            ..options(output.path())
        })
        .expect("package");

    assert_eq!(artifact.metadata.source_url, "https://mirror.invalid/freertos.zip");
}

#[rstest]
fn skip_download_reuses_existing_source(release: (TempDir, PathBuf)) {
    let (_release_dir, fixture) = release;
    let output = tempfile::tempdir().expect("output");
    fs::copy(&fixture, output.path().join(SOURCE_ARCHIVE_NAME)).expect("seed source");
    let config = PackagerConfig::default();
    let mut downloader = MockArchiveDownloader::new();
    downloader.expect_download().never();

    FrameworkPackager::new(&config, downloader)
        .package(&FrameworkOptions {
            skip_download: true,
            ..options(output.path())
        })
        .expect("package");
}

#[rstest]
fn skip_download_without_source_still_downloads(release: (TempDir, PathBuf)) {
    let (_release_dir, fixture) = release;
    let output = tempfile::tempdir().expect("output");
    let config = PackagerConfig::default();

    FrameworkPackager::new(&config, serving(fixture))
        .package(&FrameworkOptions {
            skip_download: true,
            ..options(output.path())
        })
        .expect("package");

    assert!(output.path().join(SOURCE_ARCHIVE_NAME).is_file());
}

#[rstest]
fn missing_source_tree_is_reported(release: (TempDir, PathBuf)) {
    let (_release_dir, fixture) = release;
    let output = tempfile::tempdir().expect("output");
    let mut config = PackagerConfig::default();
    config.framework.source_subdir = "other-release/FreeRTOS".into();

    let err = FrameworkPackager::new(&config, serving(fixture))
        .package(&options(output.path()))
        .expect_err("missing tree");

    assert!(matches!(err, FrameworkError::MissingSourceTree(_)));
}

#[test]
fn download_failure_propagates() {
    let output = tempfile::tempdir().expect("output");
    let config = PackagerConfig::default();
    let mut downloader = MockArchiveDownloader::new();
    downloader.expect_download().returning(|url, _| {
        Err(DownloadError::NotFound {
            url: url.to_owned(),
        })
    });

    let err = FrameworkPackager::new(&config, downloader)
        .package(&options(output.path()))
        .expect_err("download fails");

    assert!(matches!(err, FrameworkError::Download(DownloadError::NotFound { .. })));
}

#[rstest]
fn manifest_update_uses_source_digest_and_keeps_url(release: (TempDir, PathBuf)) {
    let (_release_dir, fixture) = release;
    let output = tempfile::tempdir().expect("output");
    let config = PackagerConfig::default();
    let artifact = FrameworkPackager::new(&config, serving(fixture))
        .package(&options(output.path()))
        .expect("package");

    let update = artifact.manifest_update("linux_x86_64");

    assert_eq!(update.url, None);
    assert_eq!(update.sha256, Some(artifact.metadata.source_sha256.clone()));
    assert_eq!(update.version.as_deref(), Some("9.0.0.1"));
    assert_eq!(update.version_policy, VersionPolicy::Always);
    assert_eq!(artifact.package.source, artifact.source_archive);
}

#[rstest]
fn framework_patch_adds_a_missing_version(release: (TempDir, PathBuf)) {
    let (_release_dir, fixture) = release;
    let output = tempfile::tempdir().expect("output");
    let config = PackagerConfig::default();
    let artifact = FrameworkPackager::new(&config, serving(fixture))
        .package(&options(output.path()))
        .expect("package");
    let manifest = output.path().join("package.json");
    fs::write(
        &manifest,
        r#"{"name": "framework-freertos-nxp-mpc57xx", "urls": {"linux_x86_64": "https://mirror.invalid/freertos.zip"}}"#,
    )
    .expect("write manifest");

    patch_manifest(&manifest, &artifact.manifest_update("linux_x86_64")).expect("patch");

    let after: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest).expect("read")).expect("json");
    assert_eq!(after["version"], "9.0.0.1");
    assert_eq!(after["urls"]["linux_x86_64"], "https://mirror.invalid/freertos.zip");
    assert_eq!(
        after["sha256"]["linux_x86_64"],
        artifact.metadata.source_sha256.as_str()
    );
}
