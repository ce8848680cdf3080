//! Behaviour-driven tests for package archiving.
//!
//! These scenarios exercise the archiver against real directories and read
//! the resulting zip, sidecar, and checksum files back from disk.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use s32ds_packager::archive::{ArchiveError, ArchiveRequest, Archiver, PackageArtifact, read_metadata};
use s32ds_packager::digest::compute_sha256;
use s32ds_packager::package_name::PackageName;
use s32ds_packager::timestamp::CreatedAt;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ArchivingWorld {
    temp_dir: Option<TempDir>,
    package_name: Option<PackageName>,
    artifacts: Vec<PackageArtifact>,
    error: Option<ArchiveError>,
}

#[fixture]
fn world() -> ArchivingWorld {
    ArchivingWorld {
        temp_dir: Some(TempDir::new().expect("temp dir")),
        ..ArchivingWorld::default()
    }
}

fn temp_path(world: &ArchivingWorld) -> PathBuf {
    world
        .temp_dir
        .as_ref()
        .expect("temp_dir set")
        .path()
        .to_path_buf()
}

fn package_dir(world: &ArchivingWorld) -> PathBuf {
    let name = world.package_name.as_ref().expect("package name set");
    temp_path(world).join(name.as_str())
}

fn archive_as(world: &mut ArchivingWorld, version: &str) {
    let request = ArchiveRequest {
        package_name: world.package_name.clone().expect("package name set"),
        version: version.to_owned(),
        source: PathBuf::from("/installer/component"),
        files_count: 1,
        total_size: 10,
    };
    let archiver = Archiver::with_timestamp(CreatedAt::new("2026-01-01T00:00:00Z"));
    match archiver.archive(&package_dir(world), &request) {
        Ok(artifact) => world.artifacts.push(artifact),
        Err(err) => world.error = Some(err),
    }
}

fn last_artifact(world: &ArchivingWorld) -> &PackageArtifact {
    world.artifacts.last().expect("an archive was built")
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("a package directory \"{name}\" holding a 10 byte file")]
fn given_package_dir(world: &mut ArchivingWorld, name: String) {
    world.package_name = Some(PackageName::try_from(name).expect("valid name"));
    let dir = package_dir(world);
    fs::create_dir_all(dir.join("bin")).expect("mkdir");
    fs::write(dir.join("bin/tool"), b"0123456789").expect("write");
}

#[given("a package directory \"{name}\" that does not exist")]
fn given_missing_package_dir(world: &mut ArchivingWorld, name: String) {
    world.package_name = Some(PackageName::try_from(name).expect("valid name"));
}

#[when("the package is archived as version \"{version}\"")]
fn when_archived(world: &mut ArchivingWorld, version: String) {
    archive_as(world, &version);
}

#[when("the package is archived twice")]
fn when_archived_twice(world: &mut ArchivingWorld) {
    archive_as(world, "1.0.0");
    archive_as(world, "1.0.0");
}

#[then("the archive \"{file_name}\" exists")]
fn then_archive_exists(world: &mut ArchivingWorld, file_name: String) {
    let artifact = last_artifact(world);
    assert_eq!(artifact.archive_path, temp_path(world).join(file_name));
    assert!(artifact.archive_path.is_file());
}

#[then("the recorded digest matches the archive bytes")]
fn then_digest_matches(world: &mut ArchivingWorld) {
    let artifact = last_artifact(world);
    let recomputed = compute_sha256(&artifact.archive_path).expect("hash");
    assert_eq!(artifact.sha256, recomputed);
}

#[then("the metadata sidecar records version \"{version}\"")]
fn then_sidecar_version(world: &mut ArchivingWorld, version: String) {
    let artifact = last_artifact(world);
    let metadata = read_metadata(&artifact.metadata_path()).expect("sidecar");
    assert_eq!(metadata.version, version);
    assert_eq!(metadata.sha256, artifact.sha256);
    assert_eq!(metadata.created.as_str(), "2026-01-01T00:00:00Z");
}

#[then("the checksum file names \"{file_name}\"")]
fn then_checksum_file(world: &mut ArchivingWorld, file_name: String) {
    let artifact = last_artifact(world);
    let checksum_path = temp_path(world).join(artifact.package_name.checksum_file_name());
    let contents = fs::read_to_string(checksum_path).expect("checksum file");
    assert_eq!(contents, format!("{}  {file_name}\n", artifact.sha256));
}

#[then("both digests are equal")]
fn then_digests_equal(world: &mut ArchivingWorld) {
    let [first, second] = world.artifacts.as_slice() else {
        panic!("expected two archives, got {}", world.artifacts.len());
    };
    assert_eq!(first.sha256, second.sha256);
}

#[then("an invalid package directory error is reported")]
fn then_invalid_dir(world: &mut ArchivingWorld) {
    assert!(
        matches!(world.error, Some(ArchiveError::InvalidPackageDir(_))),
        "expected InvalidPackageDir, got {:?}",
        world.error
    );
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/archiving.feature", name = "Archive a laid-out package")]
fn scenario_archive_package(world: ArchivingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/archiving.feature",
    name = "Archiving the same tree twice gives the same digest"
)]
fn scenario_reproducible_digest(world: ArchivingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/archiving.feature",
    name = "Archiving a missing directory fails"
)]
fn scenario_missing_directory(world: ArchivingWorld) {
    let _ = world;
}
