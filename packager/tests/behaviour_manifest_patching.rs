//! Behaviour-driven tests for manifest patching.
//!
//! A small package is archived for real, then a sample PlatformIO manifest
//! is patched to point at it.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use s32ds_packager::archive::{ArchiveRequest, Archiver, PackageArtifact};
use s32ds_packager::manifest::{ManifestUpdate, PatchOutcome, UrlPolicy, patch_manifest};
use s32ds_packager::package_name::PackageName;
use s32ds_packager::test_utils::write_sample_manifest;
use s32ds_packager::timestamp::CreatedAt;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PLATFORM: &str = "linux_x86_64";

#[derive(Default)]
struct ManifestWorld {
    temp_dir: Option<TempDir>,
    manifest: Option<PathBuf>,
    original_url: Option<String>,
    artifact: Option<PackageArtifact>,
    outcome: Option<PatchOutcome>,
}

#[fixture]
fn world() -> ManifestWorld {
    ManifestWorld {
        temp_dir: Some(TempDir::new().expect("temp dir")),
        ..ManifestWorld::default()
    }
}

fn temp_path(world: &ManifestWorld) -> PathBuf {
    world
        .temp_dir
        .as_ref()
        .expect("temp_dir set")
        .path()
        .to_path_buf()
}

fn manifest_json(world: &ManifestWorld) -> Value {
    let path = world.manifest.as_ref().expect("manifest set");
    serde_json::from_str(&fs::read_to_string(path).expect("read manifest")).expect("json")
}

fn patch(world: &mut ManifestWorld, policy: UrlPolicy) {
    let artifact = world.artifact.as_ref().expect("artifact built");
    let update = ManifestUpdate::for_artifact(artifact, PLATFORM).with_url_policy(policy);
    let manifest = world.manifest.as_ref().expect("manifest path set");
    world.outcome = Some(patch_manifest(manifest, &update).expect("patch"));
}

#[given("a manifest for \"{package}\"")]
fn given_manifest(world: &mut ManifestWorld, package: String) {
    let dir = temp_path(world).join("platform/tools").join(&package);
    let path = write_sample_manifest(&dir, &package).expect("manifest");
    world.manifest = Some(path);
    world.original_url = manifest_json(world)["urls"][PLATFORM]
        .as_str()
        .map(str::to_owned);
}

#[given("no manifest")]
fn given_no_manifest(world: &mut ManifestWorld) {
    world.manifest = Some(temp_path(world).join("platform/tools/missing/package.json"));
}

#[given("a built archive")]
fn given_built_archive(world: &mut ManifestWorld) {
    let package_dir = temp_path(world).join("dist/toolchain-powerpc-eabivle");
    fs::create_dir_all(package_dir.join("bin")).expect("mkdir");
    fs::write(package_dir.join("bin/powerpc-eabivle-gcc"), b"gcc").expect("write");
    let request = ArchiveRequest {
        package_name: PackageName::try_from("toolchain-powerpc-eabivle").expect("valid"),
        version: "4.9.4.2724867".to_owned(),
        source: PathBuf::from("/installer/Cross_Tools"),
        files_count: 1,
        total_size: 3,
    };
    let artifact = Archiver::with_timestamp(CreatedAt::new("2026-01-01T00:00:00Z"))
        .archive(&package_dir, &request)
        .expect("archive");
    world.artifact = Some(artifact);
}

#[when("the manifest is patched")]
fn when_patched(world: &mut ManifestWorld) {
    patch(world, UrlPolicy::Replace);
}

#[when("the manifest is patched keeping remote URLs")]
fn when_patched_keeping_remote(world: &mut ManifestWorld) {
    patch(world, UrlPolicy::KeepRemote);
}

#[then("the platform URL is a file URL")]
fn then_file_url(world: &mut ManifestWorld) {
    let artifact = world.artifact.as_ref().expect("artifact built");
    let expected = format!("file://{}", artifact.archive_path.display());
    assert_eq!(manifest_json(world)["urls"][PLATFORM], json!(expected));
}

#[then("the platform URL is unchanged")]
fn then_url_unchanged(world: &mut ManifestWorld) {
    let original = world.original_url.clone().expect("original URL recorded");
    assert_eq!(manifest_json(world)["urls"][PLATFORM], json!(original));
}

#[then("the platform digest matches the archive")]
fn then_digest_matches(world: &mut ManifestWorld) {
    let artifact = world.artifact.as_ref().expect("artifact built");
    assert_eq!(
        manifest_json(world)["sha256"][PLATFORM],
        json!(artifact.sha256.as_str())
    );
}

#[then("the keywords are unchanged")]
fn then_keywords_unchanged(world: &mut ManifestWorld) {
    assert_eq!(manifest_json(world)["keywords"], json!(["nxp", "powerpc"]));
}

#[then("the patch is skipped")]
fn then_skipped(world: &mut ManifestWorld) {
    assert_eq!(world.outcome, Some(PatchOutcome::Skipped));
    let manifest = world.manifest.as_ref().expect("manifest path set");
    assert!(!manifest.exists());
}

#[scenario(
    path = "tests/features/manifest_patching.feature",
    name = "Patching points the platform at the local archive"
)]
fn scenario_patch_local_archive(world: ManifestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest_patching.feature",
    name = "A missing manifest is skipped"
)]
fn scenario_missing_manifest(world: ManifestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest_patching.feature",
    name = "Remote URLs can be kept"
)]
fn scenario_keep_remote(world: ManifestWorld) {
    let _ = world;
}
