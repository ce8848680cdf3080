//! Subcommand handlers.
//!
//! Each handler takes parsed arguments and the loaded configuration and
//! writes its user-facing report to `out`. Diagnostics go through `log`.

use crate::archive::PackageArtifact;
use crate::cli::{AnalyzeArgs, BuildArgs, Cli, Command, FrameworkArgs, LinkLocalArgs, PackageArgs};
use crate::config::PackagerConfig;
use crate::error::{PackagerError, Result};
use crate::extractor::Extractor;
use crate::framework::download::{ArchiveDownloader, HttpDownloader};
use crate::framework::{FrameworkArtifact, FrameworkOptions, FrameworkPackager};
use crate::local_link::{SearchRoot, default_search_roots, link_local};
use crate::locator::InstallerLocator;
use crate::lock::OutputLock;
use crate::manifest::{ManifestUpdate, PatchOutcome, UrlPolicy, patch_manifest};
use crate::orchestrator::{BuildReport, ComponentOutcome, Orchestrator};
use crate::package_name::PackageName;
use crate::report::{AnalysisReport, format_size_mb};
use std::io::Write;
use std::path::Path;

/// Load configuration and dispatch the parsed command.
///
/// # Errors
///
/// Returns [`PackagerError`] from configuration loading or the command.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = PackagerConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Analyze(args) => run_analyze(args, &config, out).map(|_| ()),
        Command::Build(args) => run_build(args, &config, out).map(|_| ()),
        Command::Package(args) => run_package(args, &config, out).map(|_| ()),
        Command::Framework(args) => {
            let downloader = HttpDownloader::new(config.download_timeout);
            run_framework(args, &config, downloader, out).map(|_| ())
        }
        Command::LinkLocal(args) => run_link_local(args, &config, out),
    }
}

/// Analyse an installer and print what it contains.
///
/// # Errors
///
/// Returns [`PackagerError::Locator`] for an unusable installer root and
/// [`PackagerError::Io`] when the report cannot be written.
pub fn run_analyze(
    args: &AnalyzeArgs,
    config: &PackagerConfig,
    out: &mut dyn Write,
) -> Result<AnalysisReport> {
    let locator = InstallerLocator::new(args.installer_root.as_std_path(), config)?;
    let report = AnalysisReport::from_locator(&locator);
    report.render(out)?;
    if let Some(json) = &args.json {
        report.write_json(json.as_std_path())?;
        writeln!(out, "Analysis written to {json}")?;
    }
    Ok(report)
}

/// Build the selected components into the output directory.
///
/// A full build reports component failures in the summary only. A build
/// limited to one component fails when that component fails.
///
/// # Errors
///
/// Returns [`PackagerError`] when the installer is unusable, the output
/// directory is locked, the report cannot be written, or the single
/// requested component fails.
pub fn run_build(args: &BuildArgs, config: &PackagerConfig, out: &mut dyn Write) -> Result<BuildReport> {
    let locator = InstallerLocator::new(args.installer_root.as_std_path(), config)?;
    let _lock = OutputLock::acquire(args.output.as_std_path())?;

    let analysis = AnalysisReport::from_locator(&locator);
    analysis.render(out)?;
    let kinds = args.components();
    let report = Orchestrator::new(
        &locator,
        args.output.as_std_path(),
        args.platform_root.as_deref().map(camino::Utf8Path::as_std_path),
    )
    .run(&analysis.components, &kinds);
    writeln!(out)?;
    report.render_summary(out)?;

    let single_failure = match kinds.as_slice() {
        [kind] => report
            .outcome(*kind)
            .and_then(ComponentOutcome::failure_reason)
            .map(|reason| (*kind, reason.to_owned())),
        _ => None,
    };
    match single_failure {
        Some((kind, reason)) => Err(PackagerError::ComponentFailed { kind, reason }),
        None => Ok(report),
    }
}

/// Package one component, optionally patching a manifest.
///
/// # Errors
///
/// Returns [`PackagerError`] for an invalid package name, a missing
/// component, a locked output directory, or a failed archive or patch.
pub fn run_package(
    args: &PackageArgs,
    config: &PackagerConfig,
    out: &mut dyn Write,
) -> Result<PackageArtifact> {
    let package_name = args
        .package_name
        .as_deref()
        .map(PackageName::try_from)
        .transpose()?;
    let locator = InstallerLocator::new(args.installer_root.as_std_path(), config)?;
    let _lock = OutputLock::acquire(args.output_dir.as_std_path())?;

    let artifact = Extractor::new(&locator).extract(
        args.component,
        args.output_dir.as_std_path(),
        package_name.as_ref(),
    )?;
    write_artifact(out, &artifact)?;

    if let Some(manifest) = &args.update_package_json {
        let policy = if args.keep_remote_url {
            UrlPolicy::KeepRemote
        } else {
            UrlPolicy::Replace
        };
        let update = ManifestUpdate::for_artifact(&artifact, &config.platform_key).with_url_policy(policy);
        report_patch(out, manifest.as_std_path(), &patch_manifest(manifest.as_std_path(), &update)?)?;
    }
    Ok(artifact)
}

/// Repackage the framework using `downloader` for the source archive.
///
/// # Errors
///
/// Returns [`PackagerError`] when the output directory is locked or any
/// framework step or manifest patch fails.
pub fn run_framework<D: ArchiveDownloader>(
    args: &FrameworkArgs,
    config: &PackagerConfig,
    downloader: D,
    out: &mut dyn Write,
) -> Result<FrameworkArtifact> {
    let _lock = OutputLock::acquire(args.output.as_std_path())?;
    let artifact = FrameworkPackager::new(config, downloader).package(&FrameworkOptions {
        output_dir: args.output.clone().into_std_path_buf(),
        url: args.url.clone(),
        skip_download: args.skip_download,
    })?;

    writeln!(out, "Source archive: {}", artifact.source_archive.display())?;
    writeln!(out, "  SHA256: {}", artifact.metadata.source_sha256)?;
    write_artifact(out, &artifact.package)?;
    writeln!(out, "  Metadata: {}", artifact.metadata_path.display())?;

    if let Some(manifest) = &args.update_package_json {
        let update = artifact.manifest_update(&config.platform_key);
        report_patch(out, manifest.as_std_path(), &patch_manifest(manifest.as_std_path(), &update)?)?;
    }
    Ok(artifact)
}

/// Point the toolchain manifest at a local archive.
///
/// # Errors
///
/// Returns [`PackagerError::LocalArchiveNotFound`] when nothing is found
/// and [`PackagerError::Manifest`] when the manifest cannot be patched.
pub fn run_link_local(args: &LinkLocalArgs, config: &PackagerConfig, out: &mut dyn Write) -> Result<()> {
    let manifest = args.manifest.as_std_path();
    let roots: Vec<SearchRoot> = if args.search.is_empty() {
        default_search_roots(manifest)
    } else {
        args.search
            .iter()
            .map(|dir| SearchRoot::recursive(dir.as_std_path()))
            .collect()
    };
    let (archive, url) = link_local(
        manifest,
        &roots,
        &config.toolchain_archive_name,
        &config.platform_key,
    )?;
    writeln!(out, "Found toolchain archive: {}", archive.display())?;
    writeln!(out, "Updated {} to use:", manifest.display())?;
    writeln!(out, "  {url}")?;
    Ok(())
}

fn write_artifact(out: &mut dyn Write, artifact: &PackageArtifact) -> std::io::Result<()> {
    writeln!(out, "✓ Package created: {}", artifact.archive_path.display())?;
    writeln!(out, "  Version: {}", artifact.version)?;
    writeln!(out, "  Size: {}", format_size_mb(artifact.archive_size))?;
    writeln!(out, "  SHA256: {}", artifact.sha256)
}

fn report_patch(out: &mut dyn Write, manifest: &Path, outcome: &PatchOutcome) -> std::io::Result<()> {
    match outcome {
        PatchOutcome::Patched { .. } => writeln!(out, "✓ Updated {}", manifest.display()),
        PatchOutcome::Skipped => writeln!(out, "  {} not found; not updated", manifest.display()),
    }
}
