//! Full-build orchestration.
//!
//! Runs extraction, archiving, and manifest patching for each requested
//! component in turn. A failing component is recorded and the remaining
//! ones still run; nothing is retried.

use crate::archive::{Archiver, PackageArtifact};
use crate::component::{ComponentKind, InstallerComponent};
use crate::config::PackagerConfig;
use crate::error::error_chain;
use crate::extractor::Extractor;
use crate::locator::InstallerLocator;
use crate::manifest::{ManifestUpdate, PatchOutcome, patch_manifest};
use crate::report::format_size_mb;
use log::{error, info};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Pipeline stages, in the order a run passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Inspecting the installer.
    Analyzing,
    /// Copying a component into its package layout.
    Extracting(ComponentKind),
    /// Compressing and hashing a package.
    Archiving(ComponentKind),
    /// Updating a platform manifest.
    Patching(ComponentKind),
    /// Reporting results.
    Summarized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analyzing => f.write_str("analyzing"),
            Self::Extracting(kind) => write!(f, "extracting {kind}"),
            Self::Archiving(kind) => write!(f, "archiving {kind}"),
            Self::Patching(kind) => write!(f, "patching {kind}"),
            Self::Summarized => f.write_str("summarized"),
        }
    }
}

/// Result of building one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentOutcome {
    /// The package was built.
    Packaged {
        /// The finished archive.
        artifact: PackageArtifact,
        /// What happened to the platform manifest, when one was targeted.
        manifest: Option<PatchOutcome>,
    },
    /// The package could not be built.
    Failed {
        /// Error message, including its causes.
        reason: String,
    },
}

impl ComponentOutcome {
    /// Return true when the package was built.
    #[must_use]
    pub const fn is_packaged(&self) -> bool {
        matches!(self, Self::Packaged { .. })
    }

    /// Failure message, when the package could not be built.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Packaged { .. } => None,
            Self::Failed { reason } => Some(reason),
        }
    }
}

/// Outcomes of a build run, in build order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    outcomes: Vec<(ComponentKind, ComponentOutcome)>,
}

impl BuildReport {
    /// Outcomes in build order.
    #[must_use]
    pub fn outcomes(&self) -> &[(ComponentKind, ComponentOutcome)] {
        &self.outcomes
    }

    /// Outcome for one kind, if it was part of the run.
    #[must_use]
    pub fn outcome(&self, kind: ComponentKind) -> Option<&ComponentOutcome> {
        self.outcomes
            .iter()
            .find_map(|(k, outcome)| (*k == kind).then_some(outcome))
    }

    /// Number of components that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_packaged())
            .count()
    }

    /// Write the human-readable summary.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `out`.
    pub fn render_summary(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", "=".repeat(70))?;
        writeln!(out, "Build Summary")?;
        writeln!(out, "{}", "=".repeat(70))?;
        for (kind, outcome) in &self.outcomes {
            writeln!(out)?;
            writeln!(out, "  {}:", kind.label())?;
            match outcome {
                ComponentOutcome::Packaged { artifact, manifest } => {
                    writeln!(out, "    ✓ Package: {}", artifact.archive_path.display())?;
                    writeln!(out, "    Size: {}", format_size_mb(artifact.archive_size))?;
                    writeln!(out, "    SHA256: {}", artifact.sha256)?;
                    if let Some(PatchOutcome::Skipped) = manifest {
                        writeln!(out, "    Manifest: not found, skipped")?;
                    }
                }
                ComponentOutcome::Failed { reason } => {
                    writeln!(out, "    ✗ Failed: {reason}")?;
                }
            }
        }
        Ok(())
    }
}

/// Runs the packaging pipeline over several components.
#[derive(Debug)]
pub struct Orchestrator<'a> {
    locator: &'a InstallerLocator<'a>,
    config: &'a PackagerConfig,
    output_base: PathBuf,
    platform_root: Option<PathBuf>,
    archiver: Archiver,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator writing packages below `output_base`.
    ///
    /// When `platform_root` is given, each built package's manifest at
    /// `<platform_root>/tools/<package>/package.json` is patched.
    #[must_use]
    pub fn new(
        locator: &'a InstallerLocator<'a>,
        output_base: &Path,
        platform_root: Option<&Path>,
    ) -> Self {
        Self {
            locator,
            config: locator.config(),
            output_base: output_base.to_path_buf(),
            platform_root: platform_root.map(Path::to_path_buf),
            archiver: Archiver::new(),
        }
    }

    /// Use a specific archiver, e.g. one with a fixed timestamp.
    #[must_use]
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = archiver;
        self
    }

    /// Build each of `kinds` in the given order from the components in
    /// `found`, as returned by [`InstallerLocator::analyze`].
    ///
    /// A kind missing from `found` is recorded as failed.
    #[must_use]
    pub fn run(
        &self,
        found: &BTreeMap<ComponentKind, InstallerComponent>,
        kinds: &[ComponentKind],
    ) -> BuildReport {
        info!(
            "stage: {} ({} of {} components present)",
            Stage::Analyzing,
            found.len(),
            ComponentKind::ALL.len()
        );

        let mut report = BuildReport::default();
        for &kind in kinds {
            let outcome = match self.build_one(kind, found.get(&kind)) {
                Ok((artifact, manifest)) => ComponentOutcome::Packaged { artifact, manifest },
                Err(reason) => {
                    error!("failed to build {kind}: {reason}");
                    ComponentOutcome::Failed { reason }
                }
            };
            report.outcomes.push((kind, outcome));
        }
        info!(
            "stage: {} ({} built, {} failed)",
            Stage::Summarized,
            report.outcomes.len() - report.failure_count(),
            report.failure_count()
        );
        report
    }

    fn build_one(
        &self,
        kind: ComponentKind,
        component: Option<&InstallerComponent>,
    ) -> Result<(PackageArtifact, Option<PatchOutcome>), String> {
        let settings = self.config.component(kind);
        let output_dir = self.output_base.join(&settings.output_subdir);

        let extractor = Extractor::new(self.locator).with_archiver(self.archiver.clone());
        let component = component.ok_or_else(|| error_chain(&extractor.not_found(kind)))?;

        info!("stage: {}", Stage::Extracting(kind));
        let prepared = extractor
            .prepare_component(component, &output_dir, None)
            .map_err(|err| error_chain(&err))?;

        info!("stage: {}", Stage::Archiving(kind));
        let artifact = extractor
            .archive(&prepared)
            .map_err(|err| error_chain(&err))?;

        let manifest = match &self.platform_root {
            Some(root) => {
                info!("stage: {}", Stage::Patching(kind));
                let path = root
                    .join("tools")
                    .join(artifact.package_name.as_str())
                    .join("package.json");
                let update = ManifestUpdate::for_artifact(&artifact, &self.config.platform_key);
                Some(patch_manifest(&path, &update).map_err(|err| error_chain(&err))?)
            }
            None => None,
        };
        Ok((artifact, manifest))
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
