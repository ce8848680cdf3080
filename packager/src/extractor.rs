//! Component extraction.
//!
//! Copies a located component into its canonical package layout, writes
//! the package's own `package.json`, and hands the directory to the
//! [`Archiver`]. Every extraction starts from an empty package directory.

use crate::archive::{ArchiveError, ArchiveRequest, Archiver, PackageArtifact};
use crate::component::{ComponentKind, InstallerComponent, Lookup};
use crate::config::{ComponentSettings, PackagerConfig};
use crate::copy::{copy_file, copy_tree, set_executable};
use crate::locator::{InstallerLocator, version_from_dir_name};
use crate::package_name::PackageName;
use crate::version_probe::{probe_build_number, with_build_number};
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while extracting a component.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The locator did not find the component.
    #[error("{kind} not found in installer: {installer_root}")]
    ComponentNotFound {
        /// Requested component.
        kind: ComponentKind,
        /// Installer that was searched.
        installer_root: PathBuf,
    },

    /// Copying the component's files failed.
    #[error("failed to copy {from} to {to}")]
    Copy {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The generated `package.json` could not be serialized.
    #[error("failed to serialize package manifest")]
    Serialization(#[from] serde_json::Error),

    /// Archiving the laid-out package failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Preparing the output directory failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How one piece of a component lands in the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Copy a directory tree verbatim.
    Tree,
    /// Copy one file.
    File,
    /// Copy one file and mark it executable.
    Executable,
}

/// A copy step: `from` is relative to the component directory, `to` to the
/// package directory. Optional steps are skipped when the source is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CopyStep {
    from: PathBuf,
    to: PathBuf,
    placement: Placement,
    required: bool,
}

/// Copy steps for a component kind.
fn copy_plan(kind: ComponentKind, component: &InstallerComponent, settings: &ComponentSettings) -> Vec<CopyStep> {
    match kind {
        ComponentKind::DebuggerServer => {
            let tools = PathBuf::from("tools/pegdbserver");
            let mut steps = Vec::with_capacity(3);
            if let Some(binary) = &settings.binary {
                steps.push(CopyStep {
                    from: PathBuf::from(binary),
                    to: tools.join("bin").join(binary),
                    placement: Placement::Executable,
                    required: false,
                });
            }
            steps.push(CopyStep {
                from: PathBuf::from("gdi"),
                to: tools.join("gdi"),
                placement: Placement::Tree,
                required: false,
            });
            steps.push(CopyStep {
                from: PathBuf::from("build_version.txt"),
                to: tools.join("build_version.txt"),
                placement: Placement::File,
                required: false,
            });
            steps
        }
        ComponentKind::Toolchain | ComponentKind::RuntimeLibrary | ComponentKind::Drivers => {
            let dir_name = component
                .path
                .file_name()
                .map_or_else(|| PathBuf::from(kind.key()), PathBuf::from);
            vec![CopyStep {
                from: PathBuf::new(),
                to: dir_name,
                placement: Placement::Tree,
                required: true,
            }]
        }
    }
}

/// The `package.json` written inside every package directory.
#[derive(Debug, Serialize)]
struct PackageManifest<'a> {
    name: &'a str,
    version: &'a str,
    description: &'a str,
    keywords: &'a [String],
    system: [&'a str; 1],
}

/// A laid-out package directory waiting to be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPackage {
    /// The package directory.
    pub package_dir: PathBuf,
    /// Archive inputs describing the package.
    pub request: ArchiveRequest,
}

/// Extracts located components and archives them.
#[derive(Debug)]
pub struct Extractor<'a> {
    locator: &'a InstallerLocator<'a>,
    config: &'a PackagerConfig,
    archiver: Archiver,
}

impl<'a> Extractor<'a> {
    /// Extractor reading from `locator` with its configuration.
    #[must_use]
    pub fn new(locator: &'a InstallerLocator<'a>) -> Self {
        Self {
            locator,
            config: locator.config(),
            archiver: Archiver::new(),
        }
    }

    /// Use a specific archiver, e.g. one with a fixed timestamp.
    #[must_use]
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = archiver;
        self
    }

    /// Extract `kind` into `<output_dir>/<package>` and archive it.
    ///
    /// Uses the configured package name unless `package_name` is given.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::ComponentNotFound`] when the locator reports
    /// the component absent, and other [`ExtractError`] variants for copy,
    /// serialization, or archive failures.
    pub fn extract(
        &self,
        kind: ComponentKind,
        output_dir: &Path,
        package_name: Option<&PackageName>,
    ) -> Result<PackageArtifact, ExtractError> {
        let prepared = self.prepare(kind, output_dir, package_name)?;
        self.archive(&prepared)
    }

    /// Lay out the package directory for `kind` without archiving it.
    ///
    /// # Errors
    ///
    /// As for [`Extractor::extract`], minus archive failures.
    pub fn prepare(
        &self,
        kind: ComponentKind,
        output_dir: &Path,
        package_name: Option<&PackageName>,
    ) -> Result<PreparedPackage, ExtractError> {
        let Lookup::Found(component) = self.locator.find(kind) else {
            return Err(self.not_found(kind));
        };
        self.prepare_component(&component, output_dir, package_name)
    }

    /// Lay out the package directory for an already located component.
    ///
    /// # Errors
    ///
    /// As for [`Extractor::prepare`], minus the lookup.
    pub fn prepare_component(
        &self,
        component: &InstallerComponent,
        output_dir: &Path,
        package_name: Option<&PackageName>,
    ) -> Result<PreparedPackage, ExtractError> {
        let kind = component.kind;
        let settings = self.config.component(kind);
        let package_name = package_name.unwrap_or(&settings.package_name);
        let package_dir = output_dir.join(package_name.as_str());

        fs::create_dir_all(output_dir)?;
        if package_dir.exists() {
            info!("removing existing package directory {}", package_dir.display());
            fs::remove_dir_all(&package_dir)?;
        }
        fs::create_dir_all(&package_dir)?;

        info!("copying {kind} from {}", component.path.display());
        for step in copy_plan(kind, component, settings) {
            apply_step(&component.path, &package_dir, &step)?;
        }

        let version = self.resolve_version(kind, component, settings);
        debug!("{kind} version {version}");
        self.write_package_manifest(&package_dir, package_name, &version, settings)?;

        Ok(PreparedPackage {
            package_dir,
            request: ArchiveRequest {
                package_name: package_name.clone(),
                version,
                source: component.path.clone(),
                files_count: component.files_count,
                total_size: component.total_size,
            },
        })
    }

    /// Error for a component the installer does not contain.
    #[must_use]
    pub fn not_found(&self, kind: ComponentKind) -> ExtractError {
        ExtractError::ComponentNotFound {
            kind,
            installer_root: self.locator.installer_root().to_path_buf(),
        }
    }

    /// Archive a prepared package.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Archive`] if archiving fails.
    pub fn archive(&self, prepared: &PreparedPackage) -> Result<PackageArtifact, ExtractError> {
        Ok(self
            .archiver
            .archive(&prepared.package_dir, &prepared.request)?)
    }

    fn resolve_version(
        &self,
        kind: ComponentKind,
        component: &InstallerComponent,
        settings: &ComponentSettings,
    ) -> String {
        match kind {
            ComponentKind::Toolchain => {
                let base = component
                    .version
                    .as_deref()
                    .unwrap_or(&settings.default_version);
                let build = settings.binary.as_ref().and_then(|binary| {
                    probe_build_number(
                        &component.path.join(binary),
                        self.config.version_probe_timeout,
                    )
                });
                with_build_number(base, build.as_deref())
            }
            ComponentKind::DebuggerServer => component
                .version
                .clone()
                .or_else(|| {
                    component
                        .path
                        .parent()
                        .and_then(Path::file_name)
                        .and_then(|name| name.to_str())
                        .and_then(version_from_dir_name)
                })
                .unwrap_or_else(|| settings.default_version.clone()),
            ComponentKind::RuntimeLibrary | ComponentKind::Drivers => component
                .version
                .clone()
                .unwrap_or_else(|| settings.default_version.clone()),
        }
    }

    fn write_package_manifest(
        &self,
        package_dir: &Path,
        package_name: &PackageName,
        version: &str,
        settings: &ComponentSettings,
    ) -> Result<(), ExtractError> {
        let manifest = PackageManifest {
            name: package_name.as_str(),
            version,
            description: &settings.description,
            keywords: &settings.keywords,
            system: [self.config.platform_key.as_str()],
        };
        let mut json = serde_json::to_string_pretty(&manifest)?;
        json.push('\n');
        fs::write(package_dir.join("package.json"), json)?;
        Ok(())
    }
}

fn apply_step(component_dir: &Path, package_dir: &Path, step: &CopyStep) -> Result<(), ExtractError> {
    let from = component_dir.join(&step.from);
    let to = package_dir.join(&step.to);
    if !step.required && !from.exists() {
        debug!("skipping missing {}", from.display());
        return Ok(());
    }
    let copy_err = |source| ExtractError::Copy {
        from: from.clone(),
        to: to.clone(),
        source,
    };
    match step.placement {
        Placement::Tree => {
            copy_tree(&from, &to).map_err(copy_err)?;
        }
        Placement::File => copy_file(&from, &to).map_err(copy_err)?,
        Placement::Executable => {
            copy_file(&from, &to).map_err(copy_err)?;
            set_executable(&to).map_err(copy_err)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
