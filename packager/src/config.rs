//! Packager configuration.
//!
//! Every path template, package name, and fallback version the pipeline
//! relies on lives in [`PackagerConfig`], which is passed by reference into
//! each component. The built-in defaults describe the S32 Design Studio for
//! Power Architecture 2017.R1 installer; a TOML file can override any of
//! them:
//!
//! ```toml
//! platform_key = "linux_x86_64"
//!
//! [toolchain]
//! package_name = "toolchain-powerpc-eabivle"
//! default_version = "4.9.4"
//!
//! [framework]
//! url = "https://example.invalid/freertos.zip"
//! ```
//!
//! The file is taken from `--config`, then from the `S32DS_PACKAGER_CONFIG`
//! environment variable, then from `<config dir>/s32ds-packager/config.toml`.

use crate::component::ComponentKind;
use crate::package_name::PackageName;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "S32DS_PACKAGER_CONFIG";

/// File name looked up in the per-user configuration directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("invalid configuration file {path}: {source}")]
    Parse {
        /// Path of the invalid file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Where and how one component kind is harvested and packaged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentSettings {
    /// Path of the component relative to the installer layout directory.
    pub source: Utf8PathBuf,
    /// Glob matched against directories under `source` (debugger plugins).
    pub plugin_pattern: Option<String>,
    /// Subdirectory of the matched plugin holding the host binaries.
    pub platform_subdir: Option<String>,
    /// Package identifier; also the package directory and archive stem.
    pub package_name: PackageName,
    /// Directory under the build output base used by full builds.
    pub output_subdir: String,
    /// Version used when none can be derived from the installer.
    pub default_version: String,
    /// Binary of interest, relative to the component directory.
    pub binary: Option<String>,
    /// Description written to reports and generated manifests.
    pub description: String,
    /// Keywords written to generated manifests.
    pub keywords: Vec<String>,
}

/// Settings for the FreeRTOS framework repackager.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FrameworkSettings {
    /// Download URL of the upstream FreeRTOS release archive.
    pub url: String,
    /// Package identifier of the repackaged framework.
    pub package_name: PackageName,
    /// Version recorded in the metadata and manifest.
    pub version: String,
    /// Path of the FreeRTOS tree inside the downloaded archive.
    pub source_subdir: Utf8PathBuf,
}

impl Default for FrameworkSettings {
    fn default() -> Self {
        Self {
            url: concat!(
                "https://github.com/dapperfu/platform-nxppowerpc/releases/download/",
                "v.0.0.1/freertos-9.0.0_MPC57XXX_public_rel_1.zip"
            )
            .to_owned(),
            package_name: PackageName::from_trusted("framework-freertos-nxp-mpc57xx"),
            version: "9.0.0.1".to_owned(),
            source_subdir: Utf8PathBuf::from("freertos-9.0.0_MPC57XXX_public_rel_1/FreeRTOS"),
        }
    }
}

/// Complete packager configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackagerConfig {
    /// Layout directory relative to the installer root.
    pub layout_dir: Utf8PathBuf,
    /// Platform identifier used as the key in manifest `urls` and `sha256`.
    pub platform_key: String,
    /// Limit for running a harvested binary to read its version.
    pub version_probe_timeout: Duration,
    /// Limit for downloading the framework archive.
    pub download_timeout: Duration,
    /// File name of a prebuilt toolchain archive searched by `link-local`.
    pub toolchain_archive_name: String,
    /// FreeRTOS framework settings.
    pub framework: FrameworkSettings,
    toolchain: ComponentSettings,
    pegdbserver: ComponentSettings,
    ewl_libraries: ComponentSettings,
    drivers: ComponentSettings,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            layout_dir: Utf8PathBuf::from("C_/MakingInstalers/Layout"),
            platform_key: "linux_x86_64".to_owned(),
            version_probe_timeout: Duration::from_secs(5),
            download_timeout: Duration::from_secs(300),
            toolchain_archive_name: "gcc-4.9.4-Ee200-eabivle-x86_64-linux-g2724867.zip"
                .to_owned(),
            framework: FrameworkSettings::default(),
            toolchain: default_settings(ComponentKind::Toolchain),
            pegdbserver: default_settings(ComponentKind::DebuggerServer),
            ewl_libraries: default_settings(ComponentKind::RuntimeLibrary),
            drivers: default_settings(ComponentKind::Drivers),
        }
    }
}

impl PackagerConfig {
    /// Settings for one component kind.
    #[must_use]
    pub const fn component(&self, kind: ComponentKind) -> &ComponentSettings {
        match kind {
            ComponentKind::Toolchain => &self.toolchain,
            ComponentKind::DebuggerServer => &self.pegdbserver,
            ComponentKind::RuntimeLibrary => &self.ewl_libraries,
            ComponentKind::Drivers => &self.drivers,
        }
    }

    /// Mutable settings for one component kind.
    pub const fn component_mut(&mut self, kind: ComponentKind) -> &mut ComponentSettings {
        match kind {
            ComponentKind::Toolchain => &mut self.toolchain,
            ComponentKind::DebuggerServer => &mut self.pegdbserver,
            ComponentKind::RuntimeLibrary => &mut self.ewl_libraries,
            ComponentKind::Drivers => &mut self.drivers,
        }
    }

    /// Load configuration, honouring an explicit path first.
    ///
    /// Falls back to [`CONFIG_ENV_VAR`], then the per-user configuration
    /// file, then the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicitly named file (by flag or
    /// environment) is unreadable, or when any file found is invalid.
    pub fn load(explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path.as_std_path());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            return Self::from_path(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_path(&path),
            _ => {
                debug!("no configuration file found; using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!("loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Parse configuration overrides from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed text or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.apply(Self::default()))
    }
}

/// Per-user configuration file location.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories_next::ProjectDirs::from("", "", "s32ds-packager")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// On-disk shape of the configuration file; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    layout_dir: Option<Utf8PathBuf>,
    platform_key: Option<String>,
    version_probe_timeout_secs: Option<u64>,
    download_timeout_secs: Option<u64>,
    toolchain_archive_name: Option<String>,
    framework: Option<FrameworkSettings>,
    toolchain: Option<ComponentOverrides>,
    pegdbserver: Option<ComponentOverrides>,
    ewl_libraries: Option<ComponentOverrides>,
    drivers: Option<ComponentOverrides>,
}

impl ConfigFile {
    fn apply(self, mut config: PackagerConfig) -> PackagerConfig {
        if let Some(layout_dir) = self.layout_dir {
            config.layout_dir = layout_dir;
        }
        if let Some(platform_key) = self.platform_key {
            config.platform_key = platform_key;
        }
        if let Some(secs) = self.version_probe_timeout_secs {
            config.version_probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.download_timeout_secs {
            config.download_timeout = Duration::from_secs(secs);
        }
        if let Some(name) = self.toolchain_archive_name {
            config.toolchain_archive_name = name;
        }
        if let Some(framework) = self.framework {
            config.framework = framework;
        }
        for (kind, overrides) in [
            (ComponentKind::Toolchain, self.toolchain),
            (ComponentKind::DebuggerServer, self.pegdbserver),
            (ComponentKind::RuntimeLibrary, self.ewl_libraries),
            (ComponentKind::Drivers, self.drivers),
        ] {
            if let Some(overrides) = overrides {
                overrides.apply(config.component_mut(kind));
            }
        }
        config
    }
}

/// Partial [`ComponentSettings`] read from a configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ComponentOverrides {
    source: Option<Utf8PathBuf>,
    plugin_pattern: Option<String>,
    platform_subdir: Option<String>,
    package_name: Option<PackageName>,
    output_subdir: Option<String>,
    default_version: Option<String>,
    binary: Option<String>,
    description: Option<String>,
    keywords: Option<Vec<String>>,
}

impl ComponentOverrides {
    fn apply(self, settings: &mut ComponentSettings) {
        if let Some(source) = self.source {
            settings.source = source;
        }
        if self.plugin_pattern.is_some() {
            settings.plugin_pattern = self.plugin_pattern;
        }
        if self.platform_subdir.is_some() {
            settings.platform_subdir = self.platform_subdir;
        }
        if let Some(name) = self.package_name {
            settings.package_name = name;
        }
        if let Some(subdir) = self.output_subdir {
            settings.output_subdir = subdir;
        }
        if let Some(version) = self.default_version {
            settings.default_version = version;
        }
        if self.binary.is_some() {
            settings.binary = self.binary;
        }
        if let Some(description) = self.description {
            settings.description = description;
        }
        if let Some(keywords) = self.keywords {
            settings.keywords = keywords;
        }
    }
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_owned()).collect()
}

/// Built-in settings describing the 2017.R1 installer layout.
fn default_settings(kind: ComponentKind) -> ComponentSettings {
    match kind {
        ComponentKind::Toolchain => ComponentSettings {
            source: Utf8PathBuf::from("Cross_Tools_zg_ia_sf/powerpc-eabivle-4_9"),
            plugin_pattern: None,
            platform_subdir: None,
            package_name: PackageName::from_trusted("toolchain-powerpc-eabivle"),
            output_subdir: "toolchain".to_owned(),
            default_version: "4.9.4".to_owned(),
            binary: Some("bin/powerpc-eabivle-gcc".to_owned()),
            description: "GCC PowerPC EABI VLE toolchain".to_owned(),
            keywords: keywords(&["toolchain", "gcc", "powerpc", "e200", "vle", "nxp"]),
        },
        ComponentKind::DebuggerServer => ComponentSettings {
            source: Utf8PathBuf::from("eclipse_zg_ia_sf/plugins"),
            plugin_pattern: Some("com.pemicro.debug.gdbjtag.ppc_*".to_owned()),
            platform_subdir: Some("lin".to_owned()),
            package_name: PackageName::from_trusted("tool-pegdbserver-power"),
            output_subdir: "pegdbserver".to_owned(),
            default_version: "1.7.2.201709281658".to_owned(),
            binary: Some("pegdbserver_power_console".to_owned()),
            description: "P&E Micro GDB Server for Power Architecture".to_owned(),
            keywords: keywords(&[
                "tools", "debugger", "opensda", "pemicro", "powerpc", "e200", "mpc57xx",
                "mpc56xx", "nxp",
            ]),
        },
        ComponentKind::RuntimeLibrary => ComponentSettings {
            source: Utf8PathBuf::from("S32DS_zg_ia_sf/e200_ewl2"),
            plugin_pattern: None,
            platform_subdir: None,
            package_name: PackageName::from_trusted("library-ewl-powerpc-eabivle"),
            output_subdir: "ewl_library".to_owned(),
            default_version: "2.0.0".to_owned(),
            binary: None,
            description: "EWL Runtime Libraries for e200 cores".to_owned(),
            keywords: keywords(&["library", "ewl", "runtime", "powerpc", "e200", "nxp"]),
        },
        ComponentKind::Drivers => ComponentSettings {
            source: Utf8PathBuf::from("Drivers_zg_ia_sf/libusb_64_32"),
            plugin_pattern: None,
            platform_subdir: None,
            package_name: PackageName::from_trusted("tool-pemicro-drivers"),
            output_subdir: "drivers".to_owned(),
            default_version: "1.0.0".to_owned(),
            binary: None,
            description: "USB drivers for P&E Micro hardware".to_owned(),
            keywords: keywords(&["tools", "drivers", "libusb", "pemicro"]),
        },
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
