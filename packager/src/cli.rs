//! Command-line argument definitions.
//!
//! Kept apart from the binary so argument parsing can be unit tested.

use crate::component::ComponentKind;
use camino::Utf8PathBuf;
use clap::{ArgGroup, Args, Parser, Subcommand};

/// Repackage S32 Design Studio installer components as PlatformIO packages.
#[derive(Parser, Debug)]
#[command(name = "s32ds-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Repackage S32 Design Studio installer components as PlatformIO packages.\n\n",
    "Point the packager at an extracted S32DS for Power Architecture installer. ",
    "It locates the GCC toolchain, the P&E debugger server, and the EWL runtime ",
    "libraries, copies each into a package layout, archives it as a zip with a ",
    "SHA-256 digest, and can patch the platform's package.json manifests to use ",
    "the new archives.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Inspect an installer:\n",
    "    $ s32ds-packager analyze ~/s32ds-extracted\n\n",
    "  Build every package and patch the platform manifests:\n",
    "    $ s32ds-packager build ~/s32ds-extracted -o dist -p .\n\n",
    "  Package the debugger server alone:\n",
    "    $ s32ds-packager package ~/s32ds-extracted dist --component pegdbserver\n\n",
    "  Use a toolchain zip that is already on disk:\n",
    "    $ s32ds-packager link-local tools/toolchain-powerpc-eabivle/package.json",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file [default: per-user config, then built-in values].
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<Utf8PathBuf>,
}

impl Cli {
    /// Log filter directive implied by `-v`/`-q`.
    #[must_use]
    pub const fn log_filter_directive(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Report which components an installer contains.
    Analyze(AnalyzeArgs),

    /// Package every component and optionally patch platform manifests.
    Build(BuildArgs),

    /// Package one component.
    Package(PackageArgs),

    /// Repackage the FreeRTOS framework release.
    Framework(FrameworkArgs),

    /// Point the toolchain manifest at a toolchain zip already on disk.
    LinkLocal(LinkLocalArgs),
}

/// Arguments for `analyze`.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Root of the extracted installer.
    pub installer_root: Utf8PathBuf,

    /// Also write the analysis as JSON to this file.
    #[arg(long, value_name = "PATH")]
    pub json: Option<Utf8PathBuf>,
}

/// Arguments for `build`.
#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("only")
        .args(["toolchain_only", "pegdbserver_only", "ewl_only", "drivers_only"])
        .multiple(false)
))]
pub struct BuildArgs {
    /// Root of the extracted installer.
    pub installer_root: Utf8PathBuf,

    /// Output base directory.
    #[arg(short, long, value_name = "DIR", default_value = "packages")]
    pub output: Utf8PathBuf,

    /// Platform root whose `tools/<package>/package.json` files are patched.
    #[arg(short, long, value_name = "DIR")]
    pub platform_root: Option<Utf8PathBuf>,

    /// Build only the toolchain.
    #[arg(long)]
    pub toolchain_only: bool,

    /// Build only the debugger server.
    #[arg(long)]
    pub pegdbserver_only: bool,

    /// Build only the EWL runtime libraries.
    #[arg(long)]
    pub ewl_only: bool,

    /// Build only the USB drivers.
    #[arg(long)]
    pub drivers_only: bool,
}

impl BuildArgs {
    /// Components selected by the `--*-only` flags, in build order.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentKind> {
        let only = [
            (self.toolchain_only, ComponentKind::Toolchain),
            (self.pegdbserver_only, ComponentKind::DebuggerServer),
            (self.ewl_only, ComponentKind::RuntimeLibrary),
            (self.drivers_only, ComponentKind::Drivers),
        ];
        let selected: Vec<_> = only
            .iter()
            .filter_map(|&(flag, kind)| flag.then_some(kind))
            .collect();
        if selected.is_empty() {
            ComponentKind::BUILD_ORDER.to_vec()
        } else {
            selected
        }
    }
}

/// Arguments for `package`.
#[derive(Args, Debug, Clone)]
pub struct PackageArgs {
    /// Root of the extracted installer.
    pub installer_root: Utf8PathBuf,

    /// Directory receiving the package directory and archive.
    pub output_dir: Utf8PathBuf,

    /// Component to package: toolchain, pegdbserver, ewl, or drivers.
    #[arg(long, value_name = "KIND")]
    pub component: ComponentKind,

    /// Package name overriding the configured one.
    #[arg(long, value_name = "NAME")]
    pub package_name: Option<String>,

    /// Patch this package.json to point at the new archive.
    #[arg(long, value_name = "MANIFEST")]
    pub update_package_json: Option<Utf8PathBuf>,

    /// Keep an existing http(s) URL in the manifest; only update the digest.
    #[arg(long, requires = "update_package_json")]
    pub keep_remote_url: bool,
}

/// Arguments for `framework`.
#[derive(Args, Debug, Clone)]
pub struct FrameworkArgs {
    /// Output directory.
    #[arg(short, long, value_name = "DIR", default_value = "packages/framework")]
    pub output: Utf8PathBuf,

    /// Source archive URL overriding the configured one.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Reuse an already downloaded source archive.
    #[arg(long)]
    pub skip_download: bool,

    /// Patch this package.json with the source digest and version.
    #[arg(long, value_name = "MANIFEST")]
    pub update_package_json: Option<Utf8PathBuf>,
}

/// Arguments for `link-local`.
#[derive(Args, Debug, Clone)]
pub struct LinkLocalArgs {
    /// The toolchain package.json to patch.
    pub manifest: Utf8PathBuf,

    /// Directory to search recursively (repeatable) [default: common locations].
    #[arg(long = "search", value_name = "DIR")]
    pub search: Vec<Utf8PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
