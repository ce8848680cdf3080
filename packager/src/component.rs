//! Installer component kinds and the records the locator produces.
//!
//! [`ComponentKind`] is the single dispatch point for everything that
//! differs between the toolchain, the debugger server, the runtime library,
//! and the drivers: their keys, their configuration tables, and their copy
//! rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// One harvestable unit of the S32 Design Studio installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// GCC PowerPC EABI VLE cross toolchain.
    Toolchain,
    /// P&E Micro GDB server for Power Architecture.
    #[serde(rename = "pegdbserver")]
    DebuggerServer,
    /// EWL runtime libraries for e200 cores.
    #[serde(rename = "ewl_libraries")]
    RuntimeLibrary,
    /// USB drivers for P&E Micro hardware.
    Drivers,
}

impl ComponentKind {
    /// Every kind, in the fixed order used for analysis.
    pub const ALL: [Self; 4] = [
        Self::Toolchain,
        Self::DebuggerServer,
        Self::RuntimeLibrary,
        Self::Drivers,
    ];

    /// Kinds packaged by a full build, in build order.
    pub const BUILD_ORDER: [Self; 3] = [Self::Toolchain, Self::DebuggerServer, Self::RuntimeLibrary];

    /// Stable key used in analysis output, configuration, and the CLI.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Toolchain => "toolchain",
            Self::DebuggerServer => "pegdbserver",
            Self::RuntimeLibrary => "ewl_libraries",
            Self::Drivers => "drivers",
        }
    }

    /// Human-readable label used in reports and summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Toolchain => "Toolchain",
            Self::DebuggerServer => "PEGDBServer",
            Self::RuntimeLibrary => "EWL Library",
            Self::Drivers => "Drivers",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A component key that matches no known kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown component \"{0}\"; expected one of: toolchain, pegdbserver, ewl, drivers")]
pub struct UnknownComponent(pub String);

impl FromStr for ComponentKind {
    type Err = UnknownComponent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toolchain" | "gcc" => Ok(Self::Toolchain),
            "pegdbserver" | "debugger" | "debugger-server" => Ok(Self::DebuggerServer),
            "ewl" | "ewl_libraries" | "ewl-library" | "runtime-library" => {
                Ok(Self::RuntimeLibrary)
            }
            "drivers" => Ok(Self::Drivers),
            _ => Err(UnknownComponent(s.to_owned())),
        }
    }
}

/// A component located inside an installer tree.
///
/// Only ever built for a source path that exists at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallerComponent {
    /// Which kind of component this is.
    #[serde(rename = "component_type")]
    pub kind: ComponentKind,
    /// Directory holding the component's files.
    pub path: PathBuf,
    /// Version known from the installer layout, if any.
    pub version: Option<String>,
    /// Short description for reports.
    pub description: Option<String>,
    /// Number of regular files under `path`.
    pub files_count: u64,
    /// Total size in bytes of the readable files under `path`.
    pub total_size: u64,
}

/// Outcome of a single locator lookup.
///
/// Absence is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The component exists in the installer.
    Found(InstallerComponent),
    /// The expected path is missing.
    Absent,
}

impl Lookup {
    /// Convert into an `Option`, dropping the absence marker.
    #[must_use]
    pub fn into_option(self) -> Option<InstallerComponent> {
        match self {
            Self::Found(component) => Some(component),
            Self::Absent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("toolchain", ComponentKind::Toolchain)]
    #[case("pegdbserver", ComponentKind::DebuggerServer)]
    #[case("EWL", ComponentKind::RuntimeLibrary)]
    #[case("ewl_libraries", ComponentKind::RuntimeLibrary)]
    #[case(" drivers ", ComponentKind::Drivers)]
    fn parses_keys_and_aliases(#[case] raw: &str, #[case] expected: ComponentKind) {
        assert_eq!(raw.parse::<ComponentKind>().expect("known"), expected);
    }

    #[test]
    fn rejects_unknown_component() {
        let err = "bootloader".parse::<ComponentKind>().expect_err("unknown");
        assert!(err.to_string().contains("bootloader"));
    }

    #[test]
    fn keys_round_trip_through_from_str() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.key().parse::<ComponentKind>().expect("key"), kind);
        }
    }

    #[test]
    fn serde_uses_component_keys() {
        let json = serde_json::to_string(&ComponentKind::DebuggerServer).expect("serialize");
        assert_eq!(json, "\"pegdbserver\"");
    }

    #[test]
    fn lookup_converts_to_option() {
        assert!(Lookup::Absent.into_option().is_none());
    }
}
