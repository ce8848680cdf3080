//! S32 Design Studio packager library.
//!
//! This crate turns an extracted NXP S32 Design Studio for Power
//! Architecture installer into PlatformIO packages. It locates the GCC
//! toolchain, the P&E debugger server, the EWL runtime libraries, and the
//! USB drivers inside the installer tree, lays each out as a package,
//! archives it reproducibly with a SHA-256 digest, and patches the
//! platform's `package.json` manifests. It is used by the `s32ds-packager`
//! binary.
//!
//! # Modules
//!
//! - [`archive`] - Deterministic zip archives with metadata sidecars
//! - [`cli`] - Command-line argument definitions
//! - [`commands`] - Subcommand handlers
//! - [`component`] - Component kinds and located components
//! - [`config`] - TOML configuration with built-in defaults
//! - [`copy`] - Directory tree copying
//! - [`digest`] - Validated SHA-256 digests
//! - [`error`] - Aggregated error type and cause-chain rendering
//! - [`extractor`] - Copying components into package layouts
//! - [`framework`] - FreeRTOS framework repackaging
//! - [`local_link`] - Linking a prebuilt toolchain archive on disk
//! - [`locator`] - Finding components inside an installer tree
//! - [`lock`] - Output directory locking
//! - [`manifest`] - PlatformIO manifest patching
//! - [`orchestrator`] - Multi-component builds
//! - [`package_name`] - Validated package identifiers
//! - [`report`] - Installer analysis reports
//! - [`timestamp`] - ISO 8601 creation timestamps
//! - [`version_probe`] - Toolchain build number detection

pub mod archive;
pub mod cli;
pub mod commands;
pub mod component;
pub mod config;
pub mod copy;
pub mod digest;
pub mod error;
pub mod extractor;
pub mod framework;
pub mod local_link;
pub mod locator;
pub mod lock;
pub mod manifest;
pub mod orchestrator;
pub mod package_name;
pub mod report;
pub mod timestamp;
pub mod version_probe;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
