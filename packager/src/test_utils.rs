//! Shared test utilities: fake installer trees and manifests.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour tests under `tests/`.

use crate::config::PackagerConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Plugin directory name used by [`FakeInstaller::with_pegdbserver`].
pub const PEGDBSERVER_PLUGIN: &str = "com.pemicro.debug.gdbjtag.ppc_1.7.2.201709281658";

/// An extracted installer tree living in a temporary directory.
///
/// Components are laid out at the paths the default configuration expects.
#[derive(Debug)]
pub struct FakeInstaller {
    dir: TempDir,
    config: PackagerConfig,
}

impl FakeInstaller {
    /// Create an installer root with an empty layout directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temporary tree cannot be created.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = PackagerConfig::default();
        fs::create_dir_all(dir.path().join(config.layout_dir.as_std_path()))?;
        Ok(Self { dir, config })
    }

    /// Create an installer root without a layout directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temporary directory cannot be created.
    pub fn without_layout() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            config: PackagerConfig::default(),
        })
    }

    /// Installer root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Layout directory below the root.
    #[must_use]
    pub fn layout(&self) -> PathBuf {
        self.root().join(self.config.layout_dir.as_std_path())
    }

    /// Configuration matching the fake layout.
    #[must_use]
    pub const fn config(&self) -> &PackagerConfig {
        &self.config
    }

    /// Write `contents` to `relative` below the layout directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file or its parents cannot be written.
    pub fn write(&self, relative: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.layout().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Add a toolchain with a compiler that cannot report a build number.
    ///
    /// Writes three regular files: the compiler, a library, and a header.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the files cannot be written.
    pub fn with_toolchain(self) -> io::Result<Self> {
        let base = "Cross_Tools_zg_ia_sf/powerpc-eabivle-4_9";
        self.write(&format!("{base}/bin/powerpc-eabivle-gcc"), b"not a program")?;
        self.write(&format!("{base}/lib/libgcc.a"), &[0u8; 64])?;
        self.write(&format!("{base}/include/stdint.h"), b"#pragma once\n")?;
        Ok(self)
    }

    /// Add a toolchain whose compiler prints `version_text` for `--version`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the script cannot be written.
    #[cfg(unix)]
    pub fn with_scripted_toolchain(self, version_text: &str) -> io::Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let base = "Cross_Tools_zg_ia_sf/powerpc-eabivle-4_9";
        let script = format!("#!/bin/sh\ncat <<'EOF'\n{version_text}\nEOF\n");
        let gcc = self.write(&format!("{base}/bin/powerpc-eabivle-gcc"), script.as_bytes())?;
        fs::set_permissions(&gcc, fs::Permissions::from_mode(0o755))?;
        self.write(&format!("{base}/lib/libgcc.a"), &[0u8; 64])?;
        Ok(self)
    }

    /// Add the debugger plugin under [`PEGDBSERVER_PLUGIN`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the files cannot be written.
    pub fn with_pegdbserver(self) -> io::Result<Self> {
        self.with_pegdbserver_plugin(PEGDBSERVER_PLUGIN)
    }

    /// Add a debugger plugin directory with the given name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the files cannot be written.
    pub fn with_pegdbserver_plugin(self, plugin: &str) -> io::Result<Self> {
        let lin = format!("eclipse_zg_ia_sf/plugins/{plugin}/lin");
        self.write(&format!("{lin}/pegdbserver_power_console"), b"\x7fELF console")?;
        self.write(&format!("{lin}/gdi/unit_ppcnexus.so"), b"\x7fELF gdi")?;
        self.write(&format!("{lin}/gdi/P&E/devices.xml"), b"<devices/>\n")?;
        self.write(&format!("{lin}/build_version.txt"), b"201709281658\n")?;
        self.write(&format!("{lin}/unused/readme.txt"), b"not packaged\n")?;
        Ok(self)
    }

    /// Add the EWL runtime libraries.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the files cannot be written.
    pub fn with_ewl(self) -> io::Result<Self> {
        let base = "S32DS_zg_ia_sf/e200_ewl2";
        self.write(&format!("{base}/lib/libc.a"), &[1u8; 128])?;
        self.write(&format!("{base}/EWL_C/include/stdio.h"), b"int printf(const char *, ...);\n")?;
        Ok(self)
    }

    /// Add the USB drivers.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the files cannot be written.
    pub fn with_drivers(self) -> io::Result<Self> {
        self.write("Drivers_zg_ia_sf/libusb_64_32/install.sh", b"#!/bin/sh\n")?;
        Ok(self)
    }
}

/// A PlatformIO manifest with `name`, `version`, `urls`, `sha256`, and
/// `keywords` for `package`.
#[must_use]
pub fn sample_manifest(package: &str) -> String {
    format!(
        r#"{{
  "name": "{package}",
  "version": "0.0.0",
  "description": "Sample package",
  "urls": {{
    "linux_x86_64": "https://example.invalid/{package}.zip"
  }},
  "sha256": {{
    "linux_x86_64": "{zero}"
  }},
  "keywords": [
    "nxp",
    "powerpc"
  ]
}}
"#,
        zero = "0".repeat(64)
    )
}

/// Write [`sample_manifest`] to `dir/package.json`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn write_sample_manifest(dir: &Path, package: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join("package.json");
    fs::write(&path, sample_manifest(package))?;
    Ok(path)
}
