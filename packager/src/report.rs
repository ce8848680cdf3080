//! Installer analysis report.
//!
//! Renders the locator's findings for people (sizes in MB, grouped file
//! counts) and exports them as JSON for scripts.

use crate::component::{ComponentKind, InstallerComponent};
use crate::locator::InstallerLocator;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const RULE: &str = "======================================================================";

/// Everything the locator found in one installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// Installer root that was analysed.
    pub installer_root: PathBuf,
    /// Layout directory below the root.
    pub layout_dir: PathBuf,
    /// Found components, keyed by kind.
    pub components: BTreeMap<ComponentKind, InstallerComponent>,
}

impl AnalysisReport {
    /// Analyse an installer through `locator`.
    #[must_use]
    pub fn from_locator(locator: &InstallerLocator<'_>) -> Self {
        Self {
            installer_root: locator.installer_root().to_path_buf(),
            layout_dir: locator.layout_dir().to_path_buf(),
            components: locator.analyze(),
        }
    }

    /// Write the human-readable report.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `out`.
    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{RULE}")?;
        writeln!(out, "S32 Design Studio Installer Analysis")?;
        writeln!(out, "{RULE}")?;
        writeln!(out)?;
        writeln!(out, "Installer root: {}", self.installer_root.display())?;
        writeln!(out, "Layout directory: {}", self.layout_dir.display())?;
        writeln!(out)?;
        writeln!(out, "Found {} component(s):", self.components.len())?;
        writeln!(out)?;
        for (kind, component) in &self.components {
            writeln!(out, "  {}", kind.key().to_ascii_uppercase())?;
            writeln!(out, "    Type:        {}", kind.label())?;
            writeln!(out, "    Path:        {}", component.path.display())?;
            if let Some(version) = &component.version {
                writeln!(out, "    Version:     {version}")?;
            }
            if let Some(description) = &component.description {
                writeln!(out, "    Description: {description}")?;
            }
            writeln!(
                out,
                "    Files:       {}",
                group_thousands(component.files_count)
            )?;
            writeln!(out, "    Size:        {}", format_size_mb(component.total_size))?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Write the report as pretty-printed JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()
    }
}

/// Format a byte count as mebibytes with two decimals, e.g. `1.50 MB`.
#[must_use]
pub fn format_size_mb(bytes: u64) -> String {
    const MIB: u128 = 1024 * 1024;
    let hundredths = (u128::from(bytes) * 100 + MIB / 2) / MIB;
    format!("{}.{:02} MB", hundredths / 100, hundredths % 100)
}

/// Format a count with comma thousands separators, e.g. `12,345`.
#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeInstaller;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0.00 MB")]
    #[case(1_048_576, "1.00 MB")]
    #[case(1_572_864, "1.50 MB")]
    #[case(5_242, "0.00 MB")]
    #[case(5_243, "0.01 MB")]
    fn formats_sizes_in_mebibytes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_size_mb(bytes), expected);
    }

    #[rstest]
    #[case(7, "7")]
    #[case(999, "999")]
    #[case(1_000, "1,000")]
    #[case(1_234_567, "1,234,567")]
    fn groups_thousands(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(group_thousands(value), expected);
    }

    #[test]
    fn renders_found_components() {
        let installer = FakeInstaller::new()
            .and_then(FakeInstaller::with_toolchain)
            .expect("fake installer");
        let locator = InstallerLocator::new(installer.root(), installer.config()).expect("locator");
        let report = AnalysisReport::from_locator(&locator);
        let mut out = Vec::new();
        report.render(&mut out).expect("render");
        let text = String::from_utf8(out).expect("utf-8");
        assert!(text.contains("Found 1 component(s):"), "{text}");
        assert!(text.contains("  TOOLCHAIN"), "{text}");
        assert!(text.contains("Version:     4.9.4"), "{text}");
        assert!(text.contains("Files:       3"), "{text}");
    }

    #[test]
    fn exports_json_keyed_by_component() {
        let installer = FakeInstaller::new()
            .and_then(FakeInstaller::with_ewl)
            .expect("fake installer");
        let locator = InstallerLocator::new(installer.root(), installer.config()).expect("locator");
        let path = installer.root().join("analysis.json");
        AnalysisReport::from_locator(&locator)
            .write_json(&path)
            .expect("export");
        let value: serde_json::Value =
            serde_json::from_str(&fs_read(&path)).expect("valid json");
        let ewl = &value["components"]["ewl_libraries"];
        assert_eq!(ewl["component_type"], "ewl_libraries");
        assert_eq!(ewl["files_count"], 2);
        assert!(ewl["version"].is_null());
    }

    fn fs_read(path: &Path) -> String {
        std::fs::read_to_string(path).expect("read")
    }
}
