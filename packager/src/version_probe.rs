//! Build-number discovery for harvested compilers.
//!
//! The S32DS GCC reports its build as `[g<digits>]` in `--version` output,
//! e.g. `powerpc-eabivle-gcc (GCC) 4.9.4 20160726 (build.sh rev=gceb1328 s=F494 -i /opt/freescale ELe200 -V release_gceb1328_build_Fed_ELe200_ML3 [g2724867])`.

use log::debug;
use regex::Regex;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

const BUILD_NUMBER_PATTERN: &str = r"\[g(\d+)\]";

/// Extract the build number from compiler version text.
///
/// # Examples
///
/// ```
/// use s32ds_packager::version_probe::parse_build_number;
///
/// assert_eq!(parse_build_number("gcc 4.9.4 [g2724867]").as_deref(), Some("2724867"));
/// assert_eq!(parse_build_number("gcc 4.9.4"), None);
/// ```
#[must_use]
pub fn parse_build_number(text: &str) -> Option<String> {
    let pattern = Regex::new(BUILD_NUMBER_PATTERN).ok()?;
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Run `<binary> --version` and parse a build number from its output.
///
/// Any failure (missing or non-executable binary, non-zero exit, timeout,
/// unmatched output) yields `None`.
#[must_use]
pub fn probe_build_number(binary: &Path, timeout: Duration) -> Option<String> {
    match run_version(binary, timeout) {
        Ok(Some(text)) => parse_build_number(&text),
        Ok(None) => None,
        Err(err) => {
            debug!("could not run {} --version: {err}", binary.display());
            None
        }
    }
}

/// Append a build number to a base version: `4.9.4` + `2724867` gives
/// `4.9.4.2724867`.
#[must_use]
pub fn with_build_number(base: &str, build: Option<&str>) -> String {
    match build {
        Some(build) => format!("{base}.{build}"),
        None => base.to_owned(),
    }
}

/// Run the binary, returning its stdout when it exits successfully in time.
///
/// Stdout is drained on a separate thread so a chatty binary cannot fill
/// the pipe and stall until the timeout.
fn run_version(binary: &Path, timeout: Duration) -> io::Result<Option<String>> {
    if !binary.is_file() {
        return Ok(None);
    }
    let mut child = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let reader = child
        .stdout
        .take()
        .map(|stdout| thread::spawn(move || io::read_to_string(stdout)));

    let status = child.wait_timeout(timeout)?;
    if status.is_none() {
        if let Err(err) = child.kill() {
            debug!("failed to kill {}: {err}", binary.display());
        }
        child.wait()?;
    }
    let stdout = match reader.map(thread::JoinHandle::join) {
        Some(Ok(read)) => read?,
        Some(Err(_)) => return Err(io::Error::other("stdout reader panicked")),
        None => String::new(),
    };

    match status {
        Some(status) if status.success() => Ok(Some(stdout)),
        Some(status) => {
            debug!("{} --version exited with {status}", binary.display());
            Ok(None)
        }
        None => {
            debug!(
                "{} --version timed out after {} seconds",
                binary.display(),
                timeout.as_secs()
            );
            Ok(None)
        }
    }
}
