//! Semantic wrapper for PlatformIO package names.
//!
//! A package name doubles as a directory name and as the stem of the
//! archive, sidecar, and checksum files, so it is validated once at
//! construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A package name that cannot be used as a package directory name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid package name \"{value}\": {reason}")]
pub struct InvalidPackageName {
    /// The rejected name.
    pub value: String,
    /// Description of the validation failure.
    pub reason: &'static str,
}

/// A validated PlatformIO package identifier such as
/// `toolchain-powerpc-eabivle`.
///
/// # Examples
///
/// ```
/// use s32ds_packager::package_name::PackageName;
///
/// let name = PackageName::try_from("tool-pegdbserver-power").unwrap();
/// assert_eq!(name.archive_file_name(), "tool-pegdbserver-power.zip");
/// assert!(PackageName::try_from("../escape").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Get the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a built-in name that is known to satisfy validation.
    pub(crate) fn from_trusted(value: &str) -> Self {
        debug_assert!(validate(value).is_ok(), "built-in name {value} is invalid");
        Self(value.to_owned())
    }

    /// File name of the zip archive for this package.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.0)
    }

    /// File name of the JSON metadata sidecar for this package.
    #[must_use]
    pub fn metadata_file_name(&self) -> String {
        format!("{}.metadata.json", self.0)
    }

    /// File name of the `sha256sum`-style checksum file for this package.
    #[must_use]
    pub fn checksum_file_name(&self) -> String {
        format!("{}.sha256", self.0)
    }
}

impl TryFrom<&str> for PackageName {
    type Error = InvalidPackageName;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for PackageName {
    type Error = InvalidPackageName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)?;
        Ok(Self(value))
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate(value: &str) -> Result<(), InvalidPackageName> {
    let reject = |reason| {
        Err(InvalidPackageName {
            value: value.to_owned(),
            reason,
        })
    };
    if value.is_empty() {
        return reject("name is empty");
    }
    if value.starts_with('.') {
        return reject("name must not start with '.'");
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return reject("only ASCII letters, digits, '-', '_' and '.' are allowed");
    }
    Ok(())
}
