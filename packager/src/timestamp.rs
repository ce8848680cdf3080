//! ISO 8601 creation timestamps for package metadata.
//!
//! Timestamps are formatted from `SystemTime` as `YYYY-MM-DDThh:mm:ssZ`
//! without pulling in a calendar crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};
use thiserror::Error;

/// A timestamp string without the `YYYY-MM-DDThh:mm:ssZ` shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp {0:?}: expected YYYY-MM-DDThh:mm:ssZ")]
pub struct InvalidTimestamp(pub String);

/// An ISO 8601 UTC timestamp recording when an archive was created.
///
/// Deserialization rejects strings without the UTC timestamp shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CreatedAt(String);

impl CreatedAt {
    /// Wrap an existing timestamp string without validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use s32ds_packager::timestamp::CreatedAt;
    ///
    /// let ts = CreatedAt::new("2026-02-03T00:00:00Z");
    /// assert_eq!(ts.as_str(), "2026-02-03T00:00:00Z");
    /// ```
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Current UTC time.
    ///
    /// # Errors
    ///
    /// Returns an error if the system clock is set before the Unix epoch.
    pub fn now() -> Result<Self, SystemTimeError> {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        Ok(Self(format_epoch_secs(secs)))
    }

    /// Return the timestamp as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CreatedAt {
    type Error = InvalidTimestamp;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_iso8601_utc(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidTimestamp(value))
        }
    }
}

impl From<CreatedAt> for String {
    fn from(value: CreatedAt) -> Self {
        value.0
    }
}

impl fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_iso8601_utc(ts: &str) -> bool {
    let b = ts.as_bytes();
    let digits = |range: std::ops::Range<usize>| {
        b.get(range)
            .is_some_and(|slice| slice.iter().all(u8::is_ascii_digit))
    };
    b.len() == 20
        && b.get(4) == Some(&b'-')
        && b.get(7) == Some(&b'-')
        && b.get(10) == Some(&b'T')
        && b.get(13) == Some(&b':')
        && b.get(16) == Some(&b':')
        && b.get(19) == Some(&b'Z')
        && digits(0..4)
        && digits(5..7)
        && digits(8..10)
        && digits(11..13)
        && digits(14..16)
        && digits(17..19)
}

/// Format a Unix epoch timestamp as `YYYY-MM-DDThh:mm:ssZ`.
#[must_use]
pub fn format_epoch_secs(epoch_secs: u64) -> String {
    let (year, month, day) = civil_from_epoch(epoch_secs);
    let day_secs = epoch_secs % 86_400;
    let hour = day_secs / 3_600;
    let minute = (day_secs % 3_600) / 60;
    let second = day_secs % 60;
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Convert a Unix epoch timestamp to a `(year, month, day)` triple.
///
/// Howard Hinnant's `civil_from_days` algorithm.
fn civil_from_epoch(epoch_secs: u64) -> (u64, u64, u64) {
    let days = epoch_secs / 86_400 + 719_468;
    let era = days / 146_097;
    let doe = days % 146_097; // day of era [0, 146_096]
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unix_epoch(0, "1970-01-01T00:00:00Z")]
    #[case::y2k(946_684_800, "2000-01-01T00:00:00Z")]
    #[case::leap_day(951_782_400, "2000-02-29T00:00:00Z")]
    #[case::midday_2026(1_771_156_800, "2026-02-15T12:00:00Z")]
    fn format_epoch_secs_produces_iso8601(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_epoch_secs(secs), expected);
    }

    #[rstest]
    #[case::valid("2026-02-12T10:00:00Z", true)]
    #[case::too_short("2026-02-12T10:00Z", false)]
    #[case::no_z("2026-02-12T10:00:00X", false)]
    #[case::letters("XXXX-XX-XXTXX:XX:XXZ", false)]
    fn shape_validation(#[case] ts: &str, #[case] ok: bool) {
        assert_eq!(is_iso8601_utc(ts), ok);
    }

    #[test]
    fn deserialization_rejects_malformed_timestamps() {
        let ok: CreatedAt = serde_json::from_str("\"2026-02-12T10:00:00Z\"").expect("valid");
        assert_eq!(ok.as_str(), "2026-02-12T10:00:00Z");
        assert!(serde_json::from_str::<CreatedAt>("\"yesterday\"").is_err());
    }

    #[test]
    fn now_has_valid_shape() {
        let now = CreatedAt::now().expect("clock after epoch");
        assert!(is_iso8601_utc(now.as_str()), "{now}");
    }
}
