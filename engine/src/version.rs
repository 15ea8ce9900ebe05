//! Dataset versions.
//!
//! Versions are semantic triples. Parsing never fails: a component that is
//! missing or not a number reads as 0, which keeps [`compare_versions`] total
//! over arbitrary strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A parsed `major.minor.patch` triple.
///
/// Ordering is lexicographic over (major, minor, patch).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Which component of a version to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPart {
    Major,
    Minor,
    Patch,
}

impl SemVer {
    /// The version of a device that has never synced.
    pub const ZERO: SemVer = SemVer::new(0, 0, 0);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string.
    ///
    /// Accepts an optional leading `v`/`V`. Each of the first three
    /// dot-separated components is read on its own: a missing or
    /// non-numeric component is 0, and anything past the third is ignored.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let mut components = [0u64; 3];
        for (slot, part) in components.iter_mut().zip(trimmed.split('.')) {
            *slot = part.parse::<u64>().unwrap_or(0);
        }

        Self::new(components[0], components[1], components[2])
    }

    /// Next version after bumping one component.
    pub fn bump(self, part: VersionPart) -> Self {
        match part {
            VersionPart::Major => Self::new(self.major + 1, 0, 0),
            VersionPart::Minor => Self::new(self.major, self.minor + 1, 0),
            VersionPart::Patch => Self::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl From<&str> for SemVer {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Parse a version string into its triple.
pub fn parse_version(input: &str) -> SemVer {
    SemVer::parse(input)
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    SemVer::parse(a).cmp(&SemVer::parse(b))
}

/// Whether `candidate` is strictly newer than `current`.
pub fn is_newer_version(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

/// Bump one component of a version string.
pub fn increment_version(version: &str, part: VersionPart) -> String {
    SemVer::parse(version).bump(part).to_string()
}

/// Metadata describing one published dataset version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersion {
    /// Version string
    pub version: String,
    /// Number of records in (or changed by) this version
    pub record_count: u64,
    /// Dataset checksum at this version
    pub checksum: String,
    /// When the version was released
    pub released_at: DateTime<Utc>,
    /// Whether this is the current version
    pub is_current: bool,
    /// Human-readable changes, oldest first
    #[serde(default)]
    pub changelog: Vec<String>,
}

/// Outcome of asking the remote whether a newer version exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionComparison {
    pub has_update: bool,
    pub current_version: String,
    pub latest_version: String,
    pub change_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<Vec<String>>,
}

/// One-line summary, e.g. `v1.3.0 (Jan 5, 2026) - 1,234 fault codes`.
pub fn format_version_info(version: &DatasetVersion) -> String {
    format!(
        "v{} ({}) - {} fault codes",
        version.version,
        version.released_at.format("%b %-d, %Y"),
        group_thousands(version.record_count)
    )
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_well_formed() {
        assert_eq!(parse_version("1.2.3"), SemVer::new(1, 2, 3));
        assert_eq!(parse_version("v10.0.7"), SemVer::new(10, 0, 7));
        assert_eq!(parse_version("V2.1"), SemVer::new(2, 1, 0));
        assert_eq!(parse_version(" 3 "), SemVer::new(3, 0, 0));
    }

    #[test]
    fn parse_malformed_is_zero() {
        for input in ["", "abc", "..", "-1.0.0"] {
            assert_eq!(parse_version(input), SemVer::ZERO, "input: {:?}", input);
        }

        // Bad components read as 0 one by one.
        assert_eq!(parse_version("1.x.3"), SemVer::new(1, 0, 3));
        assert_eq!(parse_version("1..2"), SemVer::new(1, 0, 2));
        assert_eq!(parse_version("1.2.3-beta"), SemVer::new(1, 2, 0));
        assert_eq!(parse_version("1.2.3.4"), SemVer::new(1, 2, 3));
    }

    #[test]
    fn compare_orders_by_triple() {
        assert_eq!(compare_versions("1.2.0", "1.10.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.99.99"), Ordering::Greater);
        assert_eq!(compare_versions("v1.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn newer_is_strict() {
        assert!(is_newer_version("1.3.0", "1.2.0"));
        assert!(!is_newer_version("1.2.0", "1.2.0"));
        assert!(!is_newer_version("1.1.9", "1.2.0"));
        assert!(is_newer_version("1.0.0", "garbage"));
    }

    #[test]
    fn increment_each_part() {
        assert_eq!(increment_version("1.2.3", VersionPart::Major), "2.0.0");
        assert_eq!(increment_version("1.2.3", VersionPart::Minor), "1.3.0");
        assert_eq!(increment_version("1.2.3", VersionPart::Patch), "1.2.4");
    }

    #[test]
    fn format_info() {
        let version = DatasetVersion {
            version: "1.3.0".into(),
            record_count: 1234567,
            checksum: "deadbeef".into(),
            released_at: Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
            is_current: true,
            changelog: vec![],
        };
        assert_eq!(
            format_version_info(&version),
            "v1.3.0 (Jan 5, 2026) - 1,234,567 fault codes"
        );
    }

    #[test]
    fn group_thousands_small_numbers() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
    }

    #[test]
    fn comparison_serialization_format() {
        let cmp = VersionComparison {
            has_update: true,
            current_version: "1.2.0".into(),
            latest_version: "1.3.0".into(),
            change_count: 5,
            changelog: None,
        };
        let json = serde_json::to_string(&cmp).unwrap();
        assert!(json.contains("\"hasUpdate\":true"));
        assert!(json.contains("\"changeCount\":5"));
        assert!(!json.contains("changelog"));
    }
}
