//! Three-part game version values as they appear in metadata documents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `major.minor.subminor` version from a game metadata document.
///
/// Parsing is total: anything that is not exactly three numeric parts comes
/// back as the zero version. A malformed version is therefore
/// indistinguishable from an explicit `0.0.0` release, and the update check
/// relies on that (a missing local install reads as `0.0.0` and always
/// differs from a published version).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub sub_minor: u32,
}

impl Version {
    pub const ZERO: Version = Version {
        major: 0,
        minor: 0,
        sub_minor: 0,
    };

    /// Parse an `"a.b.c"` string. Any other shape yields [`Version::ZERO`].
    pub fn parse(s: &str) -> Version {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Version::ZERO;
        }

        let numbers: Option<Vec<u32>> = parts.iter().map(|p| p.trim().parse().ok()).collect();
        match numbers.as_deref() {
            Some([major, minor, sub_minor]) => Version {
                major: *major,
                minor: *minor,
                sub_minor: *sub_minor,
            },
            _ => Version::ZERO,
        }
    }

    /// True iff any of the three fields differ. No ordering is defined
    /// between versions; the launcher only ever asks "is this a different
    /// release", not "is this newer".
    pub fn differs(&self, other: &Version) -> bool {
        self != other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.sub_minor)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Version::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed() {
        let v = Version::parse("1.12.3");
        assert_eq!(
            v,
            Version {
                major: 1,
                minor: 12,
                sub_minor: 3
            }
        );
    }

    #[test]
    fn parse_format_round_trips() {
        for v in [
            Version::ZERO,
            Version {
                major: 0,
                minor: 0,
                sub_minor: 1,
            },
            Version {
                major: 10,
                minor: 4,
                sub_minor: 27,
            },
        ] {
            assert_eq!(Version::parse(&v.to_string()), v);
        }
    }

    #[test]
    fn malformed_input_is_zero() {
        assert_eq!(Version::parse("bad"), Version::ZERO);
        assert_eq!(Version::parse("1.2"), Version::ZERO);
        assert_eq!(Version::parse("1.2.3.4"), Version::ZERO);
        assert_eq!(Version::parse("1.2.x"), Version::ZERO);
        assert_eq!(Version::parse(""), Version::ZERO);
    }

    #[test]
    fn differs_is_per_field_and_symmetric() {
        let a = Version::parse("1.0.0");
        let b = Version::parse("1.0.1");
        let c = Version::parse("2.0.0");

        assert!(!a.differs(&a));
        assert!(a.differs(&b));
        assert!(b.differs(&a));
        assert!(a.differs(&c));
    }

    #[test]
    fn serde_uses_string_form() {
        let v: Version = serde_json::from_str("\"2.1.0\"").unwrap();
        assert_eq!(v, Version::parse("2.1.0"));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"2.1.0\"");

        // Malformed strings deserialize to zero rather than erroring.
        let z: Version = serde_json::from_str("\"oops\"").unwrap();
        assert_eq!(z, Version::ZERO);
    }
}
