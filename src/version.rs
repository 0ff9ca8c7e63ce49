//! Model version numbering
//!
//! Versions are a (major, minor) pair rendered as "{major}.{minor:02}",
//! e.g. "1.00", "1.07", "2.00". Ordering is numeric on (major, minor), not
//! string order, so "2.00" sorts after "1.99".

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version string: {0:?}")]
    Invalid(String),
}

/// A two-component model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| VersionError::Invalid(s.to_string()))?;
        let major = major
            .parse::<u32>()
            .map_err(|_| VersionError::Invalid(s.to_string()))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|_| VersionError::Invalid(s.to_string()))?;
        Ok(Version { major, minor })
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the next version for a model from its version history.
///
/// Pure over its input: the caller is responsible for serializing writers so
/// two uploads don't allocate from the same snapshot (see Repository).
pub fn next_version(history: &[Version], force_major_bump: bool) -> Version {
    let latest = match history.iter().max() {
        Some(v) => *v,
        None => return Version::new(1, 0),
    };

    if force_major_bump || latest.minor == 99 {
        Version::new(latest.major + 1, 0)
    } else {
        Version::new(latest.major, latest.minor + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_version() {
        assert_eq!(next_version(&[], false), Version::new(1, 0));
        assert_eq!(next_version(&[], true), Version::new(1, 0));
    }

    #[test]
    fn test_minor_increment() {
        let history = vec![Version::new(1, 0)];
        assert_eq!(next_version(&history, false), Version::new(1, 1));
    }

    #[test]
    fn test_minor_wraps_at_99() {
        let history = vec![Version::new(1, 99)];
        assert_eq!(next_version(&history, false), Version::new(2, 0));
    }

    #[test]
    fn test_forced_major_bump() {
        let history = vec![Version::new(1, 1)];
        assert_eq!(next_version(&history, true), Version::new(2, 0));
    }

    #[test]
    fn test_allocates_from_max_not_last() {
        // History order doesn't matter, only the max does
        let history = vec![Version::new(2, 3), Version::new(1, 99), Version::new(2, 1)];
        assert_eq!(next_version(&history, false), Version::new(2, 4));
    }

    #[test]
    fn test_monotonic_sequence() {
        let mut history = Vec::new();
        for _ in 0..250 {
            let next = next_version(&history, false);
            if let Some(prev) = history.last() {
                assert!(next > *prev);
            }
            history.push(next);
        }
        // 1.00 .. 1.99 then 2.00 .. 2.99 then 3.00 ..
        assert_eq!(history[99], Version::new(1, 99));
        assert_eq!(history[100], Version::new(2, 0));
        assert_eq!(history[249], Version::new(3, 49));
    }

    #[test]
    fn test_display_zero_pads_minor() {
        assert_eq!(Version::new(1, 0).to_string(), "1.00");
        assert_eq!(Version::new(1, 7).to_string(), "1.07");
        assert_eq!(Version::new(12, 34).to_string(), "12.34");
    }

    #[test]
    fn test_parse() {
        assert_eq!("1.00".parse::<Version>().unwrap(), Version::new(1, 0));
        assert_eq!("1.0".parse::<Version>().unwrap(), Version::new(1, 0));
        assert_eq!("10.99".parse::<Version>().unwrap(), Version::new(10, 99));
        assert!("1".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_numeric_ordering() {
        let v199: Version = "1.99".parse().unwrap();
        let v200: Version = "2.00".parse().unwrap();
        let v1002: Version = "10.02".parse().unwrap();
        assert!(v200 > v199);
        assert!(v1002 > v200);
    }

    #[test]
    fn test_serde_as_string() {
        let v = Version::new(3, 5);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"3.05\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
