use crate::core::error::{SkiffError, SkiffResult};
use std::cmp::Ordering;
use std::fmt;

/// A strict semantic version: `major.minor.patch` with an optional
/// `-prerelease` suffix.
///
/// Releases are addressed by `(app id, version)`, so parsing is strict:
/// exactly three numeric components, and a prerelease tag restricted to
/// ASCII alphanumerics, dots and hyphens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Parse a version string (e.g., "1.2.3" or "1.2.3-rc1")
    pub fn parse(s: &str) -> SkiffResult<Self> {
        let s = s.trim();
        let (numeric, prerelease) = match s.split_once('-') {
            Some((n, p)) => (n, Some(p)),
            None => (s, None),
        };

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() != 3 {
            return Err(SkiffError::Version(format!(
                "Invalid version format: {} (expected major.minor.patch)",
                s
            )));
        }

        let component = |idx: usize, name: &str| -> SkiffResult<u64> {
            parts[idx]
                .parse()
                .map_err(|_| SkiffError::Version(format!("Invalid {} version: {}", name, s)))
        };

        let major = component(0, "major")?;
        let minor = component(1, "minor")?;
        let patch = component(2, "patch")?;

        let prerelease = match prerelease {
            Some(p) => {
                if p.is_empty()
                    || !p
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
                {
                    return Err(SkiffError::Version(format!(
                        "Invalid prerelease tag: {}",
                        s
                    )));
                }
                Some(p.to_string())
            }
            None => None,
        };

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = (self.major, self.minor, self.patch);
        let rhs = (other.major, other.minor, other.patch);
        match lhs.cmp(&rhs) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                // A prerelease sorts below the release it precedes.
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            },
            ord => ord,
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prerelease {
            Some(p) => write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, p),
            None => write!(f, "{}.{}.{}", self.major, self.minor, self.patch),
        }
    }
}
