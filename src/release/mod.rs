use serde::{Deserialize, Serialize};
use skiff_core::{SkiffError, SkiffResult, Version};
use std::fmt;

pub mod diff;
pub mod packer;
pub mod progress;
pub mod scan;

pub use diff::{diff_releases, ReleaseDiff};
pub use packer::{BuiltPackage, Packer};
pub use progress::{NullProgress, ProgressReporter, ProgressSink};
pub use scan::{find_delta_base, scan_packages, ScannedRelease};

/// File extension of built package artifacts
pub const PACKAGE_EXTENSION: &str = "skiff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    Full,
    Delta,
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseKind::Full => write!(f, "full"),
            ReleaseKind::Delta => write!(f, "delta"),
        }
    }
}

/// One file in a release: relative path inside the installed tree, byte
/// length, and content digest. Paths are '/'-separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub checksum: String,
}

/// The companion metadata document embedded at `release.yaml`: everything a
/// consumer needs to know about the package without extracting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub id: String,
    pub version: String,
    pub os: String,
    pub kind: ReleaseKind,
    /// Version of the full release a delta is relative to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub generated_at: String,
    pub files: Vec<FileRecord>,
    /// Paths removed since the base release (delta only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<String>,
}

impl ReleaseManifest {
    pub fn parse(yaml: &str) -> SkiffResult<Self> {
        let manifest: ReleaseManifest = serde_yaml::from_str(yaml)
            .map_err(|e| SkiffError::Integrity(format!("Unreadable release manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_yaml(&self) -> SkiffResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| SkiffError::Package(format!("Failed to serialize release manifest: {}", e)))
    }

    pub fn validate(&self) -> SkiffResult<()> {
        if self.id.is_empty() {
            return Err(SkiffError::Integrity(
                "Release manifest has an empty id".to_string(),
            ));
        }
        let version = Version::parse(&self.version)?;

        match self.kind {
            ReleaseKind::Full => {
                if self.base.is_some() {
                    return Err(SkiffError::Integrity(format!(
                        "Full release {} {} must not reference a base",
                        self.id, self.version
                    )));
                }
                if !self.deletions.is_empty() {
                    return Err(SkiffError::Integrity(format!(
                        "Full release {} {} must not carry deletions",
                        self.id, self.version
                    )));
                }
            }
            ReleaseKind::Delta => {
                let base = self.base.as_deref().ok_or_else(|| {
                    SkiffError::Integrity(format!(
                        "Delta release {} {} references no base",
                        self.id, self.version
                    ))
                })?;
                let base = Version::parse(base)?;
                if base >= version {
                    return Err(SkiffError::Integrity(format!(
                        "Delta release {} {} has base {} which is not older",
                        self.id, self.version, base
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.kind == ReleaseKind::Full
    }

    pub fn version(&self) -> SkiffResult<Version> {
        Version::parse(&self.version)
    }

    pub fn base_version(&self) -> SkiffResult<Option<Version>> {
        match &self.base {
            Some(base) => Ok(Some(Version::parse(base)?)),
            None => Ok(None),
        }
    }

    /// Canonical artifact file name: `<id>-<version>-<kind>.skiff`
    pub fn package_file_name(&self) -> String {
        package_file_name(&self.id, &self.version, self.kind)
    }

    /// Total content bytes described by the manifest
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Canonical artifact file name for an id/version/kind triple
pub fn package_file_name(id: &str, version: &str, kind: ReleaseKind) -> String {
    format!("{}-{}-{}.{}", id, version, kind, PACKAGE_EXTENSION)
}
