use crate::archive::{PackageReader, RELEASE_MANIFEST_ENTRY};
use crate::release::{ReleaseManifest, PACKAGE_EXTENSION};
use skiff_core::{SkiffResult, Version};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One release artifact found in a packages directory.
#[derive(Debug, Clone)]
pub struct ScannedRelease {
    pub path: PathBuf,
    pub manifest: ReleaseManifest,
}

impl ScannedRelease {
    pub fn version(&self) -> SkiffResult<Version> {
        self.manifest.version()
    }
}

/// Enumerate all release artifacts in a packages directory.
///
/// Read-only. Unreadable or corrupt artifacts are skipped with a warning
/// rather than aborting the scan. A missing directory yields an empty list.
pub fn scan_packages(dir: &Path) -> SkiffResult<Vec<ScannedRelease>> {
    let mut releases = Vec::new();
    if !dir.exists() {
        return Ok(releases);
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e == PACKAGE_EXTENSION)
                    .unwrap_or(false)
        })
        .collect();
    entries.sort();

    for path in entries {
        match read_manifest(&path) {
            Ok(manifest) => releases.push(ScannedRelease { path, manifest }),
            Err(e) => {
                warn!("Skipping unreadable package {}: {}", path.display(), e);
            }
        }
    }

    Ok(releases)
}

fn read_manifest(path: &Path) -> SkiffResult<ReleaseManifest> {
    let mut reader = PackageReader::open(path)?;
    let content = reader.read_entry_string(RELEASE_MANIFEST_ENTRY)?;
    ReleaseManifest::parse(&content)
}

/// Select the most recent full (non-delta) release of an application as the
/// delta base candidate. `None` means no base is available and the builder
/// should produce a full package only.
///
/// Ordering is descending by semantic version; a version tie goes to the
/// lexicographically later artifact name, deterministically.
pub fn find_delta_base(dir: &Path, app_id: &str) -> SkiffResult<Option<ScannedRelease>> {
    let mut candidates: Vec<(Version, ScannedRelease)> = Vec::new();

    for release in scan_packages(dir)? {
        if release.manifest.id != app_id || !release.manifest.is_full() {
            continue;
        }
        match release.version() {
            Ok(version) => candidates.push((version, release)),
            Err(e) => {
                warn!(
                    "Skipping package with unparsable version {}: {}",
                    release.path.display(),
                    e
                );
            }
        }
    }

    candidates.sort_by(|(va, ra), (vb, rb)| {
        va.cmp(vb)
            .then_with(|| ra.path.file_name().cmp(&rb.path.file_name()))
    });

    Ok(candidates.pop().map(|(_, release)| release))
}
