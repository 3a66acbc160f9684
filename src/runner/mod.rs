//! Native launcher collaborator.
//!
//! Every full package embeds a precompiled per-platform launcher binary.
//! The engine treats it as an opaque blob keyed by OS and architecture and
//! never inspects its content.

use skiff_core::{SkiffError, SkiffResult};
use std::fs;
use std::path::{Path, PathBuf};

/// The opaque launcher binary for one OS/architecture.
#[derive(Debug, Clone)]
pub struct LauncherBlob {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Whether the launcher requests elevation when started
    pub elevated: bool,
}

pub trait LauncherProvider: Send + Sync {
    fn launcher_blob(&self, os: &str, arch: &str, app_id: &str) -> SkiffResult<LauncherBlob>;
}

/// Reads prebuilt launcher binaries from `<dir>/<os>-<arch>/`.
///
/// The directory holds exactly one blob per platform. A file whose stem
/// ends in `.elevated` marks an elevation-requesting launcher.
pub struct DirectoryLauncherSource {
    dir: PathBuf,
}

impl DirectoryLauncherSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl LauncherProvider for DirectoryLauncherSource {
    fn launcher_blob(&self, os: &str, arch: &str, app_id: &str) -> SkiffResult<LauncherBlob> {
        let platform_dir = self.dir.join(format!("{}-{}", os, arch));
        if !platform_dir.is_dir() {
            return Err(SkiffError::Validation(format!(
                "No launcher available for {}-{} (looked in {})",
                os,
                arch,
                platform_dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&platform_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let source = files.into_iter().next().ok_or_else(|| {
            SkiffError::Validation(format!(
                "No launcher binary found in {}",
                platform_dir.display()
            ))
        })?;

        let bytes = fs::read(&source)?;
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let elevated = stem.ends_with(".elevated");

        // The blob travels under the application's own name.
        let filename = if os == "windows" {
            format!("{}.exe", app_id)
        } else {
            app_id.to_string()
        };

        Ok(LauncherBlob {
            bytes,
            filename,
            elevated,
        })
    }
}
