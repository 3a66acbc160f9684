use skiff::config::Config;
use skiff::core::path::{packages_dir, resolve_dir};
use skiff::core::{SkiffError, SkiffResult};
use skiff::release::scan_packages;
use std::env;
use std::path::{Path, PathBuf};

pub fn run(dir: Option<PathBuf>) -> SkiffResult<()> {
    let working = env::current_dir()
        .map_err(|e| SkiffError::Path(format!("Failed to get current directory: {}", e)))?;
    let config = Config::load()?;

    let dir = dir
        .map(|d| resolve_dir(&working, &d))
        .or_else(|| {
            config
                .packages_dir
                .as_ref()
                .map(|d| resolve_dir(&working, Path::new(d)))
        })
        .unwrap_or_else(|| packages_dir(&working));

    let releases = scan_packages(&dir)?;
    if releases.is_empty() {
        println!("No releases found in {}", dir.display());
        return Ok(());
    }

    println!("Releases in {}:", dir.display());
    for release in releases {
        let m = &release.manifest;
        let base = m
            .base
            .as_ref()
            .map(|b| format!(" (base {})", b))
            .unwrap_or_default();
        println!(
            "  {} {} [{}]{} - {} file(s), {} bytes",
            m.id,
            m.version,
            m.kind,
            base,
            m.files.len(),
            m.total_size()
        );
    }
    Ok(())
}
