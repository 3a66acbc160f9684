use skiff::config::Config;
use skiff::core::path::{artifacts_dir as default_artifacts_dir, ensure_dir, packages_dir, resolve_dir};
use skiff::core::{AppDescriptor, SkiffError, SkiffResult, Version};
use skiff::release::progress::BarProgress;
use skiff::release::{find_delta_base, package_file_name, Packer, ReleaseKind};
use skiff::runner::{DirectoryLauncherSource, LauncherProvider};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run(
    app_id: String,
    version: String,
    rid: Option<String>,
    force: bool,
    artifacts_dir: Option<PathBuf>,
) -> SkiffResult<()> {
    let working = env::current_dir()
        .map_err(|e| SkiffError::Path(format!("Failed to get current directory: {}", e)))?;
    let config = Config::load()?;

    let mut descriptor = AppDescriptor::load(&working)?;
    if descriptor.id != app_id {
        return Err(SkiffError::Validation(format!(
            "skiff.yaml describes '{}', not '{}'",
            descriptor.id, app_id
        )));
    }
    descriptor.version = version.clone();
    if let Some(rid) = rid {
        descriptor.target.rid = rid;
    }
    descriptor.validate()?;
    let new_version = Version::parse(&version)?;

    let artifacts = resolve_dir(
        &working,
        &artifacts_dir.unwrap_or_else(|| default_artifacts_dir(&working)),
    );
    let packages = config
        .packages_dir
        .as_ref()
        .map(|d| resolve_dir(&working, Path::new(d)))
        .unwrap_or_else(|| packages_dir(&working));
    ensure_dir(&packages)?;

    let full_dest = packages.join(package_file_name(&app_id, &version, ReleaseKind::Full));
    if full_dest.exists() && !force {
        return Err(SkiffError::Validation(format!(
            "{} {} is already built; pass --force to overwrite",
            app_id, version
        )));
    }

    let launchers = config
        .launchers_dir
        .as_ref()
        .map(|d| resolve_dir(&working, Path::new(d)))
        .unwrap_or_else(|| working.join("runners"));
    let launcher = DirectoryLauncherSource::new(launchers).launcher_blob(
        &descriptor.target.os,
        descriptor.target.arch(),
        &descriptor.id,
    )?;

    // A base only qualifies when it is strictly older than what we build.
    let base = find_delta_base(&packages, &app_id)?
        .filter(|b| matches!(b.version(), Ok(v) if v < new_version));

    let staging = tempfile::tempdir()?;
    let progress = Arc::new(BarProgress::new(format!("Packing {}@{}", app_id, version)));
    let packer = Packer::new(&working, descriptor).with_progress(progress.clone());

    let full = packer
        .build_full(&artifacts, &launcher, staging.path())
        .await?;
    progress.finish();
    move_into(&full.path, &full_dest)?;
    println!(
        "✓ Built full package: {} ({} files)",
        full_dest.display(),
        full.manifest.files.len()
    );

    if let Some(base) = base {
        let delta = packer
            .build_delta(&base.path, &full_dest, staging.path())
            .await?;
        let delta_dest = packages.join(delta.manifest.package_file_name());
        move_into(&delta.path, &delta_dest)?;
        println!(
            "✓ Built delta package: {} ({} entries, {} deletions, base {})",
            delta_dest.display(),
            delta.manifest.files.len(),
            delta.manifest.deletions.len(),
            base.manifest.version
        );
    } else {
        println!("  No previous full release found; full package only");
    }

    Ok(())
}

/// Move a staged artifact into the packages directory. Rename when
/// possible, copy across filesystems.
fn move_into(source: &Path, dest: &Path) -> SkiffResult<()> {
    if fs::rename(source, dest).is_err() {
        fs::copy(source, dest)?;
        let _ = fs::remove_file(source);
    }
    Ok(())
}
