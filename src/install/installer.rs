use crate::archive::{PackageReader, RELEASE_MANIFEST_ENTRY};
use crate::install::hooks::{self, HookOutcome};
use crate::install::processes::{ProcessTerminator, SystemProcesses};
use crate::install::shortcuts::{NoShortcuts, ShortcutProvider};
use crate::release::{ReleaseKind, ReleaseManifest};
use skiff_core::core::path::{packages_cache_dir, version_dir};
use skiff_core::{AppDescriptor, SkiffError, SkiffResult, Version};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default per-hook timeout
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// A completed install or update.
#[derive(Debug)]
pub struct InstalledApp {
    pub id: String,
    pub version: Version,
    pub root: PathBuf,
    pub version_dir: PathBuf,
    pub hook_results: Vec<(PathBuf, HookOutcome)>,
}

/// Applies packages to a target machine: directory lifecycle, process
/// lifecycle, post-install hooks.
///
/// Transitions are plain ordered filesystem steps with no intermediate
/// state persisted; a crash mid-sequence leaves whatever the last
/// completed step wrote, and re-running the operation recovers. Two
/// installers targeting the same root concurrently is unsupported.
pub struct Installer {
    hook_timeout: Duration,
    processes: Box<dyn ProcessTerminator>,
    shortcuts: Box<dyn ShortcutProvider>,
    cancel: CancellationToken,
}

impl Default for Installer {
    fn default() -> Self {
        Self::new()
    }
}

impl Installer {
    pub fn new() -> Self {
        Self {
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            processes: Box::new(SystemProcesses),
            shortcuts: Box::new(NoShortcuts),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    pub fn with_processes(mut self, processes: Box<dyn ProcessTerminator>) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_shortcuts(mut self, shortcuts: Box<dyn ShortcutProvider>) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn check_cancelled(&self) -> SkiffResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SkiffError::Cancelled);
        }
        Ok(())
    }

    fn read_package(
        package: &Path,
    ) -> SkiffResult<(PackageReader, ReleaseManifest, AppDescriptor)> {
        let mut reader = PackageReader::open(package)?;
        let manifest =
            ReleaseManifest::parse(&reader.read_entry_string(RELEASE_MANIFEST_ENTRY)?)?;
        let descriptor = reader.read_descriptor()?;
        Ok((reader, manifest, descriptor))
    }

    fn validate_host_os(manifest: &ReleaseManifest) -> SkiffResult<()> {
        let host = std::env::consts::OS;
        if manifest.os != host {
            return Err(SkiffError::Validation(format!(
                "Package {} {} targets '{}' but this host is '{}'",
                manifest.id, manifest.version, manifest.os, host
            )));
        }
        Ok(())
    }

    /// Copy the package artifact into the packages cache. Idempotent: an
    /// artifact with the same name is left alone.
    fn cache_package(package: &Path, cache: &Path) -> SkiffResult<PathBuf> {
        let file_name = package
            .file_name()
            .ok_or_else(|| SkiffError::Package("Invalid package path".to_string()))?;
        let dest = cache.join(file_name);
        if !dest.exists() {
            fs::copy(package, &dest)?;
        }
        Ok(dest)
    }

    /// Install a package into a root directory, replacing any existing
    /// installation there.
    pub async fn install(&self, package: &Path, root: &Path) -> SkiffResult<InstalledApp> {
        let (mut reader, manifest, descriptor) = Self::read_package(package)?;
        Self::validate_host_os(&manifest)?;
        if !manifest.is_full() {
            return Err(SkiffError::Validation(format!(
                "Cannot install delta package {} {}; a fresh install needs a full package",
                manifest.id, manifest.version
            )));
        }
        let version = manifest.version()?;
        self.check_cancelled()?;

        if root.exists() {
            let stopped = self.processes.terminate_under(root)?;
            if stopped > 0 {
                info!("Terminated {} process(es) under {}", stopped, root.display());
            }
            // Best effort: a half-deleted tree is still safely overwritable.
            if let Err(e) = fs::remove_dir_all(root) {
                warn!("Could not fully remove {}: {}", root.display(), e);
            }
        }

        fs::create_dir_all(root)?;
        let cache = packages_cache_dir(root);
        fs::create_dir_all(&cache)?;
        let target_dir = version_dir(root, &version);
        fs::create_dir_all(&target_dir)?;
        self.check_cancelled()?;

        Self::cache_package(package, &cache)?;

        let extracted = reader.extract_files(&target_dir)?;
        if extracted == 0 {
            // Created directories stay in place for diagnosis.
            return Err(SkiffError::Integrity(format!(
                "Package {} extracted zero entries",
                package.display()
            )));
        }
        info!(
            "Installed {} {} ({} files) into {}",
            manifest.id,
            version,
            extracted,
            target_dir.display()
        );

        let hook_results = self
            .post_install(&target_dir, &["install".to_string(), version.to_string()], true)
            .await;

        Ok(InstalledApp {
            id: descriptor.id,
            version,
            root: root.to_path_buf(),
            version_dir: target_dir,
            hook_results,
        })
    }

    /// Update an existing installation to the package's version. Only the
    /// target version directory is touched; sibling versions stay intact.
    pub async fn update(&self, package: &Path, root: &Path) -> SkiffResult<InstalledApp> {
        let (mut reader, manifest, descriptor) = Self::read_package(package)?;
        Self::validate_host_os(&manifest)?;
        let version = manifest.version()?;

        if !root.is_dir() {
            return Err(SkiffError::Validation(format!(
                "{} is not an installation root; install first",
                root.display()
            )));
        }
        self.check_cancelled()?;

        let previous = newest_installed_version(root, Some(&version))?;

        let target_dir = version_dir(root, &version);
        if target_dir.exists() {
            fs::remove_dir_all(&target_dir)?;
        }
        fs::create_dir_all(&target_dir)?;

        let cache = packages_cache_dir(root);
        fs::create_dir_all(&cache)?;
        Self::cache_package(package, &cache)?;
        self.check_cancelled()?;

        match manifest.kind {
            ReleaseKind::Full => {
                let extracted = reader.extract_files(&target_dir)?;
                if extracted == 0 {
                    return Err(SkiffError::Integrity(format!(
                        "Package {} extracted zero entries",
                        package.display()
                    )));
                }
            }
            ReleaseKind::Delta => {
                self.materialize_delta(&mut reader, &manifest, root, &target_dir)?;
            }
        }

        if let Some((_, previous_dir)) = &previous {
            self.restore_persistent_files(&descriptor, previous_dir, &target_dir)?;
        }

        info!(
            "Updated {} to {} in {}",
            manifest.id,
            version,
            target_dir.display()
        );

        let hook_results = self
            .post_install(&target_dir, &["updated".to_string(), version.to_string()], false)
            .await;

        Ok(InstalledApp {
            id: descriptor.id,
            version,
            root: root.to_path_buf(),
            version_dir: target_dir,
            hook_results,
        })
    }

    /// Build the new version tree from a delta: start from the installed
    /// base version, lay the changed files over it, then apply deletions.
    fn materialize_delta(
        &self,
        reader: &mut PackageReader,
        manifest: &ReleaseManifest,
        root: &Path,
        target_dir: &Path,
    ) -> SkiffResult<()> {
        let base_version = manifest.base_version()?.ok_or_else(|| {
            SkiffError::Integrity(format!(
                "Delta package {} {} references no base",
                manifest.id, manifest.version
            ))
        })?;
        let base_dir = version_dir(root, &base_version);
        if !base_dir.is_dir() {
            return Err(SkiffError::Integrity(format!(
                "Delta base {} is not installed under {}",
                base_version,
                root.display()
            )));
        }

        copy_dir_recursive(&base_dir, target_dir)?;
        reader.extract_files(target_dir)?;

        for deletion in &manifest.deletions {
            let path = target_dir.join(deletion);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) => warn!("Could not delete {}: {}", path.display(), e),
            }
        }

        Ok(())
    }

    /// Carry descriptor-listed persistent files over from the previous
    /// version directory.
    fn restore_persistent_files(
        &self,
        descriptor: &AppDescriptor,
        previous_dir: &Path,
        target_dir: &Path,
    ) -> SkiffResult<()> {
        for relative in &descriptor.persistent_files {
            let source = previous_dir.join(relative);
            if !source.is_file() {
                continue;
            }
            let dest = target_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &dest)?;
        }
        Ok(())
    }

    /// Shared post-install protocol: lifecycle hook, shortcuts, and (on
    /// fresh installs) the firstrun hook. Strictly serial.
    async fn post_install(
        &self,
        dir: &Path,
        lifecycle_args: &[String],
        firstrun: bool,
    ) -> Vec<(PathBuf, HookOutcome)> {
        let executables = hooks::find_aware_executables(dir);
        if executables.is_empty() {
            return Vec::new();
        }

        let mut results =
            hooks::run_hooks(&executables, lifecycle_args, self.hook_timeout, &self.cancel).await;

        for executable in &executables {
            if let Err(e) = self.shortcuts.create_shortcut(executable) {
                warn!("Shortcut for {} failed: {}", executable.display(), e);
            }
        }

        if firstrun {
            let firstrun_results = hooks::run_hooks(
                &executables,
                &["firstrun".to_string()],
                self.hook_timeout,
                &self.cancel,
            )
            .await;
            results.extend(firstrun_results);
        }

        results
    }
}

/// The newest `app-<version>` directory under a root, optionally excluding
/// one version.
fn newest_installed_version(
    root: &Path,
    exclude: Option<&Version>,
) -> SkiffResult<Option<(Version, PathBuf)>> {
    let mut versions: Vec<(Version, PathBuf)> = Vec::new();
    for entry in fs::read_dir(root)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(version_part) = name.strip_prefix("app-") else {
            continue;
        };
        let Ok(version) = Version::parse(version_part) else {
            continue;
        };
        if exclude.map(|v| v == &version).unwrap_or(false) {
            continue;
        }
        versions.push((version, path));
    }
    versions.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(versions.pop())
}

/// Recursive directory copy, preserving unix permissions via fs::copy.
fn copy_dir_recursive(source: &Path, dest: &Path) -> SkiffResult<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
