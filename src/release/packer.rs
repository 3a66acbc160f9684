use crate::archive::{PackageReader, PackageWriter, FILES_PREFIX, RELEASE_INFO_ENTRY};
use crate::checksum;
use crate::release::progress::{NullProgress, ProgressReporter, ProgressSink};
use crate::release::{diff_releases, FileRecord, ReleaseKind, ReleaseManifest};
use crate::runner::LauncherBlob;
use skiff_core::{AppDescriptor, SkiffError, SkiffResult, DESCRIPTOR_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;

/// A package produced by the packer, staged on disk. Moving it into the
/// packages directory is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct BuiltPackage {
    pub manifest: ReleaseManifest,
    pub path: PathBuf,
}

/// Builds full and delta release packages for one application.
pub struct Packer {
    project_root: PathBuf,
    descriptor: AppDescriptor,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl Packer {
    pub fn new(project_root: &Path, descriptor: AppDescriptor) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            descriptor,
            progress: Arc::new(NullProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
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

    fn template_path(&self) -> PathBuf {
        self.project_root
            .join(&self.descriptor.target.metadata_template)
    }

    /// Render the release info template. Placeholders: `{{id}}`,
    /// `{{version}}`, `{{os}}`, `{{kind}}`, `{{base}}`.
    fn render_release_info(&self, kind: ReleaseKind, base: Option<&str>) -> SkiffResult<String> {
        let template = fs::read_to_string(self.template_path())?;
        Ok(template
            .replace("{{id}}", &self.descriptor.id)
            .replace("{{version}}", &self.descriptor.version)
            .replace("{{os}}", &self.descriptor.target.os)
            .replace("{{kind}}", &kind.to_string())
            .replace("{{base}}", base.unwrap_or("")))
    }

    fn validate_build_inputs(&self, artifacts_dir: &Path) -> SkiffResult<()> {
        self.descriptor.validate()?;

        if !artifacts_dir.is_dir() {
            return Err(SkiffError::Validation(format!(
                "Artifacts directory not found: {}",
                artifacts_dir.display()
            )));
        }

        let template = self.template_path();
        if !template.is_file() {
            return Err(SkiffError::Validation(format!(
                "Metadata template not found: {}",
                template.display()
            )));
        }

        Ok(())
    }

    /// Walk the artifacts tree and compute one content record per file.
    fn collect_records(&self, artifacts_dir: &Path) -> SkiffResult<Vec<FileRecord>> {
        let mut records = Vec::new();
        for entry in WalkDir::new(artifacts_dir).sort_by_file_name() {
            self.check_cancelled()?;
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(artifacts_dir)
                .map_err(|e| SkiffError::Path(e.to_string()))?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            records.push(FileRecord {
                path,
                size: entry.metadata()?.len(),
                checksum: checksum::digest_file(entry.path())?,
            });
        }
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    /// Build a full package from the artifacts tree.
    ///
    /// The artifact is written into `out_dir` (a staging area); the caller
    /// decides when it lands in the packages directory.
    pub async fn build_full(
        &self,
        artifacts_dir: &Path,
        launcher: &LauncherBlob,
        out_dir: &Path,
    ) -> SkiffResult<BuiltPackage> {
        let progress = ProgressReporter::new(self.progress.as_ref());
        progress.report(0);

        self.validate_build_inputs(artifacts_dir)?;
        self.check_cancelled()?;

        let records = self.collect_records(artifacts_dir)?;
        progress.report(25);
        debug!(
            "Collected {} content records for {} {}",
            records.len(),
            self.descriptor.id,
            self.descriptor.version
        );

        let manifest = ReleaseManifest {
            id: self.descriptor.id.clone(),
            version: self.descriptor.version.clone(),
            os: self.descriptor.target.os.clone(),
            kind: ReleaseKind::Full,
            base: None,
            generated_at: chrono::Utc::now().to_rfc3339(),
            files: records.clone(),
            deletions: Vec::new(),
        };
        manifest.validate()?;

        let path = out_dir.join(manifest.package_file_name());
        let mut writer = PackageWriter::create(&path)?;
        writer.add_descriptor(&self.descriptor.to_yaml()?)?;
        writer.add_release_manifest(&manifest.to_yaml()?)?;
        writer.add_release_info(&self.render_release_info(ReleaseKind::Full, None)?)?;

        for record in &records {
            self.check_cancelled()?;
            writer.add_content_file(&record.path, &artifacts_dir.join(&record.path))?;
        }
        progress.report(50);

        writer.add_runner(&launcher.filename, &launcher.bytes)?;
        progress.report(75);

        let path = writer.finish()?;
        progress.report(100);

        info!(
            "Built full package {} ({} files)",
            path.display(),
            manifest.files.len()
        );
        Ok(BuiltPackage { manifest, path })
    }

    /// Build a delta package by diffing two full packages.
    ///
    /// The base must be a full release of the same application with a
    /// strictly older version; anything else is an `InvalidDeltaBase`.
    pub async fn build_delta(
        &self,
        base_package: &Path,
        new_package: &Path,
        out_dir: &Path,
    ) -> SkiffResult<BuiltPackage> {
        let progress = ProgressReporter::new(self.progress.as_ref());
        progress.report(0);
        self.check_cancelled()?;

        let mut base = PackageReader::open(base_package).map_err(|e| {
            SkiffError::InvalidDeltaBase(format!(
                "Cannot open base package {}: {}",
                base_package.display(),
                e
            ))
        })?;
        let base_manifest = base
            .read_entry_string(crate::archive::RELEASE_MANIFEST_ENTRY)
            .and_then(|yaml| ReleaseManifest::parse(&yaml))
            .map_err(|e| SkiffError::InvalidDeltaBase(e.to_string()))?;

        let mut new = PackageReader::open(new_package)?;
        let new_manifest = ReleaseManifest::parse(
            &new.read_entry_string(crate::archive::RELEASE_MANIFEST_ENTRY)?,
        )?;
        progress.report(25);

        if !base_manifest.is_full() {
            return Err(SkiffError::InvalidDeltaBase(format!(
                "Base package {} is a delta; deltas must reference a full release",
                base_package.display()
            )));
        }
        if base_manifest.id != new_manifest.id {
            return Err(SkiffError::InvalidDeltaBase(format!(
                "Base package is for '{}', new package is for '{}'",
                base_manifest.id, new_manifest.id
            )));
        }
        let base_version = base_manifest
            .version()
            .map_err(|e| SkiffError::InvalidDeltaBase(e.to_string()))?;
        let new_version = new_manifest.version()?;
        if base_version >= new_version {
            return Err(SkiffError::InvalidDeltaBase(format!(
                "Base version {} is not strictly older than {}",
                base_version, new_version
            )));
        }

        let diff = diff_releases(&base_manifest.files, &new_manifest.files);
        progress.report(50);
        debug!(
            "Delta {} -> {}: {} added, {} modified, {} removed, {} unchanged",
            base_version,
            new_version,
            diff.added.len(),
            diff.modified.len(),
            diff.removed.len(),
            diff.unchanged
        );

        let manifest = ReleaseManifest {
            id: new_manifest.id.clone(),
            version: new_manifest.version.clone(),
            os: new_manifest.os.clone(),
            kind: ReleaseKind::Delta,
            base: Some(base_manifest.version.clone()),
            generated_at: chrono::Utc::now().to_rfc3339(),
            files: diff.content_records(),
            deletions: diff.removed.clone(),
        };
        manifest.validate()?;

        let path = out_dir.join(manifest.package_file_name());
        let mut writer = PackageWriter::create(&path)?;
        writer.add_raw_entry(
            DESCRIPTOR_FILE,
            new.read_entry_string(DESCRIPTOR_FILE)?.as_bytes(),
        )?;
        writer.add_release_manifest(&manifest.to_yaml()?)?;
        writer.add_raw_entry(
            RELEASE_INFO_ENTRY,
            self.render_release_info(ReleaseKind::Delta, Some(&base_manifest.version))?
                .as_bytes(),
        )?;

        // Changed content travels whole-file; unchanged files travel not at all.
        for record in &manifest.files {
            self.check_cancelled()?;
            let entry_name = format!("{}{}", FILES_PREFIX, record.path);
            let bytes = new.read_entry_bytes(&entry_name)?;
            writer.add_raw_entry(&entry_name, &bytes)?;
        }
        progress.report(75);

        let path = writer.finish()?;
        progress.report(100);

        info!(
            "Built delta package {} ({} entries, {} deletions)",
            path.display(),
            manifest.files.len(),
            manifest.deletions.len()
        );
        Ok(BuiltPackage { manifest, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_core::app::descriptor::{Channel, FeedSource, Target};
    use tempfile::TempDir;

    fn descriptor(version: &str) -> AppDescriptor {
        AppDescriptor {
            id: "demoapp".to_string(),
            version: version.to_string(),
            target: Target {
                os: "linux".to_string(),
                rid: "linux-x64".to_string(),
                framework: None,
                metadata_template: "release.template.yaml".to_string(),
            },
            channels: vec![Channel {
                name: "test".to_string(),
                push_feed: FeedSource {
                    url: "https://feed.example.com/push".to_string(),
                    api_key_name: None,
                },
                update_feed: FeedSource {
                    url: "https://feed.example.com/test".to_string(),
                    api_key_name: None,
                },
                default: true,
            }],
            persistent_files: Vec::new(),
        }
    }

    fn launcher() -> LauncherBlob {
        LauncherBlob {
            bytes: b"launcher".to_vec(),
            filename: "demoapp".to_string(),
            elevated: false,
        }
    }

    fn project(temp: &TempDir, files: &[(&str, &[u8])]) -> (PathBuf, PathBuf, PathBuf) {
        let root = temp.path().to_path_buf();
        fs::write(
            root.join("release.template.yaml"),
            "title: {{id}} {{version}}\nkind: {{kind}}\n",
        )
        .unwrap();

        let artifacts = root.join("artifacts");
        fs::create_dir_all(&artifacts).unwrap();
        for (path, content) in files {
            let full = artifacts.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }

        let out = root.join("staging");
        fs::create_dir_all(&out).unwrap();
        (root, artifacts, out)
    }

    async fn build_full_at(
        temp: &TempDir,
        version: &str,
        files: &[(&str, &[u8])],
    ) -> BuiltPackage {
        let (root, artifacts, out) = project(temp, files);
        let packer = Packer::new(&root, descriptor(version));
        packer
            .build_full(&artifacts, &launcher(), &out)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_full_records_every_file() {
        let temp = TempDir::new().unwrap();
        let built = build_full_at(
            &temp,
            "1.0.0",
            &[("bin/demo", b"exe"), ("lib/core.so", b"lib"), ("readme", b"hi")],
        )
        .await;

        assert!(built.manifest.is_full());
        assert_eq!(built.manifest.files.len(), 3);
        assert!(built.path.exists());
        assert_eq!(
            built.path.file_name().unwrap().to_str().unwrap(),
            "demoapp-1.0.0-full.skiff"
        );
    }

    #[tokio::test]
    async fn test_build_full_digests_are_reproducible() {
        let temp = TempDir::new().unwrap();
        let built = build_full_at(&temp, "1.0.0", &[("a.txt", b"alpha")]).await;

        let record = &built.manifest.files[0];
        let entry = format!("{}{}", FILES_PREFIX, record.path);
        let first = checksum::digest_entry(&built.path, &entry).unwrap();
        let second = checksum::digest_entry(&built.path, &entry).unwrap();
        assert_eq!(first, record.checksum);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_build_full_missing_artifacts_fails_fast() {
        let temp = TempDir::new().unwrap();
        let (root, _, out) = project(&temp, &[]);
        let packer = Packer::new(&root, descriptor("1.0.0"));
        let err = packer
            .build_full(&root.join("missing"), &launcher(), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, SkiffError::Validation(_)));
        // Nothing written
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_build_full_missing_template_fails_fast() {
        let temp = TempDir::new().unwrap();
        let (root, artifacts, out) = project(&temp, &[("a", b"x")]);
        fs::remove_file(root.join("release.template.yaml")).unwrap();

        let packer = Packer::new(&root, descriptor("1.0.0"));
        let err = packer
            .build_full(&artifacts, &launcher(), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, SkiffError::Validation(_)));
    }

    #[tokio::test]
    async fn test_build_delta_change_one_add_one() {
        let temp_base = TempDir::new().unwrap();
        let base = build_full_at(
            &temp_base,
            "1.0.0",
            &[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")],
        )
        .await;

        let temp_new = TempDir::new().unwrap();
        let new = build_full_at(
            &temp_new,
            "1.0.1",
            &[
                ("a.txt", b"a"),
                ("b.txt", b"b CHANGED"),
                ("c.txt", b"c"),
                ("d.txt", b"d NEW"),
            ],
        )
        .await;

        let out = TempDir::new().unwrap();
        let packer = Packer::new(temp_new.path(), descriptor("1.0.1"));
        let delta = packer
            .build_delta(&base.path, &new.path, out.path())
            .await
            .unwrap();

        assert_eq!(delta.manifest.kind, ReleaseKind::Delta);
        assert_eq!(delta.manifest.base.as_deref(), Some("1.0.0"));
        assert_eq!(delta.manifest.files.len(), 2);
        assert!(delta.manifest.deletions.is_empty());

        // Only the changed content is present in the archive.
        let mut reader = PackageReader::open(&delta.path).unwrap();
        let mut names = reader.content_entry_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["b.txt", "d.txt"]);
    }

    #[tokio::test]
    async fn test_build_delta_identical_sets_is_empty() {
        let files: &[(&str, &[u8])] = &[("a.txt", b"a"), ("b.txt", b"b")];
        let temp_base = TempDir::new().unwrap();
        let base = build_full_at(&temp_base, "1.0.0", files).await;
        let temp_new = TempDir::new().unwrap();
        let new = build_full_at(&temp_new, "1.0.1", files).await;

        let out = TempDir::new().unwrap();
        let packer = Packer::new(temp_new.path(), descriptor("1.0.1"));
        let delta = packer
            .build_delta(&base.path, &new.path, out.path())
            .await
            .unwrap();

        assert!(delta.manifest.files.is_empty());
        assert!(delta.manifest.deletions.is_empty());
    }

    #[tokio::test]
    async fn test_build_delta_records_deletions() {
        let temp_base = TempDir::new().unwrap();
        let base = build_full_at(&temp_base, "1.0.0", &[("a.txt", b"a"), ("gone.txt", b"x")]).await;
        let temp_new = TempDir::new().unwrap();
        let new = build_full_at(&temp_new, "1.0.1", &[("a.txt", b"a")]).await;

        let out = TempDir::new().unwrap();
        let packer = Packer::new(temp_new.path(), descriptor("1.0.1"));
        let delta = packer
            .build_delta(&base.path, &new.path, out.path())
            .await
            .unwrap();

        assert_eq!(delta.manifest.deletions, vec!["gone.txt".to_string()]);
        assert!(delta.manifest.files.is_empty());
    }

    #[tokio::test]
    async fn test_build_delta_backward_version_rejected() {
        let temp_base = TempDir::new().unwrap();
        let base = build_full_at(&temp_base, "1.0.1", &[("a.txt", b"a")]).await;
        let temp_new = TempDir::new().unwrap();
        let new = build_full_at(&temp_new, "1.0.0", &[("a.txt", b"a")]).await;

        let out = TempDir::new().unwrap();
        let packer = Packer::new(temp_new.path(), descriptor("1.0.0"));
        let err = packer
            .build_delta(&base.path, &new.path, out.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SkiffError::InvalidDeltaBase(_)));
    }

    #[tokio::test]
    async fn test_build_delta_same_version_rejected() {
        let files: &[(&str, &[u8])] = &[("a.txt", b"a")];
        let temp_base = TempDir::new().unwrap();
        let base = build_full_at(&temp_base, "1.0.0", files).await;
        let temp_new = TempDir::new().unwrap();
        let new = build_full_at(&temp_new, "1.0.0", files).await;

        let out = TempDir::new().unwrap();
        let packer = Packer::new(temp_new.path(), descriptor("1.0.0"));
        let err = packer
            .build_delta(&base.path, &new.path, out.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SkiffError::InvalidDeltaBase(_)));
    }

    #[tokio::test]
    async fn test_build_delta_unreadable_base() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.skiff");
        fs::write(&bogus, b"not an archive").unwrap();

        let new = build_full_at(&temp, "1.0.1", &[("a.txt", b"a")]).await;
        let out = TempDir::new().unwrap();
        let packer = Packer::new(temp.path(), descriptor("1.0.1"));
        let err = packer
            .build_delta(&bogus, &new.path, out.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SkiffError::InvalidDeltaBase(_)));
    }

    #[tokio::test]
    async fn test_cancelled_build_stops() {
        let temp = TempDir::new().unwrap();
        let (root, artifacts, out) = project(&temp, &[("a", b"x")]);
        let token = CancellationToken::new();
        token.cancel();

        let packer = Packer::new(&root, descriptor("1.0.0")).with_cancellation(token);
        let err = packer
            .build_full(&artifacts, &launcher(), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, SkiffError::Cancelled));
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_reaches_100() {
        use std::sync::Mutex;
        struct Recorder(Mutex<Vec<u8>>);
        impl ProgressSink for Recorder {
            fn report(&self, percent: u8) {
                self.0.lock().unwrap().push(percent);
            }
        }

        let temp = TempDir::new().unwrap();
        let (root, artifacts, out) = project(&temp, &[("a", b"x")]);
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let packer =
            Packer::new(&root, descriptor("1.0.0")).with_progress(recorder.clone());
        packer
            .build_full(&artifacts, &launcher(), &out)
            .await
            .unwrap();

        let seen = recorder.0.lock().unwrap().clone();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(100));
    }
}
