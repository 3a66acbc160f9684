//! Package container format.
//!
//! A skiff package is a zip archive with a fixed internal layout:
//! the application descriptor at `skiff.yaml`, the generated release
//! manifest at `release.yaml`, rendered release info at `release-info.yaml`,
//! application content under `files/`, and (full packages only) the native
//! launcher blob under `runner/`.

use skiff_core::{AppDescriptor, SkiffError, SkiffResult, DESCRIPTOR_FILE};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry name of the generated release manifest
pub const RELEASE_MANIFEST_ENTRY: &str = "release.yaml";
/// Entry name of the rendered release info document
pub const RELEASE_INFO_ENTRY: &str = "release-info.yaml";
/// Prefix for application content entries
pub const FILES_PREFIX: &str = "files/";
/// Prefix for the native launcher blob
pub const RUNNER_PREFIX: &str = "runner/";

/// Writes a package archive. Entries are added once; the archive is
/// immutable after `finish`.
pub struct PackageWriter {
    writer: ZipWriter<File>,
    path: PathBuf,
}

impl PackageWriter {
    pub fn create(path: &Path) -> SkiffResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: ZipWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    fn options() -> FileOptions {
        FileOptions::default().compression_method(CompressionMethod::Deflated)
    }

    /// Embed the serialized application descriptor at its well-known name.
    pub fn add_descriptor(&mut self, yaml: &str) -> SkiffResult<()> {
        self.add_text(DESCRIPTOR_FILE, yaml)
    }

    /// Embed the generated release manifest.
    pub fn add_release_manifest(&mut self, yaml: &str) -> SkiffResult<()> {
        self.add_text(RELEASE_MANIFEST_ENTRY, yaml)
    }

    /// Embed the rendered release info document.
    pub fn add_release_info(&mut self, yaml: &str) -> SkiffResult<()> {
        self.add_text(RELEASE_INFO_ENTRY, yaml)
    }

    fn add_text(&mut self, name: &str, content: &str) -> SkiffResult<()> {
        self.writer.start_file(name, Self::options())?;
        self.writer.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Add one application file under `files/<relative path>`, streaming
    /// from disk and preserving unix permissions.
    pub fn add_content_file(&mut self, relative_path: &str, source: &Path) -> SkiffResult<()> {
        let options;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(source)?.permissions().mode();
            options = Self::options().unix_permissions(mode);
        }
        #[cfg(not(unix))]
        {
            options = Self::options();
        }

        let entry_name = format!("{}{}", FILES_PREFIX, relative_path);
        self.writer.start_file(entry_name, options)?;
        let mut file = File::open(source)?;
        io::copy(&mut file, &mut self.writer)?;
        Ok(())
    }

    /// Copy a raw entry (name and bytes) from another open package.
    pub fn add_raw_entry(&mut self, name: &str, bytes: &[u8]) -> SkiffResult<()> {
        self.writer.start_file(name, Self::options())?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Embed the opaque native launcher blob.
    pub fn add_runner(&mut self, filename: &str, bytes: &[u8]) -> SkiffResult<()> {
        let options;
        #[cfg(unix)]
        {
            options = Self::options().unix_permissions(0o755);
        }
        #[cfg(not(unix))]
        {
            options = Self::options();
        }
        self.writer
            .start_file(format!("{}{}", RUNNER_PREFIX, filename), options)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub fn finish(mut self) -> SkiffResult<PathBuf> {
        self.writer.finish()?;
        Ok(self.path)
    }
}

/// Reads a package archive.
#[derive(Debug)]
pub struct PackageReader {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl PackageReader {
    pub fn open(path: &Path) -> SkiffResult<Self> {
        let file = File::open(path).map_err(|e| {
            SkiffError::Package(format!("Cannot open package {}: {}", path.display(), e))
        })?;
        let archive = ZipArchive::new(file).map_err(|e| {
            SkiffError::Integrity(format!("Unreadable package {}: {}", path.display(), e))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a named entry as a UTF-8 string.
    pub fn read_entry_string(&mut self, name: &str) -> SkiffResult<String> {
        let mut entry = self.archive.by_name(name).map_err(|_| {
            SkiffError::Integrity(format!(
                "Package {} has no '{}' entry",
                self.path.display(),
                name
            ))
        })?;
        let mut content = String::new();
        entry.read_to_string(&mut content).map_err(|e| {
            SkiffError::Integrity(format!(
                "Cannot read '{}' from {}: {}",
                name,
                self.path.display(),
                e
            ))
        })?;
        Ok(content)
    }

    /// Read a named entry as raw bytes.
    pub fn read_entry_bytes(&mut self, name: &str) -> SkiffResult<Vec<u8>> {
        let mut entry = self.archive.by_name(name).map_err(|_| {
            SkiffError::Integrity(format!(
                "Package {} has no '{}' entry",
                self.path.display(),
                name
            ))
        })?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// The embedded application descriptor.
    pub fn read_descriptor(&mut self) -> SkiffResult<AppDescriptor> {
        let content = self.read_entry_string(DESCRIPTOR_FILE)?;
        AppDescriptor::parse(&content)
            .map_err(|e| SkiffError::Integrity(format!("Unreadable package descriptor: {}", e)))
    }

    /// Names of all application content entries, with the `files/` prefix
    /// stripped.
    pub fn content_entry_names(&mut self) -> SkiffResult<Vec<String>> {
        let mut names = Vec::new();
        for index in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(index)?;
            if let Some(rest) = entry.name().strip_prefix(FILES_PREFIX) {
                if !rest.is_empty() && !entry.is_dir() {
                    names.push(rest.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Extract all `files/` entries into a destination directory.
    /// Returns the number of entries written.
    pub fn extract_files(&mut self, dest: &Path) -> SkiffResult<usize> {
        let mut extracted = 0;
        for index in 0..self.archive.len() {
            let mut entry = self.archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }

            let Some(enclosed) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
                return Err(SkiffError::Integrity(format!(
                    "Package {} contains an unsafe entry path: {}",
                    self.path.display(),
                    entry.name()
                )));
            };
            let Ok(relative) = enclosed.strip_prefix(FILES_PREFIX) else {
                continue;
            };

            let target = dest.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
            }

            extracted += 1;
        }
        Ok(extracted)
    }

    /// The launcher blob entry, if present: `(filename, bytes)`.
    pub fn runner_entry(&mut self) -> SkiffResult<Option<(String, Vec<u8>)>> {
        let mut runner_name: Option<String> = None;
        for index in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(index)?;
            if let Some(rest) = entry.name().strip_prefix(RUNNER_PREFIX) {
                if !rest.is_empty() && !entry.is_dir() {
                    runner_name = Some(entry.name().to_string());
                }
            }
        }
        match runner_name {
            Some(name) => {
                let bytes = self.read_entry_bytes(&name)?;
                let filename = name
                    .strip_prefix(RUNNER_PREFIX)
                    .unwrap_or(name.as_str())
                    .to_string();
                Ok(Some((filename, bytes)))
            }
            None => Ok(None),
        }
    }
}
