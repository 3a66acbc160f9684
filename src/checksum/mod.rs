use sha2::{Digest, Sha512};
use skiff_core::{SkiffError, SkiffResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

/// Digest strings are prefixed with the algorithm so a manifest is
/// self-describing: `sha512:<hex>`.
pub const CHECKSUM_PREFIX: &str = "sha512:";

/// Digest a byte slice.
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data);
    format!("{}{}", CHECKSUM_PREFIX, hex::encode(hasher.finalize()))
}

/// Digest a file on disk, streaming.
pub fn digest_file(path: &Path) -> SkiffResult<String> {
    let file = File::open(path).map_err(|e| {
        SkiffError::ContentUnavailable(format!("Cannot open {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(|e| {
            SkiffError::ContentUnavailable(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{}{}", CHECKSUM_PREFIX, hex::encode(hasher.finalize())))
}

/// Digest the logical content of one entry inside an archive.
///
/// The archive is re-opened and its entries scanned by name on every call,
/// so the result does not depend on a previously cached central-directory
/// lookup. When the directory carries duplicate entries for the same name
/// (a corrupted or appended index), the last occurrence is authoritative
/// and is picked on every call, keeping repeated digests identical.
pub fn digest_entry(archive_path: &Path, entry_name: &str) -> SkiffResult<String> {
    let file = File::open(archive_path).map_err(|e| {
        SkiffError::ContentUnavailable(format!("Cannot open {}: {}", archive_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        SkiffError::ContentUnavailable(format!(
            "Cannot read archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    let mut found: Option<usize> = None;
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index).map_err(|e| {
            SkiffError::ContentUnavailable(format!(
                "Cannot scan archive {}: {}",
                archive_path.display(),
                e
            ))
        })?;
        if entry.name() == entry_name {
            found = Some(index);
        }
    }

    let index = found.ok_or_else(|| {
        SkiffError::ContentUnavailable(format!(
            "Entry '{}' not found in {}",
            entry_name,
            archive_path.display()
        ))
    })?;

    let mut entry = archive.by_index(index).map_err(|e| {
        SkiffError::ContentUnavailable(format!("Cannot locate entry '{}': {}", entry_name, e))
    })?;

    let mut hasher = Sha512::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = entry.read(&mut buf).map_err(|e| {
            SkiffError::ContentUnavailable(format!("Cannot read entry '{}': {}", entry_name, e))
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{}{}", CHECKSUM_PREFIX, hex::encode(hasher.finalize())))
}
