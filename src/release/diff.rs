use crate::release::FileRecord;
use std::collections::{HashMap, HashSet};

/// Result of diffing two release file sets. Paths join the sets, checksums
/// decide equality. The new set is authoritative.
#[derive(Debug, Clone, Default)]
pub struct ReleaseDiff {
    /// Present in new only: shipped with full content
    pub added: Vec<FileRecord>,
    /// Present in both with differing checksums: shipped with full content
    pub modified: Vec<FileRecord>,
    /// Present in base only: recorded as deletion markers
    pub removed: Vec<String>,
    /// Present in both with equal checksums: not shipped
    pub unchanged: usize,
}

impl ReleaseDiff {
    /// Records that go into the delta package, added then modified,
    /// each sorted by path for deterministic output.
    pub fn content_records(&self) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> = self
            .added
            .iter()
            .chain(self.modified.iter())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Three-way file-set diff between a base release and a new release.
///
/// A path that differs from a base path only by case is treated as
/// modified rather than added, and the base-side casing is not reported
/// as removed: both names address the same file on case-insensitive
/// filesystems, so replacement is the only safe interpretation.
pub fn diff_releases(base: &[FileRecord], new: &[FileRecord]) -> ReleaseDiff {
    let base_by_path: HashMap<&str, &FileRecord> =
        base.iter().map(|r| (r.path.as_str(), r)).collect();
    let mut base_by_folded: HashMap<String, &str> = HashMap::new();
    for record in base {
        base_by_folded
            .entry(record.path.to_lowercase())
            .or_insert(record.path.as_str());
    }

    let mut diff = ReleaseDiff::default();
    let mut consumed_base: HashSet<&str> = HashSet::new();

    for record in new {
        if let Some(base_record) = base_by_path.get(record.path.as_str()) {
            consumed_base.insert(base_record.path.as_str());
            if base_record.checksum == record.checksum {
                diff.unchanged += 1;
            } else {
                diff.modified.push(record.clone());
            }
        } else if let Some(base_path) = base_by_folded.get(&record.path.to_lowercase()) {
            consumed_base.insert(base_path);
            diff.modified.push(record.clone());
        } else {
            diff.added.push(record.clone());
        }
    }

    for record in base {
        if !consumed_base.contains(record.path.as_str()) {
            diff.removed.push(record.path.clone());
        }
    }

    diff.added.sort_by(|a, b| a.path.cmp(&b.path));
    diff.modified.sort_by(|a, b| a.path.cmp(&b.path));
    diff.removed.sort();

    diff
}
