//! Performance benchmarks for skiff

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skiff::checksum::digest_bytes;
use skiff::core::version::Version;
use skiff::release::{diff_releases, FileRecord};

fn benchmark_version_parsing(c: &mut Criterion) {
    c.bench_function("parse_version", |b| {
        b.iter(|| {
            Version::parse(black_box("1.2.3")).unwrap();
            Version::parse(black_box("2.0.0-rc1")).unwrap();
        })
    });
}

fn records(count: usize, changed_every: usize) -> Vec<FileRecord> {
    (0..count)
        .map(|i| FileRecord {
            path: format!("lib/module-{:04}.bin", i),
            size: 1024,
            checksum: if changed_every > 0 && i % changed_every == 0 {
                format!("sha512:changed-{}", i)
            } else {
                format!("sha512:stable-{}", i)
            },
        })
        .collect()
}

fn benchmark_release_diff(c: &mut Criterion) {
    let base = records(1000, 0);
    let new = records(1000, 10);

    c.bench_function("diff_1000_records", |b| {
        b.iter(|| {
            let diff = diff_releases(black_box(&base), black_box(&new));
            black_box(diff.modified.len());
        })
    });
}

fn benchmark_checksum(c: &mut Criterion) {
    let data = vec![0xA5u8; 1024 * 1024];

    c.bench_function("digest_1mib", |b| {
        b.iter(|| {
            digest_bytes(black_box(&data));
        })
    });
}

fn benchmark_manifest_serialization(c: &mut Criterion) {
    use skiff::release::{ReleaseKind, ReleaseManifest};

    let manifest = ReleaseManifest {
        id: "bench-app".to_string(),
        version: "1.0.0".to_string(),
        os: "linux".to_string(),
        kind: ReleaseKind::Full,
        base: None,
        generated_at: "2026-01-01T00:00:00Z".to_string(),
        files: records(100, 0),
        deletions: Vec::new(),
    };

    c.bench_function("release_manifest_to_yaml", |b| {
        b.iter(|| {
            manifest.to_yaml().unwrap();
        })
    });
}

criterion_group!(
    benches,
    benchmark_version_parsing,
    benchmark_release_diff,
    benchmark_checksum,
    benchmark_manifest_serialization
);
criterion_main!(benches);
