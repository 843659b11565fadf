//! Field resolution benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recsync_bench::{bench_field_map, populated_master};
use recsync_core::{FieldMap, FieldMapSpec};
use recsync_storage::RecordStore;

/// Benchmark normalizing field map shapes.
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    group.bench_function("shared_5", |b| {
        b.iter(|| {
            let spec = FieldMapSpec::shared(["id", "name", "foo", "bar", "baz"]);
            black_box(FieldMap::normalize(black_box(spec)).unwrap());
        });
    });

    group.bench_function("mapped_with_derived", |b| {
        b.iter(|| {
            black_box(FieldMap::normalize(bench_field_map()).unwrap());
        });
    });

    group.finish();
}

/// Benchmark resolving a field map against a master record.
fn bench_resolve(c: &mut Criterion) {
    let master = populated_master(1);
    let record = master.iterate_all().unwrap().remove(0);
    let map = FieldMap::normalize(bench_field_map()).unwrap();

    c.bench_function("resolve", |b| {
        b.iter(|| {
            black_box(map.resolve(black_box(&record)).unwrap());
        });
    });
}

criterion_group!(benches, bench_normalize, bench_resolve);
criterion_main!(benches);
