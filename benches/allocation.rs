use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ntfs_cluster_alloc::{ClusterAllocator, ClusterRange, MemoryBitmap};

fn allocator(total: u64) -> ClusterAllocator<MemoryBitmap> {
    ClusterAllocator::new(MemoryBitmap::new(total), total).unwrap()
}

/// Benchmark allocating 100K clusters
fn bench_allocate_100k(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_100k_clusters");

    group.bench_function("data", |b| {
        b.iter(|| {
            let mut alloc = allocator(120_000);
            // Allocate in chunks of 10 clusters
            for _ in 0..10_000 {
                alloc.allocate(10, None, false, 10).unwrap();
            }
        });
    });

    group.bench_function("metadata", |b| {
        b.iter(|| {
            let mut alloc = allocator(120_000);
            for _ in 0..10_000 {
                alloc.allocate(10, None, true, 0).unwrap();
            }
        });
    });

    group.bench_function("extend_hint", |b| {
        b.iter(|| {
            let mut alloc = allocator(120_000);
            let mut hint = None;
            for _ in 0..10_000 {
                let runs = alloc.allocate(10, hint, false, 10).unwrap();
                hint = runs.last().map(ClusterRange::end);
            }
        });
    });

    group.finish();
}

/// Benchmark allocation + free cycles (fragmentation test)
fn bench_alloc_free_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_cycle");

    group.bench_function("data", |b| {
        b.iter(|| {
            let mut alloc = allocator(10_000);
            let mut allocations = Vec::new();

            for _ in 0..100 {
                allocations.push(alloc.allocate(10, None, false, 10).unwrap());
            }

            // Free every other allocation
            for (i, runs) in allocations.iter().enumerate() {
                if i % 2 == 0 {
                    alloc.free(runs).unwrap();
                }
            }

            // Re-allocate into the holes
            for _ in 0..50 {
                alloc.allocate(10, None, false, 10).unwrap();
            }

            black_box(&alloc);
        });
    });

    group.finish();
}

/// Benchmark the degrade path once the upper zone is full
fn bench_zone_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("zone_fallback");

    for total in [8_192u64, 65_536, 524_288] {
        group.bench_with_input(BenchmarkId::new("full_upper_zone", total), &total, |b, &total| {
            let mut alloc = allocator(total);
            alloc
                .mark_allocated(ClusterRange::new(total / 8, total - total / 8).unwrap())
                .unwrap();

            b.iter(|| {
                let runs = alloc.allocate(4, None, false, 4).unwrap();
                alloc.free(&runs).unwrap();
                black_box(runs);
            });
        });
    }

    group.finish();
}

/// Benchmark free-space accounting
fn bench_free_space_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_space_map");

    let mut alloc = allocator(100_000);
    for i in 0..1000 {
        let runs = alloc.allocate(10, None, false, 10).unwrap();
        if i % 2 == 0 {
            alloc.free(&runs).unwrap();
        }
    }

    group.bench_function("free_clusters", |b| {
        b.iter(|| black_box(alloc.free_clusters()));
    });

    group.bench_function("free_runs", |b| {
        b.iter(|| black_box(alloc.free_runs()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_allocate_100k,
    bench_alloc_free_cycle,
    bench_zone_fallback,
    bench_free_space_map
);
criterion_main!(benches);
