//! Criterion benchmarks for radius search and farthest-point sampling.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use edf_core::spatial::{farthest_point_sampling, radius_graph, radius_search, RadiusQuery, SamplingStart};
use edf_core::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform points in the unit cube, split into `batches` equal clouds
fn make_cloud(n: usize, batches: usize, seed: u64) -> (Vec<Point3>, Vec<i64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = (0..n)
        .map(|_| Point3::new(rng.gen(), rng.gen(), rng.gen()))
        .collect();
    let per_batch = n.div_ceil(batches);
    let batch = (0..n).map(|i| (i / per_batch) as i64).collect();
    (points, batch)
}

fn bench_radius_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("radius_graph");

    for size in [1_000, 10_000, 50_000] {
        let (points, batch) = make_cloud(size, 4, 1);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("r=0.05", size), &size, |b, _| {
            b.iter(|| black_box(radius_graph(black_box(&points), &batch, 0.05, 1000).unwrap()))
        });
    }

    group.finish();
}

fn bench_radius_connect(c: &mut Criterion) {
    let (src, src_batch) = make_cloud(20_000, 2, 2);
    let (dst, dst_batch) = make_cloud(2_000, 2, 3);
    let query = RadiusQuery::new(0.1).with_max_neighbors(64);

    c.bench_function("radius_connect_20k_to_2k", |b| {
        b.iter(|| black_box(radius_search(&src, &src_batch, black_box(&dst), &dst_batch, &query).unwrap()))
    });

    let ring = query.with_min_distance(Some(0.05));
    c.bench_function("radius_connect_ring_20k_to_2k", |b| {
        b.iter(|| black_box(radius_search(&src, &src_batch, black_box(&dst), &dst_batch, &ring).unwrap()))
    });
}

fn bench_fps(c: &mut Criterion) {
    let mut group = c.benchmark_group("fps");

    for size in [1_000, 5_000, 20_000] {
        let (points, batch) = make_cloud(size, 2, 4);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("ratio=0.25", size), &size, |b, _| {
            b.iter(|| {
                black_box(farthest_point_sampling(black_box(&points), &batch, 0.25, SamplingStart::First).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_radius_graph, bench_radius_connect, bench_fps);
criterion_main!(benches);
