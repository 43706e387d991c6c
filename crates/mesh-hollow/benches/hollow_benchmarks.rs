//! Benchmarks for voxel hollowing.
//!
//! Run with: cargo bench -p mesh-hollow

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mesh_core::primitives::block;
use mesh_hollow::voxel::{fill_exterior, shell_mask, squared_distance_to_exterior};
use mesh_hollow::{HollowingConfig, hollow};

fn bench_hollow(c: &mut Criterion) {
    let mut group = c.benchmark_group("hollow");
    group.sample_size(10);
    let mesh = block(400.0, 100.0, 100.0);

    for resolution in [64usize, 128, 192] {
        let config = HollowingConfig {
            wall_thickness: 10.0,
            resolution: Some(resolution),
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::new("block_400", resolution),
            &config,
            |b, config| b.iter(|| hollow(black_box(&mesh), config).unwrap()),
        );
    }

    group.finish();
}

fn bench_morphology(c: &mut Criterion) {
    let n = 96;
    let dims = [n, n, n];
    let mut occupied = vec![false; n * n * n];
    for z in 2..n - 2 {
        for y in 2..n - 2 {
            for x in 2..n - 2 {
                occupied[x + y * n + z * n * n] = true;
            }
        }
    }

    c.bench_function("fill_exterior_96", |b| {
        b.iter(|| fill_exterior(black_box(&occupied), dims))
    });

    let filled = fill_exterior(&occupied, dims).filled;
    c.bench_function("distance_transform_96", |b| {
        b.iter(|| squared_distance_to_exterior(black_box(&filled), dims, [1.0, 1.0, 1.0]))
    });

    let distance = squared_distance_to_exterior(&filled, dims, [1.0, 1.0, 1.0]);
    c.bench_function("shell_mask_96", |b| {
        b.iter(|| shell_mask(black_box(&filled), &distance, 3.0))
    });
}

criterion_group!(benches, bench_hollow, bench_morphology);
criterion_main!(benches);
