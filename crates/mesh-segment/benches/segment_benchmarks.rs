//! Benchmarks for segmentation and joint placement.
//!
//! Run with: cargo bench -p mesh-segment

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mesh_core::primitives::cuboid;
use mesh_segment::{JointType, SegmentationConfig, segment_mesh};

fn bench_cuts(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment");
    let mesh = cuboid([0.0; 3], [900.0, 700.0, 500.0]);

    for size in [400.0, 250.0, 150.0] {
        let config = SegmentationConfig::new(size, size, size).without_joints();
        group.bench_with_input(BenchmarkId::new("block_900", size as u32), &config, |b, config| {
            b.iter(|| segment_mesh(black_box(&mesh), config).unwrap())
        });
    }

    group.finish();
}

fn bench_joints(c: &mut Criterion) {
    let mut group = c.benchmark_group("joints");
    group.sample_size(20);
    let mesh = cuboid([0.0; 3], [600.0, 200.0, 200.0]);

    for joint_type in [JointType::Integrated, JointType::Dowel] {
        let config = SegmentationConfig::new(220.0, 220.0, 220.0).with_joints(joint_type);
        group.bench_with_input(
            BenchmarkId::new("block_600", format!("{:?}", joint_type)),
            &config,
            |b, config| b.iter(|| segment_mesh(black_box(&mesh), config).unwrap()),
        );
    }

    group.finish();
}

fn bench_hollow_then_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("hollow_then_segment");
    group.sample_size(10);
    let mesh = cuboid([0.0; 3], [400.0, 100.0, 100.0]);
    let config = SegmentationConfig::default()
        .with_hollowing(10.0)
        .with_resolution(64)
        .without_joints();

    group.bench_function("block_400", |b| {
        b.iter(|| segment_mesh(black_box(&mesh), &config).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_cuts, bench_joints, bench_hollow_then_segment);
criterion_main!(benches);
