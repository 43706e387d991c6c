//! Benchmarks for the boolean kernel.
//!
//! Run with: cargo bench -p mesh-core
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p mesh-core -- --save-baseline main
//! 2. After changes: cargo bench -p mesh-core -- --baseline main

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mesh_core::boolean::Solid;
use mesh_core::primitives::block;
use mesh_core::{Axis, Mesh, Side, inspect_solid};

/// A block with `n` studs on its top face, so cuts cross many faces.
fn create_studded_block(n: usize) -> Mesh {
    let mut mesh = block(400.0, 100.0, 100.0);
    for k in 0..n {
        let x = 400.0 * (k as f64 + 0.5) / n as f64;
        let stud = Solid::cylinder(Axis::Z, 100.0, [x, 50.0], 3.0, 10.0, Side::Above);
        mesh = mesh.union(&stud).unwrap();
    }
    mesh
}

fn bench_half_space(c: &mut Criterion) {
    let mut group = c.benchmark_group("half_space");

    for n in [1usize, 8, 32] {
        let mesh = create_studded_block(n);
        group.bench_with_input(BenchmarkId::new("split_x", n), &mesh, |b, mesh| {
            b.iter(|| {
                mesh.difference(black_box(&Solid::half_space(Axis::X, 200.0, Side::Above)))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_cylinder(c: &mut Criterion) {
    let mut group = c.benchmark_group("cylinder");
    let mesh = block(200.0, 80.0, 80.0).clip(Axis::X, 100.0, Side::Below).unwrap();

    for segments in [12usize, 24, 64] {
        let pin = Solid::Cylinder {
            axis: Axis::X,
            base: 100.0,
            center: [40.0, 40.0],
            radius: 2.5,
            length: 8.0,
            direction: Side::Above,
            segments,
        };
        group.bench_with_input(BenchmarkId::new("boss", segments), &pin, |b, pin| {
            b.iter(|| mesh.union(black_box(pin)).unwrap())
        });
    }

    group.finish();
}

fn bench_inspect(c: &mut Criterion) {
    let mesh = create_studded_block(32);
    c.bench_function("inspect_solid", |b| b.iter(|| inspect_solid(black_box(&mesh))));
}

criterion_group!(benches, bench_half_space, bench_cylinder, bench_inspect);
criterion_main!(benches);
