//! Benchmarks for developability operations.

use criterion::{criterion_group, criterion_main, Criterion};
use crease::algo::develop::{
    total_energy, total_energy_gradient, EnergyPolicy, FaceGeometry, VertexStars,
};
use crease::mesh::{shapes, VertexId};
use crease::prelude::*;
use nalgebra::Point3;

fn bench_energy(c: &mut Criterion) {
    let mesh: HalfEdgeMesh = shapes::bumpy_sheet(40, 0.2).unwrap();
    let stars = VertexStars::from_mesh(&mesh);
    let geometry = FaceGeometry::from_mesh(&mesh);

    c.bench_function("face_stars_40x40", |b| {
        b.iter(|| VertexStars::from_mesh(&mesh))
    });

    for (name, policy) in [("max", EnergyPolicy::Max), ("average", EnergyPolicy::Average)] {
        c.bench_function(&format!("energy_{}_40x40", name), |b| {
            b.iter(|| total_energy(&mesh, &stars, &geometry, policy))
        });

        c.bench_function(&format!("gradient_{}_40x40", name), |b| {
            let mut grad = Vec::new();
            b.iter(|| total_energy_gradient(&mesh, &stars, &geometry, policy, &mut grad))
        });
    }
}

fn bench_optimizer(c: &mut Criterion) {
    let base: HalfEdgeMesh = shapes::bumpy_sheet(20, 0.2).unwrap();

    c.bench_function("fixed_step_20x20", |b| {
        let options = DevelopOptions::default().with_method(OptMethod::FixedStep);
        b.iter_batched(
            || base.clone(),
            |mut mesh| {
                let mut optimizer = Optimizer::new(&mut mesh, &options);
                optimizer.step()
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("backtracking_step_20x20", |b| {
        let options = DevelopOptions::default();
        b.iter_batched(
            || base.clone(),
            |mut mesh| {
                let mut optimizer = Optimizer::new(&mut mesh, &options);
                optimizer.step()
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_remesh(c: &mut Criterion) {
    let mut base: HalfEdgeMesh = shapes::grid(30, 30.0).unwrap();
    // Squash one column of vertices toward its neighbor to create needles.
    for j in 1..30 {
        let v = VertexId::new(j * 31 + 15);
        let p = *base.position(v);
        base.set_position(v, Point3::new(p.x + 0.97, p.y, p.z));
    }
    let options = RemeshOptions::default().with_angle_threshold(10.0);

    c.bench_function("remove_small_angles_30x30", |b| {
        b.iter_batched(
            || base.clone(),
            |mut mesh| remove_small_angles(&mut mesh, &options),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_energy, bench_optimizer, bench_remesh);
criterion_main!(benches);
