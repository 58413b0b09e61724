// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Point3, Vector3};
use solidkit::{
    boolean_operation, heal_model, make_box, BooleanOp, BooleanOptions, HealOptions,
    TopologyModel,
};

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    group.bench_function("box", |b| {
        b.iter(|| {
            let mut model = TopologyModel::new();
            make_box(
                &mut model,
                black_box(Point3::origin()),
                black_box(Vector3::new(10.0, 10.0, 10.0)),
            )
        });
    });

    group.finish();
}

fn bench_booleans(c: &mut Criterion) {
    let mut group = c.benchmark_group("booleans");

    for op in [BooleanOp::Union, BooleanOp::Subtract, BooleanOp::Intersect] {
        group.bench_function(op.to_string(), |b| {
            b.iter(|| {
                let mut model = TopologyModel::new();
                let a = make_box(&mut model, Point3::origin(), Vector3::new(4.0, 4.0, 4.0));
                let tool = make_box(
                    &mut model,
                    Point3::new(1.0, 1.0, 1.0),
                    Vector3::new(4.0, 4.0, 4.0),
                );
                boolean_operation(&mut model, a, tool, &BooleanOptions::new(black_box(op)))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_healing(c: &mut Criterion) {
    c.bench_function("heal_subtract_result", |b| {
        b.iter(|| {
            let mut model = TopologyModel::new();
            let block = make_box(&mut model, Point3::origin(), Vector3::new(4.0, 4.0, 4.0));
            let tool = make_box(
                &mut model,
                Point3::new(0.0, 0.0, 1.0),
                Vector3::new(2.0, 2.0, 2.0),
            );
            let result = boolean_operation(
                &mut model,
                block,
                tool,
                &BooleanOptions::new(BooleanOp::Subtract),
            )
            .unwrap();
            heal_model(&mut model, result.body, &HealOptions::default())
        });
    });
}

criterion_group!(benches, bench_primitives, bench_booleans, bench_healing);
criterion_main!(benches);
