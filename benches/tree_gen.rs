//! Benchmarks for CPU-side scene generation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use glowtree::burst::generate_burst;
use glowtree::prelude::*;

fn bench_generate_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_tree");

    for count in [1000u32, 5000, 10_000] {
        let shape = TreeShape {
            particle_count: count,
            ..TreeShape::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(count), &shape, |b, shape| {
            let mut rng = SeededRandom::new(1);
            b.iter(|| black_box(generate_tree(shape, &mut rng)))
        });
    }

    group.finish();
}

fn bench_burst(c: &mut Criterion) {
    c.bench_function("generate_burst_200", |b| {
        let mut rng = SeededRandom::new(2);
        b.iter(|| black_box(generate_burst(200, Vec3::ONE, &mut rng)))
    });
}

fn bench_instances(c: &mut Criterion) {
    let tree = generate_tree(&TreeShape::default(), &mut SeededRandom::new(3));
    c.bench_function("interleave_5000", |b| {
        let mut out = Vec::with_capacity(tree.len());
        b.iter(|| {
            out.clear();
            tree.buffer.write_instances(&mut out);
            black_box(out.len())
        })
    });
}

fn bench_scene_frames(c: &mut Criterion) {
    c.bench_function("advance_600_frames", |b| {
        b.iter(|| {
            let mut graph = SceneNodes::new();
            let (_tx, loader) = EmblemLoader::channel("star.glb");
            let mut scene = Scene::new(
                SceneParams {
                    particle_count: 1000,
                    ..SceneParams::default()
                },
                Box::new(SeededRandom::new(4)),
                loader,
                &mut graph,
            )
            .unwrap();
            for _ in 0..600 {
                scene.advance(&mut graph);
            }
            black_box(scene.stars().len())
        })
    });
}

criterion_group!(benches, bench_generate_tree, bench_burst, bench_instances, bench_scene_frames);
criterion_main!(benches);
