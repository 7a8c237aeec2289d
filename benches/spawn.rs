use std::hint::black_box;

use criterion::*;
use riptide_ecs::Registry;

mod common;
use common::{Position, Velocity, ENTITIES_MED};

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    group.bench_function("spawn_100k_entities", |b| {
        b.iter(|| {
            let registry = Registry::new();
            for _ in 0..ENTITIES_MED {
                let entity = registry.spawn_entity().expect("spawn failed in benchmark");
                black_box(entity);
            }
            black_box(registry);
        });
    });

    group.bench_function("spawn_100k_with_two_components", |b| {
        b.iter(|| {
            let registry = Registry::new();
            for i in 0..ENTITIES_MED {
                let entity = registry.spawn_entity().expect("spawn failed in benchmark");
                registry
                    .emplace_component(entity, Position { x: i as f32, y: 0.0 })
                    .expect("emplace failed in benchmark");
                registry
                    .emplace_component(entity, Velocity { dx: 1.0, dy: 1.0 })
                    .expect("emplace failed in benchmark");
            }
            black_box(registry);
        });
    });

    group.bench_function("spawn_kill_respawn_100k", |b| {
        b.iter_batched(
            || {
                let registry = Registry::new();
                let entities: Vec<_> = (0..ENTITIES_MED)
                    .map(|_| registry.spawn_entity().expect("spawn failed in benchmark"))
                    .collect();
                (registry, entities)
            },
            |(registry, entities)| {
                for entity in entities {
                    registry.kill_entity(entity);
                }
                // Respawns exercise the free-list recycle path.
                for _ in 0..ENTITIES_MED {
                    black_box(registry.spawn_entity().expect("spawn failed in benchmark"));
                }
                black_box(registry);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
