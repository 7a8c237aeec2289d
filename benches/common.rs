#![allow(dead_code)]

use riptide_ecs::{Entity, Registry};

pub const ENTITIES_SMALL: usize = 10_000;
pub const ENTITIES_MED: usize = 100_000;
pub const ENTITIES_LARGE: usize = 1_000_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy)]
pub struct Mass {
    pub value: f32,
}

pub fn populate(entity_count: usize) -> Registry {
    let registry = Registry::new();
    for i in 0..entity_count {
        let entity = registry.spawn_entity().expect("spawn failed in benchmark setup");
        registry
            .emplace_component(entity, Position { x: i as f32, y: 0.0 })
            .expect("emplace failed in benchmark setup");
        registry
            .emplace_component(entity, Velocity { dx: 1.0, dy: 1.0 })
            .expect("emplace failed in benchmark setup");
    }
    registry
}

pub fn spawn_one(registry: &Registry) -> Entity {
    registry.spawn_entity().expect("spawn failed in benchmark")
}
