mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{init, Health, Position, Velocity};
use riptide_ecs::{EcsError, Registry};

#[test]
fn emplace_then_get_round_trips() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Position { x: 1.5, y: -2.0 })
        .unwrap();

    let position: Position = registry.get_component(entity).unwrap();
    assert_eq!(position, Position { x: 1.5, y: -2.0 });
}

#[test]
fn duplicate_emplace_is_an_error() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Position { x: 0.0, y: 0.0 })
        .unwrap();

    let result = registry.emplace_component(entity, Position { x: 9.0, y: 9.0 });
    assert!(matches!(result, Err(EcsError::DuplicateComponent { .. })));

    // The original value survives the rejected insert.
    let position: Position = registry.get_component(entity).unwrap();
    assert_eq!(position.x, 0.0);
}

#[test]
fn emplace_on_dead_entity_is_an_error() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    registry.kill_entity(entity);

    let result = registry.emplace_component(entity, Position { x: 0.0, y: 0.0 });
    assert!(matches!(result, Err(EcsError::DeadEntity(_))));
}

#[test]
fn remove_returns_the_value() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Health { current: 40, max: 100 })
        .unwrap();

    let health = registry.remove_component::<Health>(entity).unwrap();
    assert_eq!(health.current, 40);
    assert!(!registry.has_component::<Health>(entity));
}

#[test]
fn removing_an_absent_component_is_an_error() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    let result = registry.remove_component::<Health>(entity);
    assert!(matches!(result, Err(EcsError::MissingComponent { .. })));
}

#[test]
fn get_or_emplace_inserts_once() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    let first = registry
        .get_or_emplace(entity, Health { current: 100, max: 100 })
        .unwrap();
    assert_eq!(first.current, 100);

    // The second call returns the stored value, not the fallback.
    registry.patch::<Health, _>(entity, |h| h.current = 5).unwrap();
    let second = registry
        .get_or_emplace(entity, Health { current: 100, max: 100 })
        .unwrap();
    assert_eq!(second.current, 5);
}

#[test]
fn patch_mutates_in_place() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Position { x: 1.0, y: 1.0 })
        .unwrap();

    let prior_x = registry
        .patch::<Position, _>(entity, |p| {
            let prior = p.x;
            p.x += 10.0;
            prior
        })
        .unwrap();

    assert_eq!(prior_x, 1.0);
    let position: Position = registry.get_component(entity).unwrap();
    assert_eq!(position.x, 11.0);
}

#[test]
fn clear_components_removes_every_instance() {
    init();
    let registry = Registry::new();

    for _ in 0..4 {
        let entity = registry.spawn_entity().unwrap();
        registry
            .emplace_component(entity, Velocity { dx: 0.0, dy: 0.0 })
            .unwrap();
    }

    assert_eq!(registry.clear_components::<Velocity>(), 4);
    assert_eq!(registry.count_components::<Velocity>(), 0);
    assert_eq!(registry.entity_count(), 4, "entities themselves survive");
}

#[test]
fn component_types_tracks_attach_order() {
    init();
    let registry = Registry::new();

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Position { x: 0.0, y: 0.0 })
        .unwrap();
    registry
        .emplace_component(entity, Velocity { dx: 0.0, dy: 0.0 })
        .unwrap();

    let types = registry.component_types(entity);
    assert_eq!(types.len(), 2);
    assert_eq!(types[0], std::any::TypeId::of::<Position>());
    assert_eq!(types[1], std::any::TypeId::of::<Velocity>());
}

#[test]
fn construct_signal_fires_after_insert() {
    init();
    let registry = Registry::new();

    let observed = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&observed);
    registry.on_construct::<Position>(move |_entity| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Position { x: 0.0, y: 0.0 })
        .unwrap();
    assert_eq!(observed.load(Ordering::SeqCst), 1);

    // A rejected duplicate insert fires nothing.
    let _ = registry.emplace_component(entity, Position { x: 1.0, y: 1.0 });
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[test]
fn destroy_signal_fires_before_removal() {
    init();
    let registry = Arc::new(Registry::new());

    let observed = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&observed);
    let observer = Arc::clone(&registry);
    registry.on_destroy::<Health>(move |entity| {
        // The component is still present when the callback runs.
        assert!(observer.has_component::<Health>(entity));
        count.fetch_add(1, Ordering::SeqCst);
    });

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Health { current: 1, max: 1 })
        .unwrap();
    registry.remove_component::<Health>(entity).unwrap();

    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[test]
fn destroy_signals_fire_on_kill() {
    init();
    let registry = Registry::new();

    let observed = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&observed);
    registry.on_destroy::<Position>(move |_entity| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Position { x: 0.0, y: 0.0 })
        .unwrap();
    registry.kill_entity(entity);

    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[test]
fn signal_callbacks_run_in_registration_order() {
    init();
    let registry = Registry::new();

    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        registry.on_construct::<Position>(move |_entity| {
            order.lock().push(tag);
        });
    }

    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, Position { x: 0.0, y: 0.0 })
        .unwrap();

    assert_eq!(*order.lock(), vec!["first", "second", "third"]);
}

#[test]
fn singletons_round_trip() {
    init();
    let registry = Registry::new();

    registry.set_singleton(Health { current: 3, max: 9 });
    assert!(registry.has_singleton::<Health>());

    let max = registry.with_singleton::<Health, _>(|h| h.max);
    assert_eq!(max, Some(9));

    registry.with_singleton_mut::<Health, _>(|h| h.current = 7);
    let current = registry.with_singleton::<Health, _>(|h| h.current);
    assert_eq!(current, Some(7));

    assert!(registry.remove_singleton::<Health>());
    assert!(!registry.has_singleton::<Health>());
}

#[test]
fn component_type_names_follow_attach_order() {
    init();
    let registry = Registry::new();
    let entity = registry.spawn_entity().unwrap();

    registry
        .emplace_component(entity, Position { x: 0.0, y: 0.0 })
        .unwrap();
    registry
        .emplace_component(entity, Health { current: 5, max: 5 })
        .unwrap();

    let names = registry.component_type_names(entity);
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("Position"));
    assert!(names[1].ends_with("Health"));

    registry.kill_entity(entity);
    assert!(registry.component_type_names(entity).is_empty());
}

#[test]
fn reserve_and_compact_preserve_contents() {
    init();
    let registry = Registry::new();
    registry.reserve_entities(128);
    registry.reserve_components::<Position>(128);

    let mut entities = Vec::new();
    for i in 0..100 {
        let entity = registry.spawn_entity().unwrap();
        registry
            .emplace_component(entity, Position { x: i as f32, y: 0.0 })
            .unwrap();
        entities.push(entity);
    }

    // Kill the back half, then release the churned capacity.
    for entity in entities.drain(50..) {
        registry.kill_entity(entity);
    }
    registry.compact();

    assert_eq!(registry.entity_count(), 50);
    assert_eq!(registry.count_components::<Position>(), 50);
    for (i, entity) in entities.iter().enumerate() {
        let position: Position = registry.get_component(*entity).unwrap();
        assert_eq!(position.x, i as f32);
    }
}
