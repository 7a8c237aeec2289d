mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::init;
use riptide_ecs::{require_component, Registry, ScheduleError, System, SystemScheduler};

type Trace = Arc<parking_lot::Mutex<Vec<&'static str>>>;

fn tracing_system(trace: &Trace, tag: &'static str) -> impl FnMut(&mut Registry) + Send + 'static {
    let trace = Arc::clone(trace);
    move |_registry| trace.lock().push(tag)
}

#[test]
fn dependencies_run_first() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();
    let trace: Trace = Trace::default();

    // Registered in reverse dependency order on purpose.
    scheduler
        .add_system("render", tracing_system(&trace, "render"), &["movement"])
        .unwrap();
    scheduler
        .add_system("movement", tracing_system(&trace, "movement"), &["input"])
        .unwrap();
    scheduler
        .add_system("input", tracing_system(&trace, "input"), &[])
        .unwrap();

    scheduler.run(&mut registry).unwrap();
    assert_eq!(*trace.lock(), vec!["input", "movement", "render"]);
}

#[test]
fn independent_systems_follow_registration_order() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();
    let trace: Trace = Trace::default();

    scheduler.add_system("c", tracing_system(&trace, "c"), &[]).unwrap();
    scheduler.add_system("a", tracing_system(&trace, "a"), &[]).unwrap();
    scheduler.add_system("b", tracing_system(&trace, "b"), &[]).unwrap();

    scheduler.run(&mut registry).unwrap();
    assert_eq!(*trace.lock(), vec!["c", "a", "b"]);
}

#[test]
fn duplicate_name_is_rejected() {
    init();
    let mut scheduler = SystemScheduler::new();

    scheduler.add_system("tick", |_: &mut Registry| {}, &[]).unwrap();
    let result = scheduler.add_system("tick", |_: &mut Registry| {}, &[]);
    assert!(matches!(result, Err(ScheduleError::DuplicateSystem(_))));
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn missing_dependency_fails_before_anything_runs() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();
    let ran = Arc::new(AtomicUsize::new(0));

    let count = Arc::clone(&ran);
    scheduler
        .add_system("movement", move |_: &mut Registry| {
            count.fetch_add(1, Ordering::SeqCst);
        }, &["physics"])
        .unwrap();

    let result = scheduler.run(&mut registry);
    assert!(matches!(result, Err(ScheduleError::MissingDependency { .. })));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn dependency_cycle_fails_before_anything_runs() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();
    let ran = Arc::new(AtomicUsize::new(0));

    for (name, dep) in [("a", "b"), ("b", "a")] {
        let count = Arc::clone(&ran);
        scheduler
            .add_system(name, move |_: &mut Registry| {
                count.fetch_add(1, Ordering::SeqCst);
            }, &[dep])
            .unwrap();
    }

    let result = scheduler.run(&mut registry);
    assert!(matches!(result, Err(ScheduleError::DependencyCycle)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn disabled_systems_are_skipped_but_keep_their_slot() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();
    let trace: Trace = Trace::default();

    scheduler.add_system("first", tracing_system(&trace, "first"), &[]).unwrap();
    scheduler
        .add_system("second", tracing_system(&trace, "second"), &["first"])
        .unwrap();
    scheduler
        .add_system("third", tracing_system(&trace, "third"), &["second"])
        .unwrap();

    scheduler.set_system_enabled("second", false).unwrap();
    assert!(!scheduler.is_system_enabled("second").unwrap());

    scheduler.run(&mut registry).unwrap();
    // A disabled system still satisfies its dependents' edges.
    assert_eq!(*trace.lock(), vec!["first", "third"]);

    scheduler.set_system_enabled("second", true).unwrap();
    trace.lock().clear();
    scheduler.run(&mut registry).unwrap();
    assert_eq!(*trace.lock(), vec!["first", "second", "third"]);
}

#[test]
fn unknown_names_error() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();

    assert!(matches!(
        scheduler.run_system("ghost", &mut registry),
        Err(ScheduleError::UnknownSystem(_))
    ));
    assert!(matches!(
        scheduler.set_system_enabled("ghost", true),
        Err(ScheduleError::UnknownSystem(_))
    ));
    assert!(matches!(
        scheduler.is_system_enabled("ghost"),
        Err(ScheduleError::UnknownSystem(_))
    ));
}

#[test]
fn run_system_executes_out_of_band() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();
    let trace: Trace = Trace::default();

    scheduler
        .add_system("solo", tracing_system(&trace, "solo"), &["missing"])
        .unwrap();

    // Direct invocation ignores the (broken) dependency graph.
    scheduler.run_system("solo", &mut registry).unwrap();
    assert_eq!(*trace.lock(), vec!["solo"]);
}

#[test]
fn remove_system_unblocks_reregistration() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();
    let trace: Trace = Trace::default();

    scheduler.add_system("tick", tracing_system(&trace, "old"), &[]).unwrap();
    assert!(scheduler.remove_system("tick"));
    assert!(!scheduler.remove_system("tick"));

    scheduler.add_system("tick", tracing_system(&trace, "new"), &[]).unwrap();
    scheduler.run(&mut registry).unwrap();
    assert_eq!(*trace.lock(), vec!["new"]);
}

#[test]
fn execution_order_reports_the_schedule() {
    init();
    let mut scheduler = SystemScheduler::new();

    scheduler.add_system("b", |_: &mut Registry| {}, &["a"]).unwrap();
    scheduler.add_system("a", |_: &mut Registry| {}, &[]).unwrap();

    let order = scheduler.execution_order().unwrap();
    assert_eq!(order, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn boxed_systems_register_under_their_own_name() {
    init();
    let mut registry = Registry::new();
    let mut scheduler = SystemScheduler::new();

    struct Counter {
        runs: Arc<AtomicUsize>,
    }

    impl System for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn run(&mut self, _registry: &mut Registry) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    let runs = Arc::new(AtomicUsize::new(0));
    scheduler
        .add_boxed(Box::new(Counter { runs: Arc::clone(&runs) }), &[])
        .unwrap();

    scheduler.run(&mut registry).unwrap();
    scheduler.run(&mut registry).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn require_component_names_the_failing_precondition() {
    init();
    let registry = Registry::new();
    let entity = registry.spawn_entity().unwrap();

    let error =
        require_component::<common::Health>(&registry, entity, "combat").unwrap_err();
    assert_eq!(error.system, "combat");
    assert_eq!(error.entity, entity);

    registry
        .emplace_component(entity, common::Health { current: 1, max: 1 })
        .unwrap();
    assert!(require_component::<common::Health>(&registry, entity, "combat").is_ok());
}

#[test]
fn systems_mutate_through_the_registry() {
    init();
    let mut registry = Registry::new();
    let entity = registry.spawn_entity().unwrap();
    registry
        .emplace_component(entity, common::Health { current: 10, max: 10 })
        .unwrap();

    let mut scheduler = SystemScheduler::new();
    scheduler
        .add_system("decay", move |registry: &mut Registry| {
            registry
                .patch::<common::Health, _>(entity, |h| h.current -= 1)
                .unwrap();
        }, &[])
        .unwrap();

    scheduler.run(&mut registry).unwrap();
    scheduler.run(&mut registry).unwrap();

    let health: common::Health = registry.get_component(entity).unwrap();
    assert_eq!(health.current, 8);
}

#[test]
fn systems_iterate_views() {
    init();
    let mut registry = Registry::new();
    let mut entities = Vec::new();
    for i in 0..4 {
        let entity = registry.spawn_entity().unwrap();
        registry
            .emplace_component(entity, common::Position { x: i as f32, y: 0.0 })
            .unwrap();
        registry
            .emplace_component(entity, common::Velocity { dx: 1.0, dy: 2.0 })
            .unwrap();
        entities.push(entity);
    }

    let mut scheduler = SystemScheduler::new();
    scheduler
        .add_system("movement", |registry: &mut Registry| {
            registry
                .view::<(common::Position, common::Velocity)>()
                .each(|_, (position, velocity)| {
                    position.x += velocity.dx;
                    position.y += velocity.dy;
                });
        }, &[])
        .unwrap();

    scheduler.run(&mut registry).unwrap();
    scheduler.run(&mut registry).unwrap();

    for (i, entity) in entities.iter().enumerate() {
        let position: common::Position = registry.get_component(*entity).unwrap();
        assert_eq!(position, common::Position { x: i as f32 + 2.0, y: 4.0 });
    }
}
