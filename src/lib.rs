//! # Riptide ECS
//!
//! Sparse-set Entity-Component-System runtime for real-time simulations
//! and games.
//!
//! ## Design Goals
//! - Generational entity handles with O(1) stale-handle detection
//! - Dense per-type storage for cache-friendly iteration
//! - Parallel CPU iteration over component sets
//! - Structural mutation deferred through thread-safe command buffers
//! - Safe, explicit data access
//!
//! ## Quick tour
//!
//! ```rust
//! use riptide_ecs::prelude::*;
//!
//! struct Position { x: f32, y: f32 }
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut registry = Registry::new();
//! let entity = registry.spawn_entity().unwrap();
//! registry.emplace_component(entity, Position { x: 0.0, y: 0.0 }).unwrap();
//! registry.emplace_component(entity, Velocity { dx: 1.0, dy: 2.0 }).unwrap();
//!
//! registry.view::<(Position, Velocity)>().each(|_entity, (pos, vel)| {
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//! });
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core ECS types

pub use engine::registry::Registry;

pub use engine::entity::{
    Entity,
    EntityAllocator,
};

pub use engine::storage::{
    ErasedPool,
    SparseSet,
};

pub use engine::view::{
    ComponentSet,
    ParallelView,
    View,
};

pub use engine::command::CommandBuffer;

pub use engine::signal::{
    SignalDispatcher,
    SignalFn,
};

pub use engine::relationship::RelationshipManager;

pub use engine::prefab::{
    PrefabFn,
    PrefabManager,
};

pub use engine::system::{
    System,
    require_component,
};
pub use engine::scheduler::SystemScheduler;

pub use engine::serialization::{
    ComponentSerializer,
    FnComponentSerializer,
    Serializer,
};

pub use engine::error::{
    CapacityError,
    CommandError,
    EcsError,
    MissingComponentError,
    PrefabError,
    ScheduleError,
    SnapshotError,
};

pub use engine::types::{
    Component,
    EntityIndex,
    Generation,
    MAX_GENERATION,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use riptide_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CommandBuffer,
        Component,
        ComponentSet,
        EcsError,
        Entity,
        PrefabManager,
        Registry,
        RelationshipManager,
        Serializer,
        System,
        SystemScheduler,
    };
}
