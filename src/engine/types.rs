//! Core ECS scalar types and identifiers.
//!
//! This module defines the small, copyable numeric types shared across all
//! subsystems: entity indices, generation counters, and the [`Component`]
//! marker bound. These definitions form the semantic backbone of the engine
//! and are deliberately minimal so that every other module can depend on them
//! without cycles.
//!
//! ## Entity representation
//!
//! Entities are `(index, generation)` pairs:
//!
//! - **Index** identifies the slot in the allocator and in every sparse set.
//! - **Generation** enables stale-handle detection after despawning: a handle
//!   is alive only while the allocator's current generation for its index
//!   matches the handle's generation.
//!
//! A slot whose generation reaches [`MAX_GENERATION`] is permanently retired
//! (a *tombstone*) and never handed out again until explicitly reclaimed.

/// Slot index portion of an entity handle.
pub type EntityIndex = u32;

/// Generation counter portion of an entity handle.
pub type Generation = u32;

/// Generation value marking a permanently retired (tombstoned) index.
///
/// Live handles are never issued with this generation, which also makes it
/// usable as the marker for command-buffer placeholder handles.
pub const MAX_GENERATION: Generation = Generation::MAX;

/// Generation carried by placeholder handles returned from deferred spawns.
///
/// Placeholders are local to a [`CommandBuffer`](crate::engine::command::CommandBuffer)
/// and are resolved to real entities during flush; they never validate as
/// alive against a registry.
pub const PLACEHOLDER_GENERATION: Generation = MAX_GENERATION;

/// Upper bound on the number of distinct entity indices.
pub const INDEX_CAP: u64 = EntityIndex::MAX as u64;

/// Marker bound satisfied by any component type.
///
/// Components are plain data: no trait surface is required beyond being
/// storable and sendable across the worker threads used by parallel views.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}
