//! Central ECS coordinator: entity lifecycle, component storage, signals.
//!
//! The [`Registry`] owns the entity allocator and one [`SparseSet`] per
//! registered component type, and composes the [`SignalDispatcher`] and
//! [`RelationshipManager`] as peer collaborators. Systems consume it through
//! plain data (components), views, and deferred command buffers.
//!
//! ## Concurrency model
//!
//! Two access modes with different guarantees:
//!
//! * **Structural operations** (`spawn_entity`, `kill_entity`,
//!   `emplace_component`, `remove_component`, ...) take `&self` and are
//!   internally synchronized, so worker threads may spawn and attach
//!   components concurrently.
//! * **Iteration** ([`Registry::view`], [`Registry::parallel_view`]) takes
//!   `&mut self`. The exclusive borrow statically enforces the load-bearing
//!   invariant: structure is never mutated while a view driven by the same
//!   storage is mid-iteration. Structural changes wanted during iteration
//!   are deferred through a [`CommandBuffer`](crate::engine::command::CommandBuffer)
//!   and flushed afterwards.
//!
//! Signal callbacks run on the caller's thread with no registry lock held
//! (copy-then-call), so they may freely call back into the registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use crate::engine::entity::{Entity, EntityAllocator};
use crate::engine::error::EcsError;
use crate::engine::relationship::RelationshipManager;
use crate::engine::signal::SignalDispatcher;
use crate::engine::storage::{ErasedPool, SparseSet};
use crate::engine::types::{Component, EntityIndex};
use crate::engine::view::{ComponentSet, ParallelView, View};

/// Central ECS coordinator managing entities, components, and signals.
///
/// See the module docs for the concurrency model. A `Registry` is `Send +
/// Sync`; share it behind an `Arc` for concurrent structural work, and use
/// the single owning thread (or a flushed command buffer) for anything that
/// must interleave with iteration.
#[derive(Default)]
pub struct Registry {
    allocator: Mutex<EntityAllocator>,
    pools: RwLock<HashMap<TypeId, Box<dyn ErasedPool>>>,
    entity_components: RwLock<HashMap<EntityIndex, Vec<TypeId>>>,
    signals: SignalDispatcher,
    relationships: RelationshipManager,
    singletons: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    /// Returns a fresh alive handle.
    ///
    /// O(1) amortized: reuses a despawned index with its bumped generation
    /// when one is available, otherwise extends allocator storage.
    ///
    /// ## Errors
    /// [`EcsError::Capacity`] when the entity index space is exhausted.
    pub fn spawn_entity(&self) -> Result<Entity, EcsError> {
        let entity = self.allocator.lock().spawn()?;
        self.entity_components.write().insert(entity.index(), Vec::new());
        Ok(entity)
    }

    /// Destroys an entity and everything attached to it.
    ///
    /// Destroy signals fire first (per component, registration order), then
    /// the component is removed from its pool, then the entity is detached
    /// from the relationship graph — children are orphaned, never cascaded —
    /// and finally the index is recycled or tombstoned.
    ///
    /// Returns `false` on a stale handle; a re-kill is a no-op and never
    /// double-bumps the generation.
    pub fn kill_entity(&self, entity: Entity) -> bool {
        if !self.allocator.lock().despawn(entity) {
            return false;
        }

        let component_types = self
            .entity_components
            .write()
            .remove(&entity.index())
            .unwrap_or_default();

        for type_key in component_types {
            self.signals.dispatch_destroy(type_key, entity);
            let mut pools = self.pools.write();
            if let Some(pool) = pools.get_mut(&type_key) {
                pool.erase(entity);
            }
        }

        self.relationships.remove_entity(entity);
        true
    }

    /// O(1) liveness check.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.lock().is_alive(entity)
    }

    /// Number of currently alive entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.allocator.lock().alive_count()
    }

    /// Snapshot of every currently alive handle, in index order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.allocator.lock().alive_entities()
    }

    /// Returns retired indices to circulation; reports how many.
    pub fn cleanup_tombstones(&self) -> usize {
        self.allocator.lock().cleanup_tombstones()
    }

    /// Kills every alive entity matching `predicate`; reports how many.
    pub fn remove_entities_if(&self, mut predicate: impl FnMut(Entity) -> bool) -> usize {
        let doomed: Vec<Entity> = self.entities().into_iter().filter(|&e| predicate(e)).collect();
        for entity in &doomed {
            self.kill_entity(*entity);
        }
        doomed.len()
    }

    /// Wipes entities, components, relationships, and singletons.
    ///
    /// No destroy signals fire; this is a teardown primitive used by
    /// snapshot restore, not a bulk kill.
    pub fn clear(&self) {
        self.allocator.lock().clear();
        for pool in self.pools.write().values_mut() {
            pool.clear();
        }
        self.entity_components.write().clear();
        self.relationships.clear();
        self.singletons.write().clear();
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attaches a component to an alive entity.
    ///
    /// The construct signal for `T` fires after insertion, on this thread,
    /// with no registry lock held.
    ///
    /// ## Errors
    /// * [`EcsError::DeadEntity`] on a stale handle.
    /// * [`EcsError::DuplicateComponent`] if the entity already holds `T`.
    pub fn emplace_component<T: Component>(&self, entity: Entity, value: T) -> Result<(), EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }

        let type_key = TypeId::of::<T>();
        {
            let mut pools = self.pools.write();
            let pool = pools
                .entry(type_key)
                .or_insert_with(|| Box::new(SparseSet::<T>::new()));
            let set = pool
                .as_any_mut()
                .downcast_mut::<SparseSet<T>>()
                .expect("pool type key and stored type always agree");
            set.emplace(entity, value)?;
        }

        {
            let mut lists = self.entity_components.write();
            let list = lists.entry(entity.index()).or_default();
            if !list.contains(&type_key) {
                list.push(type_key);
            }
        }

        // A concurrent kill may have snapshotted the entity's component list
        // before the insert above landed; re-validate and undo so the pool
        // never keeps a component for a dead entity.
        if !self.is_alive(entity) {
            if let Some(pool) = self.pools.write().get_mut(&type_key) {
                pool.erase(entity);
            }
            if let Some(list) = self.entity_components.write().get_mut(&entity.index()) {
                list.retain(|&t| t != type_key);
            }
            return Err(EcsError::DeadEntity(entity));
        }

        self.signals.dispatch_construct(type_key, entity);
        Ok(())
    }

    /// Returns the existing component, or inserts `value` and returns it.
    ///
    /// The construct signal fires only when the component is newly created.
    pub fn get_or_emplace<T: Component + Clone>(&self, entity: Entity, value: T) -> Result<T, EcsError> {
        if let Ok(existing) = self.get_component::<T>(entity) {
            return Ok(existing);
        }
        self.emplace_component(entity, value.clone())?;
        Ok(value)
    }

    /// Detaches and returns a component from an entity.
    ///
    /// The destroy signal for `T` fires before removal, on this thread,
    /// with no registry lock held.
    ///
    /// ## Errors
    /// [`EcsError::MissingComponent`] if the entity does not hold `T`.
    pub fn remove_component<T: Component>(&self, entity: Entity) -> Result<T, EcsError> {
        let type_key = TypeId::of::<T>();
        if !self.has_component::<T>(entity) {
            return Err(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            });
        }

        self.signals.dispatch_destroy(type_key, entity);

        let value = {
            let mut pools = self.pools.write();
            let set = pools
                .get_mut(&type_key)
                .and_then(|pool| pool.as_any_mut().downcast_mut::<SparseSet<T>>())
                .ok_or(EcsError::MissingComponent {
                    entity,
                    component: std::any::type_name::<T>(),
                })?;
            set.remove(entity)?
        };

        if let Some(list) = self.entity_components.write().get_mut(&entity.index()) {
            list.retain(|&t| t != type_key);
        }
        Ok(value)
    }

    /// Removes every `T` from every entity; reports how many.
    ///
    /// The destroy signal fires once per removed component.
    pub fn clear_components<T: Component>(&self) -> usize {
        let type_key = TypeId::of::<T>();
        let holders: Vec<Entity> = {
            let pools = self.pools.read();
            match pools.get(&type_key) {
                Some(pool) => pool.packed_entities().to_vec(),
                None => return 0,
            }
        };

        for &entity in &holders {
            self.signals.dispatch_destroy(type_key, entity);
        }

        if let Some(pool) = self.pools.write().get_mut(&type_key) {
            pool.clear();
        }

        let mut lists = self.entity_components.write();
        for entity in &holders {
            if let Some(list) = lists.get_mut(&entity.index()) {
                list.retain(|&t| t != type_key);
            }
        }
        holders.len()
    }

    /// Whether `entity` currently holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        let pools = self.pools.read();
        pools
            .get(&TypeId::of::<T>())
            .is_some_and(|pool| pool.contains(entity))
    }

    /// Number of entities currently holding a `T`.
    #[must_use]
    pub fn count_components<T: Component>(&self) -> usize {
        let pools = self.pools.read();
        pools.get(&TypeId::of::<T>()).map_or(0, |pool| pool.len())
    }

    /// Copies out `entity`'s component value.
    ///
    /// Structural operations take `&self`, so component access returns a
    /// clone rather than a reference; use [`Registry::patch`] for in-place
    /// mutation or a view for bulk access.
    ///
    /// ## Errors
    /// * [`EcsError::DeadEntity`] on a stale handle.
    /// * [`EcsError::MissingComponent`] if the entity does not hold `T`.
    pub fn get_component<T: Component + Clone>(&self, entity: Entity) -> Result<T, EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        let pools = self.pools.read();
        pools
            .get(&TypeId::of::<T>())
            .and_then(|pool| pool.as_any().downcast_ref::<SparseSet<T>>())
            .and_then(|set| set.get(entity))
            .cloned()
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })
    }

    /// Mutates `entity`'s component in place through a closure.
    ///
    /// The closure runs under the storage lock: it must not call back into
    /// the registry's component API.
    ///
    /// ## Errors
    /// * [`EcsError::DeadEntity`] on a stale handle.
    /// * [`EcsError::MissingComponent`] if the entity does not hold `T`.
    pub fn patch<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        let mut pools = self.pools.write();
        let component = pools
            .get_mut(&TypeId::of::<T>())
            .and_then(|pool| pool.as_any_mut().downcast_mut::<SparseSet<T>>())
            .and_then(|set| set.get_mut(entity))
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })?;
        Ok(f(component))
    }

    /// Component types currently attached to `entity`, in attach order.
    #[must_use]
    pub fn component_types(&self, entity: Entity) -> Vec<TypeId> {
        if !self.is_alive(entity) {
            return Vec::new();
        }
        self.entity_components
            .read()
            .get(&entity.index())
            .cloned()
            .unwrap_or_default()
    }

    /// Human-readable names of `entity`'s component types, in attach order.
    ///
    /// Intended for diagnostics and log messages. Names come from
    /// `std::any::type_name` and are not stable across compiler versions;
    /// match on suffixes, not full paths.
    #[must_use]
    pub fn component_type_names(&self, entity: Entity) -> Vec<&'static str> {
        let types = self.component_types(entity);
        let pools = self.pools.read();
        types
            .iter()
            .filter_map(|type_key| pools.get(type_key).map(|pool| pool.component_type_name()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Capacity
    // ------------------------------------------------------------------

    /// Pre-sizes allocator slot storage for `additional` more entities.
    pub fn reserve_entities(&self, additional: usize) {
        self.allocator.lock().reserve(additional);
    }

    /// Pre-sizes the `T` pool for `additional` more components, creating
    /// the pool if it does not exist yet.
    pub fn reserve_components<T: Component>(&self, additional: usize) {
        let mut pools = self.pools.write();
        let pool = pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));
        if let Some(set) = pool.as_any_mut().downcast_mut::<SparseSet<T>>() {
            set.reserve(additional);
        }
    }

    /// Releases excess capacity held by the allocator and every pool.
    ///
    /// Stored data is untouched; only capacity retained by earlier churn
    /// is returned. Call after large despawn waves.
    pub fn compact(&self) {
        self.allocator.lock().compact();
        for pool in self.pools.write().values_mut() {
            pool.shrink_to_fit();
        }
        self.entity_components.write().shrink_to_fit();
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    /// Registers a callback fired after a `T` is attached to any entity.
    pub fn on_construct<T: Component>(&self, callback: impl Fn(Entity) + Send + Sync + 'static) {
        self.signals
            .register_construct(TypeId::of::<T>(), std::sync::Arc::new(callback));
    }

    /// Registers a callback fired before a `T` is detached from any entity.
    pub fn on_destroy<T: Component>(&self, callback: impl Fn(Entity) + Send + Sync + 'static) {
        self.signals
            .register_destroy(TypeId::of::<T>(), std::sync::Arc::new(callback));
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Builds a filtered view over entities holding every component in `C`.
    ///
    /// The exclusive borrow freezes structure for the view's lifetime, so
    /// structural mutation during iteration is a compile error rather than
    /// undefined behavior. Queue such changes into a command buffer instead.
    pub fn view<C: ComponentSet>(&mut self) -> View<'_, C> {
        View::new(self)
    }

    /// Like [`Registry::view`], but `each` dispatches contiguous chunks of
    /// the driving pool to rayon workers and joins before returning.
    pub fn parallel_view<C: ComponentSet>(&mut self) -> ParallelView<'_, C> {
        ParallelView::new(self)
    }

    // ------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------

    /// Parent/child relationship graph over this registry's entities.
    #[must_use]
    pub fn relationships(&self) -> &RelationshipManager {
        &self.relationships
    }

    // ------------------------------------------------------------------
    // Singleton resources
    // ------------------------------------------------------------------

    /// Creates or replaces the global singleton of type `T`.
    pub fn set_singleton<T: Component>(&self, value: T) {
        self.singletons.write().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Runs `f` with shared access to the singleton of type `T`.
    ///
    /// Returns `None` when the singleton is absent. Closure-based access is
    /// used instead of returned references because structural operations
    /// take `&self`.
    pub fn with_singleton<T: Component, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let singletons = self.singletons.read();
        singletons
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .map(f)
    }

    /// Runs `f` with mutable access to the singleton of type `T`.
    pub fn with_singleton_mut<T: Component, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut singletons = self.singletons.write();
        singletons
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
            .map(f)
    }

    /// Whether a singleton of type `T` exists.
    #[must_use]
    pub fn has_singleton<T: Component>(&self) -> bool {
        self.singletons.read().contains_key(&TypeId::of::<T>())
    }

    /// Drops the singleton of type `T`; reports whether one existed.
    pub fn remove_singleton<T: Component>(&self) -> bool {
        self.singletons.write().remove(&TypeId::of::<T>()).is_some()
    }

    // ------------------------------------------------------------------
    // Internal view plumbing
    // ------------------------------------------------------------------

    /// Typed pool access for view construction.
    ///
    /// Goes through `RwLock::get_mut`, so the exclusive registry borrow is
    /// the only synchronization needed.
    pub(crate) fn sparse_set_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        self.pools
            .get_mut()
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
    }

    /// Erased pool pointer for exclusion filters.
    pub(crate) fn erased_pool_ptr(&mut self, type_key: TypeId) -> Option<*const dyn ErasedPool> {
        self.pools
            .get_mut()
            .get(&type_key)
            .map(|pool| &**pool as *const dyn ErasedPool)
    }
}
