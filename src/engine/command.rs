//! Deferred structural mutation via thread-safe command buffers.
//!
//! Structural changes (spawn, kill, add/remove component) are forbidden
//! while a view is mid-iteration. Systems instead record them into a
//! [`CommandBuffer`] — safe from any number of worker threads — and the
//! coordinator applies the whole batch between phases with
//! [`CommandBuffer::flush`] on the registry's owning thread.
//!
//! ## Placeholder resolution
//!
//! [`CommandBuffer::spawn_deferred`] returns a *placeholder* handle
//! immediately, without touching the registry. Later commands may target
//! that placeholder; at flush time the recorded spawn populates a
//! placeholder-to-real map, and every subsequent command resolves its target
//! through the map before calling into the registry. The map is local to a
//! single flush.
//!
//! ## Failure semantics
//!
//! Commands execute in FIFO order. The first failure aborts the remainder
//! of that flush and surfaces as a [`CommandError`] on the flushing thread,
//! because later commands may depend on placeholder resolution performed by
//! earlier ones. The buffer is drained atomically at the start of the
//! flush either way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::engine::entity::Entity;
use crate::engine::error::{CommandError, EcsError};
use crate::engine::registry::Registry;
use crate::engine::types::Component;

type PlaceholderMap = HashMap<u32, Entity>;
type DeferredOp = Box<dyn FnOnce(&Registry, &mut PlaceholderMap) -> Result<(), EcsError> + Send>;

fn resolve(target: Entity, placeholders: &PlaceholderMap) -> Result<Entity, EcsError> {
    if !target.is_placeholder() {
        return Ok(target);
    }
    placeholders
        .get(&target.index())
        .copied()
        .ok_or(EcsError::UnresolvedPlaceholder(target))
}

/// Thread-safe queue of deferred structural mutations.
///
/// Pushing commands is safe from multiple producer threads; flushing must
/// be coordinated by a single thread after all producers have finished.
#[derive(Default)]
pub struct CommandBuffer {
    commands: Mutex<Vec<DeferredOp>>,
    next_placeholder: AtomicU32,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entity spawn and returns a placeholder handle immediately.
    ///
    /// The real spawn happens at flush time; the placeholder never validates
    /// as alive and is only meaningful to commands queued on this buffer
    /// before the same flush.
    pub fn spawn_deferred(&self) -> Entity {
        let placeholder_id = self.next_placeholder.fetch_add(1, Ordering::Relaxed);
        let placeholder = Entity::placeholder(placeholder_id);

        self.commands.lock().push(Box::new(move |registry, placeholders| {
            let real = registry.spawn_entity()?;
            placeholders.insert(placeholder_id, real);
            Ok(())
        }));
        placeholder
    }

    /// Records a component attach against a real or placeholder handle.
    pub fn emplace_deferred<T: Component>(&self, target: Entity, value: T) {
        self.commands.lock().push(Box::new(move |registry, placeholders| {
            let entity = resolve(target, placeholders)?;
            registry.emplace_component(entity, value)
        }));
    }

    /// Records a component detach against a real or placeholder handle.
    pub fn remove_deferred<T: Component>(&self, target: Entity) {
        self.commands.lock().push(Box::new(move |registry, placeholders| {
            let entity = resolve(target, placeholders)?;
            registry.remove_component::<T>(entity).map(|_| ())
        }));
    }

    /// Records an entity kill against a real or placeholder handle.
    ///
    /// Killing a stale handle at flush time is a no-op, matching
    /// [`Registry::kill_entity`].
    pub fn destroy_deferred(&self, target: Entity) {
        self.commands.lock().push(Box::new(move |registry, placeholders| {
            let entity = resolve(target, placeholders)?;
            registry.kill_entity(entity);
            Ok(())
        }));
    }

    /// Executes queued commands in FIFO order and clears the buffer.
    ///
    /// Call on the registry's owning thread only, after all producer
    /// threads have finished pushing. Returns the number of commands
    /// executed.
    ///
    /// ## Errors
    /// [`CommandError`] carrying the first failure and its queue position;
    /// commands after the failure are dropped unexecuted.
    pub fn flush(&self, registry: &Registry) -> Result<usize, CommandError> {
        let commands = std::mem::take(&mut *self.commands.lock());
        let total = commands.len();

        let mut placeholders = PlaceholderMap::new();
        for (position, command) in commands.into_iter().enumerate() {
            command(registry, &mut placeholders)
                .map_err(|source| CommandError { position, source })?;
        }
        Ok(total)
    }

    /// Number of commands currently queued.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.commands.lock().len()
    }

    /// Drops every queued command without executing it.
    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}
