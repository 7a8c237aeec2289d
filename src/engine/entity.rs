//! Entity handles and generational index allocation.
//!
//! An [`Entity`] is a lightweight `(index, generation)` value identifying a
//! logical object; it carries no data and has no ownership semantics. The
//! [`EntityAllocator`] hands out handles, recycles despawned indices with a
//! bumped generation, and permanently retires indices whose generation
//! counter reaches [`MAX_GENERATION`] (tombstones).
//!
//! ## Recycling model
//!
//! * `spawn` pops the free list and reuses the slot with its current
//!   generation (the generation was bumped when the slot was despawned), or
//!   extends storage with generation 0 when the free list is empty.
//! * `despawn` validates the handle, bumps the slot generation, and returns
//!   the index to the free list. A slot one step from [`MAX_GENERATION`] is
//!   tombstoned instead of recycled.
//! * Tombstones accumulate until [`EntityAllocator::cleanup_tombstones`]
//!   resets their generations and returns them to circulation.

use crate::engine::error::CapacityError;
use crate::engine::types::{EntityIndex, Generation, INDEX_CAP, MAX_GENERATION, PLACEHOLDER_GENERATION};

/// Lightweight `(index, generation)` handle identifying a logical object.
///
/// A handle is *alive* iff the allocator's current generation at `index`
/// equals the handle's generation. Handles are plain values: copying one
/// never copies entity data, and holding one never keeps an entity alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity {
    index: EntityIndex,
    generation: Generation,
}

impl Entity {
    /// Builds a handle from raw parts.
    #[inline]
    #[must_use]
    pub const fn new(index: EntityIndex, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index portion of the handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> EntityIndex {
        self.index
    }

    /// Returns the generation portion of the handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }

    /// Builds a command-buffer placeholder handle.
    ///
    /// Placeholders carry [`PLACEHOLDER_GENERATION`] and never validate as
    /// alive against a registry; they are resolved to real handles when the
    /// owning command buffer flushes.
    #[inline]
    #[must_use]
    pub(crate) const fn placeholder(id: u32) -> Self {
        Self { index: id, generation: PLACEHOLDER_GENERATION }
    }

    /// Reports whether this handle is a command-buffer placeholder.
    #[inline]
    #[must_use]
    pub const fn is_placeholder(self) -> bool {
        self.generation == PLACEHOLDER_GENERATION
    }
}

/// Generational index allocator backing a registry.
///
/// Spawn and despawn are O(1) amortized; liveness checks are a single
/// generation comparison. The allocator is not internally synchronized; the
/// registry guards it with a mutex.
#[derive(Default)]
pub struct EntityAllocator {
    generations: Vec<Generation>,
    alive: Vec<bool>,
    free_list: Vec<EntityIndex>,
    tombstones: Vec<EntityIndex>,
    alive_count: usize,
}

/// Free-list entries inspected per spawn before giving up on recycling.
///
/// Bounds the cost of a spawn that keeps hitting retired slots.
const MAX_RECYCLE_ATTEMPTS: usize = 5;

impl EntityAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh handle, reusing a despawned index when possible.
    ///
    /// ## Semantics
    /// * Recycles a free index with its already-bumped generation, skipping
    ///   (and tombstoning) slots whose generation reached the retirement
    ///   threshold, up to a bounded number of attempts.
    /// * Otherwise extends storage with generation 0.
    ///
    /// ## Errors
    /// [`CapacityError`] when the index space is exhausted.
    pub fn spawn(&mut self) -> Result<Entity, CapacityError> {
        let mut attempts = 0;
        while let Some(index) = self.free_list.pop() {
            let slot = index as usize;
            if self.generations[slot] < MAX_GENERATION {
                self.alive[slot] = true;
                self.alive_count += 1;
                return Ok(Entity::new(index, self.generations[slot]));
            }
            self.tombstones.push(index);
            attempts += 1;
            if attempts >= MAX_RECYCLE_ATTEMPTS {
                break;
            }
        }

        let next = self.generations.len() as u64;
        if next >= INDEX_CAP {
            return Err(CapacityError { entities_needed: next + 1, capacity: INDEX_CAP });
        }

        let index = next as EntityIndex;
        self.generations.push(0);
        self.alive.push(true);
        self.alive_count += 1;
        Ok(Entity::new(index, 0))
    }

    /// Despawns a handle, recycling or retiring its index.
    ///
    /// Returns `false` on a stale or already-despawned handle, which also
    /// guards against double-bumping the generation on a re-kill.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        if !self.is_alive(entity) {
            return false;
        }

        self.alive[slot] = false;
        self.alive_count -= 1;

        // The last usable generation is retired rather than wrapped.
        if self.generations[slot] >= MAX_GENERATION - 1 {
            self.generations[slot] = MAX_GENERATION;
            self.tombstones.push(entity.index());
        } else {
            self.generations[slot] += 1;
            self.free_list.push(entity.index());
        }
        true
    }

    /// O(1) liveness check: generation comparison plus the alive flag.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation()
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Resets retired indices and returns them to the free list.
    ///
    /// Call periodically to reclaim entity slots; returns the number of
    /// tombstones recycled.
    pub fn cleanup_tombstones(&mut self) -> usize {
        let cleaned = self.tombstones.len();
        for index in self.tombstones.drain(..) {
            let slot = index as usize;
            self.generations[slot] = 0;
            self.free_list.push(index);
        }
        cleaned
    }

    /// Reserves slot storage for at least `additional` more entities.
    pub fn reserve(&mut self, additional: usize) {
        self.generations.reserve(additional);
        self.alive.reserve(additional);
    }

    /// Releases excess capacity in slot storage and the free list.
    pub fn compact(&mut self) {
        self.generations.shrink_to_fit();
        self.alive.shrink_to_fit();
        self.free_list.shrink_to_fit();
        self.tombstones.shrink_to_fit();
    }

    /// Snapshot of every currently alive handle, in index order.
    #[must_use]
    pub fn alive_entities(&self) -> Vec<Entity> {
        self.generations
            .iter()
            .enumerate()
            .filter(|&(slot, _)| self.alive[slot])
            .map(|(slot, &generation)| Entity::new(slot as EntityIndex, generation))
            .collect()
    }

    /// Drops every slot, free-list entry, and tombstone.
    pub fn clear(&mut self) {
        self.generations.clear();
        self.alive.clear();
        self.free_list.clear();
        self.tombstones.clear();
        self.alive_count = 0;
    }
}
