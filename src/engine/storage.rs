//! Dense component storage and type-erased pool access.
//!
//! This module implements [`SparseSet<T>`], the per-component-type storage
//! container, and [`ErasedPool`], the dynamically-typed interface the
//! registry uses to hold heterogeneous pools behind trait objects.
//!
//! ## Storage model
//!
//! ```text
//! sparse[entity index] -> dense position | NULL_INDEX
//! packed[dense position] -> Entity          (parallel to dense)
//! dense[dense position]  -> T               (contiguous component values)
//! ```
//!
//! Values are packed densely from position 0 upward with no gaps, which is
//! what makes view iteration cache-friendly. Removal swaps the removed
//! element with the last dense element and patches `sparse`, so iteration
//! order is insertion order **except** after a removal — consumers must not
//! rely on ordering stability.
//!
//! ## Complexity
//!
//! * Insert: O(1) amortized
//! * Remove: O(1) via swap-and-pop
//! * Lookup: O(1) direct access
//! * Iterate: O(n) linear scan over `dense`
//!
//! ## Type erasure
//!
//! [`ErasedPool`] lets the registry remove, count, and clear components
//! without knowing `T`, and exposes `as_any` / `as_any_mut` downcasting
//! hooks for recovering the typed container. Typed access is cached outside
//! hot loops; views downcast once per call, never per entity.

use std::any::{Any, TypeId};

use crate::engine::entity::Entity;
use crate::engine::error::EcsError;
use crate::engine::types::Component;

/// Sentinel marking an empty `sparse` slot.
pub(crate) const NULL_INDEX: usize = usize::MAX;

/// Dynamically-typed interface over a single component pool.
///
/// Implemented by [`SparseSet<T>`] for every stored component type; the
/// registry owns pools as `Box<dyn ErasedPool>` and downcasts through
/// [`ErasedPool::as_any_mut`] when typed access is required.
pub trait ErasedPool: Send + Sync {
    /// [`TypeId`] of the stored component type.
    fn component_type_id(&self) -> TypeId;

    /// Human-readable name of the stored component type.
    fn component_type_name(&self) -> &'static str;

    /// Whether the pool holds a component for `entity`.
    fn contains(&self, entity: Entity) -> bool;

    /// Removes `entity`'s component if present; reports whether it was.
    fn erase(&mut self, entity: Entity) -> bool;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Whether the pool is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entities currently stored, in dense order.
    fn packed_entities(&self) -> &[Entity];

    /// Drops every stored component.
    fn clear(&mut self);

    /// Releases excess storage capacity.
    fn shrink_to_fit(&mut self);

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Cache-efficient component storage keyed by entity index.
///
/// See the module docs for the layout and ordering contract. The container
/// is not internally synchronized; the registry serializes structural access
/// and views freeze structure for the duration of a call.
pub struct SparseSet<T> {
    sparse: Vec<usize>,
    packed: Vec<Entity>,
    dense: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self { sparse: Vec::new(), packed: Vec::new(), dense: Vec::new() }
    }
}

impl<T: Component> SparseSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a component for `entity`.
    ///
    /// ## Errors
    /// [`EcsError::DuplicateComponent`] if the entity already holds `T`;
    /// duplicate inserts are rejected explicitly, never overwritten.
    pub fn emplace(&mut self, entity: Entity, value: T) -> Result<&mut T, EcsError> {
        if self.contains(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: std::any::type_name::<T>(),
            });
        }

        let slot = entity.index() as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, NULL_INDEX);
        }

        self.sparse[slot] = self.dense.len();
        self.packed.push(entity);
        self.dense.push(value);
        Ok(self.dense.last_mut().expect("dense cannot be empty after push"))
    }

    /// Removes and returns `entity`'s component via swap-and-pop.
    ///
    /// The element that previously occupied the last dense position moves
    /// into the vacated slot, perturbing iteration order.
    ///
    /// ## Errors
    /// [`EcsError::MissingComponent`] if the entity does not hold `T`.
    pub fn remove(&mut self, entity: Entity) -> Result<T, EcsError> {
        if !self.contains(entity) {
            return Err(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            });
        }

        let slot = entity.index() as usize;
        let dense_index = self.sparse[slot];
        let last_index = self.dense.len() - 1;

        if dense_index != last_index {
            let last_entity = self.packed[last_index];
            self.packed.swap(dense_index, last_index);
            self.dense.swap(dense_index, last_index);
            self.sparse[last_entity.index() as usize] = dense_index;
        }

        self.packed.pop();
        self.sparse[slot] = NULL_INDEX;
        Ok(self.dense.pop().expect("dense cannot be empty during remove"))
    }

    /// Whether the set holds a component for `entity`.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        slot < self.sparse.len()
            && self.sparse[slot] != NULL_INDEX
            && self.sparse[slot] < self.packed.len()
            && self.packed[self.sparse[slot]] == entity
    }

    /// Shared access to `entity`'s component.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        if self.contains(entity) {
            Some(&self.dense[self.sparse[entity.index() as usize]])
        } else {
            None
        }
    }

    /// Mutable access to `entity`'s component.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        if self.contains(entity) {
            let dense_index = self.sparse[entity.index() as usize];
            Some(&mut self.dense[dense_index])
        } else {
            None
        }
    }

    /// Number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the set is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Entities currently stored, parallel to the dense array.
    #[inline]
    #[must_use]
    pub fn packed(&self) -> &[Entity] {
        &self.packed
    }

    /// Component values in dense order, parallel to [`SparseSet::packed`].
    #[inline]
    #[must_use]
    pub fn dense(&self) -> &[T] {
        &self.dense
    }

    /// Iterates `(Entity, &T)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.packed.iter().copied().zip(self.dense.iter())
    }

    /// Reserves capacity for at least `additional` more components.
    pub fn reserve(&mut self, additional: usize) {
        self.packed.reserve(additional);
        self.dense.reserve(additional);
    }

    /// Releases excess capacity, dropping trailing empty sparse slots.
    pub fn shrink_to_fit(&mut self) {
        while self.sparse.last() == Some(&NULL_INDEX) {
            self.sparse.pop();
        }
        self.sparse.shrink_to_fit();
        self.packed.shrink_to_fit();
        self.dense.shrink_to_fit();
    }

    /// Raw storage parts for view iteration.
    ///
    /// The returned pointers are valid while the set's structure is frozen;
    /// views guarantee that by holding the registry's exclusive borrow.
    pub(crate) fn raw_parts(&mut self) -> RawPoolParts<T> {
        RawPoolParts {
            sparse: self.sparse.as_ptr(),
            sparse_len: self.sparse.len(),
            packed: self.packed.as_ptr(),
            dense: self.dense.as_mut_ptr(),
            len: self.dense.len(),
        }
    }
}

/// Raw pointers into one sparse set, captured before view dispatch.
///
/// Mirrors the layout of [`SparseSet<T>`]; membership tests read `sparse`
/// and `packed`, fetches write through `dense`. Distinct entities resolve to
/// distinct dense slots, which is what makes chunked parallel fetches sound.
///
/// Public only because it appears in
/// [`ComponentSet::Pools`](crate::engine::view::ComponentSet::Pools); it
/// exposes no usable surface outside the crate.
pub struct RawPoolParts<T> {
    sparse: *const usize,
    sparse_len: usize,
    packed: *const Entity,
    dense: *mut T,
    len: usize,
}

impl<T> Clone for RawPoolParts<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawPoolParts<T> {}

impl<T> RawPoolParts<T> {
    /// Number of stored components.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Packed entity array.
    ///
    /// ## Safety
    /// The source set's structure must be frozen for `'a`.
    #[inline]
    pub(crate) unsafe fn packed_slice<'a>(&self) -> &'a [Entity] {
        unsafe { std::slice::from_raw_parts(self.packed, self.len) }
    }

    /// Membership test identical to [`SparseSet::contains`].
    ///
    /// ## Safety
    /// The source set's structure must be frozen.
    #[inline]
    pub(crate) unsafe fn contains(&self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        if slot >= self.sparse_len {
            return false;
        }
        unsafe {
            let dense_index = *self.sparse.add(slot);
            dense_index != NULL_INDEX
                && dense_index < self.len
                && *self.packed.add(dense_index) == entity
        }
    }

    /// Mutable reference to `entity`'s component.
    ///
    /// ## Safety
    /// `entity` must be contained, the source set's structure must be
    /// frozen, and no other reference to the same dense slot may be live.
    #[inline]
    pub(crate) unsafe fn fetch<'a>(&self, entity: Entity) -> &'a mut T {
        unsafe {
            let dense_index = *self.sparse.add(entity.index() as usize);
            &mut *self.dense.add(dense_index)
        }
    }
}

impl<T: Component> ErasedPool for SparseSet<T> {
    fn component_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn component_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn contains(&self, entity: Entity) -> bool {
        SparseSet::contains(self, entity)
    }

    fn erase(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_ok()
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn packed_entities(&self) -> &[Entity] {
        &self.packed
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.packed.clear();
        self.dense.clear();
    }

    fn shrink_to_fit(&mut self) {
        SparseSet::shrink_to_fit(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
