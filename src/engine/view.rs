//! Filtered iteration over registry storage.
//!
//! A [`View`] visits every entity holding all of a set of component types,
//! optionally rejecting entities that hold any excluded type. Iteration is
//! driven by the smallest participating pool's dense array, with membership
//! checks against the others per candidate — the classic sparse-set join.
//!
//! ## Structure freeze
//!
//! Views borrow the registry exclusively. Component *values* may be mutated
//! freely through the references a view hands out, but structural mutation
//! (spawn, kill, add/remove component) is statically impossible while a view
//! exists; defer such changes through a
//! [`CommandBuffer`](crate::engine::command::CommandBuffer).
//!
//! ## Parallel iteration
//!
//! [`ParallelView::each`] partitions the driving dense array into contiguous
//! chunks dispatched to rayon workers, joining before it returns. Each worker
//! touches only entities in its chunk, and distinct entities resolve to
//! distinct dense slots, so chunk workers never alias. Cross-chunk ordering
//! is unspecified; within a chunk, order follows the dense array.
//!
//! ## Safety
//!
//! Iteration works through raw pool pointers captured up front (the same
//! discipline as dispatching raw chunk jobs to workers): the exclusive
//! registry borrow freezes structure, so the pointers stay valid for the
//! whole call. A component set naming the same type twice would alias; this
//! is rejected by a debug assertion at view construction.

use std::any::TypeId;
use std::marker::PhantomData;

use rayon::prelude::*;

use crate::engine::entity::Entity;
use crate::engine::registry::Registry;
use crate::engine::storage::{ErasedPool, RawPoolParts};
use crate::engine::types::Component;

/// A set of component types iterated together by a view.
///
/// Implemented for tuples of up to four component types; single-component
/// views use the one-element tuple form, e.g. `registry.view::<(Position,)>()`.
///
/// ## Safety
///
/// Implementations must return pool pointers that all originate from the
/// given registry, report membership consistently with [`ComponentSet::fetch`],
/// and fetch distinct dense slots for distinct entities.
pub unsafe trait ComponentSet: 'static {
    /// Raw pool pointer bundle captured before iteration.
    type Pools: Copy;

    /// Component references handed to the iteration callback.
    type Refs<'a>;

    /// [`TypeId`]s of the participating component types, in tuple order.
    fn type_ids() -> Vec<TypeId>;

    /// Captures raw pool parts for every participating type.
    ///
    /// Returns `None` when any pool has never been created, in which case
    /// the view is trivially empty.
    ///
    /// ## Safety
    /// `registry` must point to a registry that outlives the returned
    /// pointers and whose structure is frozen while they are in use.
    unsafe fn pools(registry: *mut Registry) -> Option<Self::Pools>;

    /// Packed entity array of the smallest participating pool.
    ///
    /// ## Safety
    /// Structure must be frozen for `'a`.
    unsafe fn driving_packed<'a>(pools: &Self::Pools) -> &'a [Entity];

    /// Whether every participating pool contains `entity`.
    ///
    /// ## Safety
    /// Structure must be frozen.
    unsafe fn contains_all(pools: &Self::Pools, entity: Entity) -> bool;

    /// Mutable references to `entity`'s components.
    ///
    /// ## Safety
    /// `entity` must satisfy [`ComponentSet::contains_all`], structure must
    /// be frozen, and no other references to the same dense slots may live.
    unsafe fn fetch<'a>(pools: &Self::Pools, entity: Entity) -> Self::Refs<'a>;
}

macro_rules! impl_component_set {
    ($(($ty:ident, $idx:tt)),+) => {
        unsafe impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Pools = ($(RawPoolParts<$ty>,)+);
            type Refs<'a> = ($(&'a mut $ty,)+);

            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$ty>()),+]
            }

            unsafe fn pools(registry: *mut Registry) -> Option<Self::Pools> {
                unsafe { Some(($((*registry).sparse_set_mut::<$ty>()?.raw_parts(),)+)) }
            }

            unsafe fn driving_packed<'a>(pools: &Self::Pools) -> &'a [Entity] {
                // The pool parts are distinct types, so pick the smallest by
                // comparing the packed slices themselves.
                let mut driving = unsafe { pools.0.packed_slice() };
                $(
                    if pools.$idx.len() < driving.len() {
                        driving = unsafe { pools.$idx.packed_slice() };
                    }
                )+
                driving
            }

            unsafe fn contains_all(pools: &Self::Pools, entity: Entity) -> bool {
                unsafe { $(pools.$idx.contains(entity))&&+ }
            }

            unsafe fn fetch<'a>(pools: &Self::Pools, entity: Entity) -> Self::Refs<'a> {
                unsafe { ($(pools.$idx.fetch(entity),)+) }
            }
        }
    };
}

impl_component_set!((A, 0));
impl_component_set!((A, 0), (B, 1));
impl_component_set!((A, 0), (B, 1), (C, 2));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3));

fn assert_distinct_types(type_ids: &[TypeId]) {
    debug_assert!(
        type_ids
            .iter()
            .all(|t| type_ids.iter().filter(|u| *u == t).count() == 1),
        "a view must not name the same component type twice"
    );
}

fn is_excluded(exclude: &[*const dyn ErasedPool], entity: Entity) -> bool {
    exclude.iter().any(|&pool| unsafe { (*pool).contains(entity) })
}

/// Synchronous filtered iteration over entities holding every type in `C`.
pub struct View<'a, C: ComponentSet> {
    registry: &'a mut Registry,
    excluded: Vec<TypeId>,
    _set: PhantomData<fn() -> C>,
}

impl<'a, C: ComponentSet> View<'a, C> {
    pub(crate) fn new(registry: &'a mut Registry) -> Self {
        assert_distinct_types(&C::type_ids());
        Self { registry, excluded: Vec::new(), _set: PhantomData }
    }

    /// Rejects entities holding *any* component type in `E`.
    ///
    /// Excluded types whose pool has never been created are ignored.
    #[must_use]
    pub fn exclude<E: ComponentSet>(mut self) -> Self {
        self.excluded.extend(E::type_ids());
        self
    }

    /// Iterates matching entities on the calling thread.
    ///
    /// Visits exactly the entities holding every included type and none of
    /// the excluded ones, independent of insertion order. Iteration order
    /// follows the driving pool's dense array and is not stable across
    /// removals.
    pub fn each<F>(self, mut f: F)
    where
        F: for<'r> FnMut(Entity, C::Refs<'r>),
    {
        let registry: *mut Registry = self.registry;
        let exclude: Vec<*const dyn ErasedPool> = self
            .excluded
            .iter()
            .filter_map(|&type_key| unsafe { (*registry).erased_pool_ptr(type_key) })
            .collect();
        let Some(pools) = (unsafe { C::pools(registry) }) else {
            return;
        };

        let driving = unsafe { C::driving_packed(&pools) };
        for &entity in driving {
            if unsafe { C::contains_all(&pools, entity) } && !is_excluded(&exclude, entity) {
                f(entity, unsafe { C::fetch(&pools, entity) });
            }
        }
    }
}

/// Captured pool state shared with rayon workers for one `each` call.
struct FrozenPools<'a, C: ComponentSet> {
    pools: C::Pools,
    exclude: &'a [*const dyn ErasedPool],
}

// Raw pool pointers cross worker threads. Sound because structure is frozen
// for the duration of the call and chunk workers fetch disjoint entities.
unsafe impl<C: ComponentSet> Sync for FrozenPools<'_, C> {}

// Workers go through these methods rather than the fields: edition 2021
// closures capture fields individually, and only a whole-struct capture
// carries the `Sync` impl above across the rayon dispatch.
impl<C: ComponentSet> FrozenPools<'_, C> {
    /// Whether `entity` holds every included type and none of the excluded.
    ///
    /// ## Safety
    /// Structure must be frozen.
    unsafe fn matches(&self, entity: Entity) -> bool {
        unsafe { C::contains_all(&self.pools, entity) && !is_excluded(self.exclude, entity) }
    }

    /// Mutable references to `entity`'s components.
    ///
    /// ## Safety
    /// `entity` must match, structure must be frozen, and no other
    /// references to the same dense slots may live.
    unsafe fn fetch<'r>(&self, entity: Entity) -> C::Refs<'r> {
        unsafe { C::fetch(&self.pools, entity) }
    }
}

/// Chunked parallel counterpart of [`View`].
pub struct ParallelView<'a, C: ComponentSet> {
    registry: &'a mut Registry,
    excluded: Vec<TypeId>,
    _set: PhantomData<fn() -> C>,
}

impl<'a, C: ComponentSet> ParallelView<'a, C> {
    pub(crate) fn new(registry: &'a mut Registry) -> Self {
        assert_distinct_types(&C::type_ids());
        Self { registry, excluded: Vec::new(), _set: PhantomData }
    }

    /// Rejects entities holding *any* component type in `E`.
    #[must_use]
    pub fn exclude<E: ComponentSet>(mut self) -> Self {
        self.excluded.extend(E::type_ids());
        self
    }

    /// Iterates matching entities across rayon workers, joining before
    /// returning.
    ///
    /// The driving dense array is split into contiguous chunks of roughly
    /// `len / worker count` entities; each worker filters and visits only
    /// its own chunk. No ordering is guaranteed across chunks.
    pub fn each<F>(self, f: F)
    where
        F: for<'r> Fn(Entity, C::Refs<'r>) + Send + Sync,
    {
        let registry: *mut Registry = self.registry;
        let exclude: Vec<*const dyn ErasedPool> = self
            .excluded
            .iter()
            .filter_map(|&type_key| unsafe { (*registry).erased_pool_ptr(type_key) })
            .collect();
        let Some(pools) = (unsafe { C::pools(registry) }) else {
            return;
        };

        let driving = unsafe { C::driving_packed(&pools) };
        if driving.is_empty() {
            return;
        }

        let chunk_size = (driving.len() / rayon::current_num_threads()).max(1);
        let frozen = FrozenPools::<C> { pools, exclude: &exclude };

        driving.par_chunks(chunk_size).for_each(|chunk| {
            for &entity in chunk {
                if unsafe { frozen.matches(entity) } {
                    f(entity, unsafe { frozen.fetch(entity) });
                }
            }
        });
    }

    /// Runs [`ParallelView::each`] inside a caller-provided rayon pool.
    pub fn each_in<F>(self, pool: &rayon::ThreadPool, f: F)
    where
        F: for<'r> Fn(Entity, C::Refs<'r>) + Send + Sync,
    {
        pool.install(move || self.each(f));
    }
}
