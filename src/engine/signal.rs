//! Construct/destroy signal dispatch for component lifecycle events.
//!
//! The registry fires a *construct* signal after a component is inserted and
//! a *destroy* signal before a component is removed. Callbacks are invoked
//! synchronously, in registration order, on the caller's thread.
//!
//! ## Locking discipline
//!
//! Callback lists live behind a single mutex. Dispatch clones the relevant
//! list (cheap `Arc` clones) before invoking anything, so no lock is held
//! while user code runs — a callback may therefore register further
//! callbacks without deadlocking.
//!
//! ## Known limitation
//!
//! There is no unregister-by-id: once registered, a callback lives for the
//! dispatcher's lifetime.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::entity::Entity;

/// Callback invoked with the entity whose component was constructed or is
/// about to be destroyed.
pub type SignalFn = dyn Fn(Entity) + Send + Sync;

#[derive(Default)]
struct SignalLists {
    construct: HashMap<TypeId, Vec<Arc<SignalFn>>>,
    destroy: HashMap<TypeId, Vec<Arc<SignalFn>>>,
}

/// Per-component-type construct/destroy callback lists.
#[derive(Default)]
pub struct SignalDispatcher {
    lists: Mutex<SignalLists>,
}

impl SignalDispatcher {
    /// Creates a dispatcher with no registered callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a construct callback for the component type `type_key`.
    pub fn register_construct(&self, type_key: TypeId, callback: Arc<SignalFn>) {
        self.lists.lock().construct.entry(type_key).or_default().push(callback);
    }

    /// Appends a destroy callback for the component type `type_key`.
    pub fn register_destroy(&self, type_key: TypeId, callback: Arc<SignalFn>) {
        self.lists.lock().destroy.entry(type_key).or_default().push(callback);
    }

    /// Invokes construct callbacks for `type_key`, in registration order.
    pub fn dispatch_construct(&self, type_key: TypeId, entity: Entity) {
        let callbacks = {
            let lists = self.lists.lock();
            lists.construct.get(&type_key).cloned().unwrap_or_default()
        };
        for callback in &callbacks {
            callback(entity);
        }
    }

    /// Invokes destroy callbacks for `type_key`, in registration order.
    pub fn dispatch_destroy(&self, type_key: TypeId, entity: Entity) {
        let callbacks = {
            let lists = self.lists.lock();
            lists.destroy.get(&type_key).cloned().unwrap_or_default()
        };
        for callback in &callbacks {
            callback(entity);
        }
    }

    /// Drops every registered callback.
    pub fn clear(&self) {
        let mut lists = self.lists.lock();
        lists.construct.clear();
        lists.destroy.clear();
    }
}
