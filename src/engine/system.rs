//! System abstraction for scheduled logic.
//!
//! A system is a named unit of behaviour that reads and mutates the
//! registry. Most callers register plain closures with the scheduler; the
//! [`System`] trait exists for stateful systems that carry configuration
//! or scratch buffers across frames.

use crate::engine::entity::Entity;
use crate::engine::error::MissingComponentError;
use crate::engine::registry::Registry;
use crate::engine::types::Component;

/// A named unit of logic executed by the scheduler.
pub trait System: Send {
    /// Unique name used for dependency edges and diagnostics.
    fn name(&self) -> &str;

    /// Runs the system against the registry.
    ///
    /// The exclusive borrow lets a system build [`Registry::view`]s as well
    /// as perform structural work; systems execute serially, so no other
    /// registry access is in flight.
    fn run(&mut self, registry: &mut Registry);
}

/// Asserts that `entity` holds component `T`, for use at the top of a
/// system body as a precondition check.
///
/// # Errors
///
/// Returns a [`MissingComponentError`] naming the system, the component
/// type, and the entity when the component is absent.
pub fn require_component<T: Component>(
    registry: &Registry,
    entity: Entity,
    system: &str,
) -> Result<(), MissingComponentError> {
    if registry.has_component::<T>(entity) {
        Ok(())
    } else {
        Err(MissingComponentError {
            system: system.to_string(),
            component: std::any::type_name::<T>(),
            entity,
        })
    }
}
