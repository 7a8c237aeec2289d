//! Error types for entity lifecycle, storage, scheduling, and snapshots.
//!
//! This module declares focused, composable error types used across the
//! entity-component storage pipeline. Each error carries enough context to
//! make failures actionable while remaining small and cheap to pass around or
//! convert into higher-level variants like [`EcsError`].
//!
//! ## Taxonomy
//!
//! * **Programming errors** ([`EcsError`]) — misuse such as touching a dead
//!   entity, fetching an absent component, or re-inserting a component the
//!   entity already holds. Reported synchronously to the caller and always
//!   recoverable by the caller.
//! * **Configuration errors** ([`ScheduleError`]) — a missing or cyclic
//!   dependency in the system graph, detected at schedule-build time.
//!   [`SystemScheduler::run`](crate::engine::scheduler::SystemScheduler::run)
//!   executes *no* system when the graph is invalid.
//! * **Capacity errors** ([`CapacityError`]) — entity index space exhaustion,
//!   surfaced rather than silently wrapped.
//! * **Deferred failures** ([`CommandError`]) — raised on the thread that
//!   flushes a command buffer, never on the thread that queued the command.
//!
//! Presentation of failures (crash, log, retry) is the surrounding
//! application's decision; nothing in this crate aborts the process.

use thiserror::Error;

use crate::engine::entity::Entity;

/// Returned when the allocator cannot satisfy a request for more entity
/// slots because the index space is exhausted.
///
/// ### Fields
/// * `entities_needed` — total number of slots the operation attempted to
///   create or accommodate.
/// * `capacity` — the upper bound that prevented the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entity index space exhausted ({entities_needed} needed; capacity {capacity})")]
pub struct CapacityError {
    /// Total entity slots the operation attempted to allocate.
    pub entities_needed: u64,

    /// Current capacity limiting the operation.
    pub capacity: u64,
}

/// Aggregate error for registry and sparse-set operations.
///
/// Every variant is a caller-recoverable programming error except
/// [`EcsError::Capacity`], which reports index-space exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// An entity handle was stale or referred to a despawned entity.
    #[error("entity {0:?} is dead or stale")]
    DeadEntity(Entity),

    /// A component lookup failed because the entity does not hold it.
    #[error("entity {entity:?} does not have component {component}")]
    MissingComponent {
        /// Entity the lookup targeted.
        entity: Entity,
        /// Human-readable component type name.
        component: &'static str,
    },

    /// A component insert was rejected because the entity already holds it.
    ///
    /// Duplicate inserts are an explicit error, not a silent overwrite.
    #[error("entity {entity:?} already has component {component}")]
    DuplicateComponent {
        /// Entity the insert targeted.
        entity: Entity,
        /// Human-readable component type name.
        component: &'static str,
    },

    /// A deferred command referenced a placeholder that no spawn resolved.
    #[error("unresolved placeholder handle {0:?}")]
    UnresolvedPlaceholder(Entity),

    /// Entity index space was exhausted.
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

/// Returned when a deferred command fails during a flush.
///
/// The failure surfaces on the flushing thread; the remainder of that flush
/// is aborted because later commands may depend on placeholder resolution
/// performed by earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("deferred command at queue position {position} failed: {source}")]
pub struct CommandError {
    /// Zero-based position of the failing command in the flush order.
    pub position: usize,

    /// The underlying registry failure.
    #[source]
    pub source: EcsError,
}

/// Configuration errors raised by the system scheduler.
///
/// Registration errors (`DuplicateSystem`, `UnknownSystem`) are reported at
/// call time; graph errors (`MissingDependency`, `DependencyCycle`) are
/// detected when the execution order is rebuilt, before any system runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A system was registered under a name that is already taken.
    #[error("system '{0}' is already registered")]
    DuplicateSystem(String),

    /// An operation referenced a system name that is not registered.
    #[error("system '{0}' is not registered")]
    UnknownSystem(String),

    /// A system lists a dependency that is not registered.
    #[error("system '{system}' depends on unregistered system '{dependency}'")]
    MissingDependency {
        /// System declaring the dependency.
        system: String,
        /// The unregistered dependency name.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    #[error("circular dependency detected in system graph")]
    DependencyCycle,
}

/// Errors raised by the prefab manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefabError {
    /// Instantiation referenced an unregistered prefab name.
    #[error("prefab '{0}' is not registered")]
    NotFound(String),

    /// Spawning the template's entity failed.
    #[error(transparent)]
    Spawn(#[from] EcsError),
}

/// Raised by [`require_component`](crate::engine::system::require_component)
/// when a system's component precondition does not hold.
///
/// Carries the system name, the component type name, and the offending
/// entity so the failure is actionable without reproduction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("system '{system}' requires component {component} on entity {entity:?}")]
pub struct MissingComponentError {
    /// Name of the system whose precondition failed.
    pub system: String,

    /// Human-readable component type name.
    pub component: &'static str,

    /// Entity missing the component.
    pub entity: Entity,
}

/// Errors raised while writing or reading registry snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot header line is missing or malformed.
    #[error("missing or malformed snapshot header")]
    MalformedHeader,

    /// The snapshot declares a version this build cannot read.
    #[error("unsupported snapshot version '{0}'")]
    UnsupportedVersion(String),

    /// A snapshot line could not be parsed.
    #[error("malformed snapshot record at line {line}: {text}")]
    MalformedRecord {
        /// One-based line number of the offending record.
        line: usize,
        /// The offending line text.
        text: String,
    },

    /// A `component` record appeared before any `entity` record.
    #[error("component record at line {0} has no preceding entity record")]
    OrphanComponent(usize),

    /// A component payload could not be decoded.
    #[error("invalid payload for component {component}: {reason}")]
    InvalidPayload {
        /// Component name from the snapshot record.
        component: String,
        /// Serializer-provided description of the problem.
        reason: String,
    },

    /// The underlying byte stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A registry operation failed while restoring.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}
