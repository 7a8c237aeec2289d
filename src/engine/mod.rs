//! # Engine Module
//!
//! Internal ECS engine implementation.
//!
//! This module contains all core ECS building blocks such as:
//! - Entity allocation and lifecycle
//! - Sparse-set component storage
//! - Filtered and parallel views
//! - Deferred command buffers
//! - Signals, relationships, prefabs
//! - Scheduling and snapshot serialization
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod entity;
pub mod storage;
pub mod signal;
pub mod relationship;
pub mod registry;
pub mod view;
pub mod command;
pub mod prefab;
pub mod system;
pub mod scheduler;
pub mod serialization;
