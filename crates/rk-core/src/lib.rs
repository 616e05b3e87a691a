//! Host Document Model
//!
//! This crate provides the host side that entity handles point into:
//! - Designs owning component definitions and an occurrence tree
//! - Generational entity storage with stale-key detection
//! - Undo of entity deletion
//! - Curve samplers evaluated on worker threads
//! - RON persistence of designs

pub mod component;
pub mod constants;
pub mod design;
pub mod entity;
pub mod occurrence;
pub mod sampling;
pub mod store;

// Re-exports for convenience
pub use component::{ComponentDefinition, ComponentId};
pub use design::{Design, DesignError, DesignId, DesignResult, PathInfo};
pub use entity::{EntityId, EntityKind, EntityRecord, PropertyValue};
pub use occurrence::{Occurrence, OccurrenceId, OccurrencePath};
pub use sampling::{CurveSampler, sample_parallel};
pub use store::{EntityStore, SlotKey};
