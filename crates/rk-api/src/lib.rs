//! Entity Identity Layer
//!
//! This crate exposes host entities to callers:
//! - Reference-counted handles that turn stale when the host deletes their entity
//! - Capability queries by string identifier, with typed views
//! - Collections with sentinel-returning index, name and id lookup
//! - Assembly-context proxies bound to occurrence paths
//! - Persistent entity tokens scoped to a design
//!
//! Absence is reported as `None`/`false`. The `try_*` variants return
//! [`ApiError`] naming the reason instead.

pub mod capability;
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod handle;
pub mod proxy;
pub mod token;
pub mod views;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use capability::{Capability, CapabilityRegistry, Condition};
pub use collection::{CollectionIter, EntityCollection};
pub use config::{ApiConfig, NameMatching};
pub use document::Document;
pub use error::{ApiError, ApiResult};
pub use handle::Handle;
pub use proxy::{EntityRef, dedup_equivalent};
pub use views::{FaceView, Named, SampledCurveView, SketchPointView, Suppressible, TypedView};
