//! Capability registry
//!
//! Maps each entity type id to the capability ids its entities may be
//! viewed as. A capability carries a [`Condition`] checked against live host
//! state at query time, so an entity can gain or lose a capability as the
//! design changes (a curve is only a `rk::SampledCurve` while a sampler is
//! attached). New revisions of a capability are registered under a new id
//! (`rk::FeatureV2`) instead of changing an existing one.

use std::collections::HashMap;

use rk_core::{Design, EntityKind, EntityRecord, SlotKey};

/// Built-in capability ids
pub mod ids {
    /// Every entity
    pub const BASE: &str = "rk::Base";
    /// Entities with a user-visible name
    pub const NAMED: &str = "rk::Named";
    /// B-Rep topology that can be picked in a selection
    pub const SELECTABLE: &str = "rk::Selectable";
    /// Features that can be suppressed
    pub const SUPPRESSIBLE: &str = "rk::Suppressible";
    /// Sketch points and curves
    pub const SKETCH_ENTITY: &str = "rk::SketchEntity";
    /// Sketch curves with an attached sampler
    pub const SAMPLED_CURVE: &str = "rk::SampledCurve";
    /// Second revision of the feature interface, committed features only
    pub const FEATURE_V2: &str = "rk::FeatureV2";
}

/// When an entity implements a capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// Only committed entities
    Persisted,
    /// Only while a curve sampler is attached
    HasSampler,
    /// Only while the named property is set
    HasProperty(String),
}

impl Condition {
    fn holds(&self, design: &Design, key: SlotKey, record: &EntityRecord) -> bool {
        match self {
            Condition::Always => true,
            Condition::Persisted => record.persisted,
            Condition::HasSampler => design.sampler(key).is_some(),
            Condition::HasProperty(name) => record.property(name).is_some(),
        }
    }
}

/// A capability id and the condition under which it is implemented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub id: String,
    pub condition: Condition,
}

impl Capability {
    /// Capability implemented unconditionally
    pub fn always(id: impl Into<String>) -> Self {
        Self::when(id, Condition::Always)
    }

    pub fn when(id: impl Into<String>, condition: Condition) -> Self {
        Self {
            id: id.into(),
            condition,
        }
    }
}

/// Capabilities known per entity type id
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    by_type: HashMap<String, Vec<Capability>>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in capabilities of every entity kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in EntityKind::all() {
            let type_id = kind.type_id();
            registry.register(type_id, Capability::always(type_id));
            registry.register(type_id, Capability::always(ids::BASE));
            registry.register(type_id, Capability::always(ids::NAMED));

            match kind {
                EntityKind::Body | EntityKind::Face | EntityKind::Edge => {
                    registry.register(type_id, Capability::always(ids::SELECTABLE));
                }
                EntityKind::Feature => {
                    registry.register(type_id, Capability::always(ids::SUPPRESSIBLE));
                    registry.register(
                        type_id,
                        Capability::when(ids::FEATURE_V2, Condition::Persisted),
                    );
                }
                EntityKind::SketchPoint => {
                    registry.register(type_id, Capability::always(ids::SKETCH_ENTITY));
                }
                EntityKind::SketchCurve => {
                    registry.register(type_id, Capability::always(ids::SKETCH_ENTITY));
                    registry.register(
                        type_id,
                        Capability::when(ids::SAMPLED_CURVE, Condition::HasSampler),
                    );
                }
                EntityKind::Sketch | EntityKind::ConstructionPlane => {}
            }
        }
        registry
    }

    /// Register a capability for a type; false if the id is already registered
    pub fn register(&mut self, type_id: impl Into<String>, capability: Capability) -> bool {
        let entries = self.by_type.entry(type_id.into()).or_default();
        if entries.iter().any(|c| c.id == capability.id) {
            return false;
        }
        entries.push(capability);
        true
    }

    /// Capabilities registered for a type, in registration order
    pub fn capabilities_of(&self, type_id: &str) -> &[Capability] {
        self.by_type.get(type_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the entity implements `capability` right now
    ///
    /// An entity always implements its own type id.
    pub fn supports(
        &self,
        design: &Design,
        key: SlotKey,
        record: &EntityRecord,
        capability: &str,
    ) -> bool {
        let type_id = record.kind.type_id();
        if capability == type_id {
            return true;
        }
        self.capabilities_of(type_id)
            .iter()
            .find(|c| c.id == capability)
            .is_some_and(|c| c.condition.holds(design, key, record))
    }
}
