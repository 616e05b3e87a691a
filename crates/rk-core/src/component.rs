//! Component definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityId;
use crate::occurrence::OccurrenceId;

/// Identifier of a component definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub Uuid);

impl ComponentId {
    /// Create a fresh component ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A reusable definition that may be instantiated by several occurrences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub id: ComponentId,
    pub name: String,
    /// Entities owned by this component, in model order
    pub(crate) entities: Vec<EntityId>,
    /// Child occurrences placed inside this component, in insertion order
    pub(crate) occurrences: Vec<OccurrenceId>,
}

impl ComponentDefinition {
    /// Create a new empty component definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ComponentId::new(),
            name: name.into(),
            entities: Vec::new(),
            occurrences: Vec::new(),
        }
    }

    /// Entities owned by this component, in model order
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Child occurrences, in insertion order
    pub fn occurrences(&self) -> &[OccurrenceId] {
        &self.occurrences
    }
}
