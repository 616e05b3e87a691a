//! Design (root document) owning components, occurrences and entities
//!
//! All entity creation and destruction goes through the edit methods here.
//! Nothing outside the host constructs or frees entity storage.

mod persist;
mod tree;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::{ComponentDefinition, ComponentId};
use crate::constants::ROOT_COMPONENT_NAME;
use crate::entity::{EntityId, EntityKind, EntityRecord};
use crate::occurrence::{Occurrence, OccurrenceId};
use crate::sampling::CurveSampler;
use crate::store::{EntityStore, SlotKey};

pub use tree::PathInfo;

/// Identifier of a design; tokens are scoped to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesignId(pub Uuid);

impl DesignId {
    /// Create a fresh design ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DesignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DesignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Samplers attached to sketch curves (runtime state only)
#[derive(Clone, Default)]
struct Samplers(HashMap<EntityId, Arc<dyn CurveSampler>>);

impl fmt::Debug for Samplers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// A deleted entity kept for undo, with its former model-order position
#[derive(Debug, Clone)]
struct DeletedEntity {
    record: EntityRecord,
    position: usize,
}

/// Root document
#[derive(Debug)]
pub struct Design {
    pub id: DesignId,
    pub name: String,
    root: ComponentId,
    pub(crate) components: HashMap<ComponentId, ComponentDefinition>,
    pub(crate) occurrences: HashMap<OccurrenceId, Occurrence>,
    pub(crate) store: EntityStore,
    /// Undo stack of deletions
    deleted: Vec<DeletedEntity>,
    samplers: Samplers,
    /// Random per-session value, redrawn whenever a design is loaded
    session: u32,
    /// Bumped on every edit
    revision: u64,
}

impl Default for Design {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Design {
    /// Create a new design with an empty root component
    pub fn new(name: impl Into<String>) -> Self {
        let root = ComponentDefinition::new(ROOT_COMPONENT_NAME);
        let root_id = root.id;
        let mut components = HashMap::new();
        components.insert(root_id, root);
        Self::from_parts(
            DesignId::new(),
            name.into(),
            root_id,
            components,
            HashMap::new(),
            EntityStore::new(),
        )
    }

    pub(crate) fn from_parts(
        id: DesignId,
        name: String,
        root: ComponentId,
        components: HashMap<ComponentId, ComponentDefinition>,
        occurrences: HashMap<OccurrenceId, Occurrence>,
        store: EntityStore,
    ) -> Self {
        Self {
            id,
            name,
            root,
            components,
            occurrences,
            store,
            deleted: Vec::new(),
            samplers: Samplers::default(),
            session: new_session(),
            revision: 0,
        }
    }

    /// The root component (never instantiated by an occurrence)
    pub fn root_component(&self) -> ComponentId {
        self.root
    }

    /// Random value identifying the current session of this design
    pub fn session(&self) -> u32 {
        self.session
    }

    /// Edit counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ============== Components ==============

    /// Get a component by ID
    pub fn component(&self, id: ComponentId) -> Option<&ComponentDefinition> {
        self.components.get(&id)
    }

    /// Iterate over all components
    pub fn components(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.components.values()
    }

    /// Add a new component definition
    pub fn add_component(&mut self, name: impl Into<String>) -> DesignResult<ComponentId> {
        let name = name.into();
        if name.is_empty() {
            return Err(DesignError::EmptyName);
        }
        let component = ComponentDefinition::new(name);
        let id = component.id;
        tracing::debug!("Added component {} ({})", component.name, id);
        self.components.insert(id, component);
        self.touch();
        Ok(id)
    }

    // ============== Entities ==============

    /// Entity storage
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Get a live entity by key
    pub fn entity(&self, key: SlotKey) -> Option<&EntityRecord> {
        self.store.get(key)
    }

    /// Get a live entity for editing
    pub fn entity_mut(&mut self, key: SlotKey) -> Option<&mut EntityRecord> {
        if !self.store.contains(key) {
            return None;
        }
        self.touch();
        self.store.get_mut(key)
    }

    /// Current key of a live entity
    pub fn key_of(&self, id: EntityId) -> Option<SlotKey> {
        self.store.key_of(id)
    }

    /// Create a persisted entity in a component
    pub fn create_entity(
        &mut self,
        component: ComponentId,
        kind: EntityKind,
        name: impl Into<String>,
    ) -> DesignResult<SlotKey> {
        self.add_entity(EntityRecord::new(kind, name, component))
    }

    /// Create a transient entity (construction state, not yet committed)
    pub fn begin_entity(
        &mut self,
        component: ComponentId,
        kind: EntityKind,
        name: impl Into<String>,
    ) -> DesignResult<SlotKey> {
        let mut record = EntityRecord::new(kind, name, component);
        record.persisted = false;
        self.add_entity(record)
    }

    /// Add a fully built record to its component
    ///
    /// Names must be non-empty and unique among entities of the same kind in
    /// the same component. The record's ID must not be live already.
    pub fn add_entity(&mut self, record: EntityRecord) -> DesignResult<SlotKey> {
        if record.name.is_empty() {
            return Err(DesignError::EmptyName);
        }
        if self.store.key_of(record.id).is_some() {
            return Err(DesignError::DuplicateId(record.id));
        }
        if self.find_entity(record.component, record.kind, &record.name).is_some() {
            return Err(DesignError::DuplicateName(record.name));
        }
        let component = self
            .components
            .get_mut(&record.component)
            .ok_or(DesignError::ComponentNotFound(record.component))?;

        component.entities.push(record.id);
        tracing::debug!("Created {} {}", record.kind.type_id(), record.name);
        let key = self.store.insert(record);
        self.touch();
        Ok(key)
    }

    /// Find a live entity by exact name
    pub fn find_entity(
        &self,
        component: ComponentId,
        kind: EntityKind,
        name: &str,
    ) -> Option<SlotKey> {
        self.entities_of(component, Some(kind))
            .into_iter()
            .find(|key| self.store.get(*key).is_some_and(|r| r.name == name))
    }

    /// Commit a transient entity
    pub fn commit_entity(&mut self, key: SlotKey) -> DesignResult<()> {
        let record = self
            .store
            .get_mut(key)
            .ok_or(DesignError::StaleKey(key))?;
        record.persisted = true;
        self.touch();
        Ok(())
    }

    /// Delete an entity; every key to it is stale afterwards
    pub fn delete_entity(&mut self, key: SlotKey) -> DesignResult<EntityRecord> {
        let record = self.store.remove(key).ok_or(DesignError::StaleKey(key))?;

        let mut position = 0;
        if let Some(component) = self.components.get_mut(&record.component)
            && let Some(index) = component.entities.iter().position(|id| *id == record.id)
        {
            component.entities.remove(index);
            position = index;
        }
        self.samplers.0.remove(&record.id);

        tracing::debug!("Deleted {} {}", record.kind.type_id(), record.name);
        self.deleted.push(DeletedEntity {
            record: record.clone(),
            position,
        });
        self.touch();
        Ok(record)
    }

    /// Restore the most recently deleted entity under its original ID
    ///
    /// The restored entity gets a new key; keys from before the deletion
    /// stay stale. Fails without consuming the undo entry if the name has
    /// been taken in the meantime.
    pub fn undo_delete(&mut self) -> DesignResult<SlotKey> {
        let last = self.deleted.last().ok_or(DesignError::NothingToUndo)?;
        let record = &last.record;
        if !self.components.contains_key(&record.component) {
            return Err(DesignError::ComponentNotFound(record.component));
        }
        if self.find_entity(record.component, record.kind, &record.name).is_some() {
            return Err(DesignError::DuplicateName(record.name.clone()));
        }

        let Some(DeletedEntity { record, position }) = self.deleted.pop() else {
            return Err(DesignError::NothingToUndo);
        };
        let Some(component) = self.components.get_mut(&record.component) else {
            return Err(DesignError::ComponentNotFound(record.component));
        };
        let position = position.min(component.entities.len());
        component.entities.insert(position, record.id);

        tracing::debug!("Restored {} {}", record.kind.type_id(), record.name);
        let key = self.store.insert(record);
        self.touch();
        Ok(key)
    }

    /// Live entity keys of a component in model order, optionally filtered by kind
    pub fn entities_of(&self, component: ComponentId, kind: Option<EntityKind>) -> Vec<SlotKey> {
        let Some(component) = self.components.get(&component) else {
            return Vec::new();
        };
        component
            .entities
            .iter()
            .filter_map(|id| self.store.key_of(*id))
            .filter(|key| {
                kind.is_none_or(|kind| self.store.get(*key).is_some_and(|r| r.kind == kind))
            })
            .collect()
    }

    // ============== Samplers ==============

    /// Attach a sampler to a sketch curve
    pub fn attach_sampler(
        &mut self,
        key: SlotKey,
        sampler: Arc<dyn CurveSampler>,
    ) -> DesignResult<()> {
        let record = self.store.get(key).ok_or(DesignError::StaleKey(key))?;
        if record.kind != EntityKind::SketchCurve {
            return Err(DesignError::UnsupportedKind(record.kind));
        }
        self.samplers.0.insert(record.id, sampler);
        self.touch();
        Ok(())
    }

    /// Detach a sampler; returns whether one was attached
    pub fn detach_sampler(&mut self, key: SlotKey) -> bool {
        let Some(id) = self.store.get(key).map(|r| r.id) else {
            return false;
        };
        let removed = self.samplers.0.remove(&id).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Sampler attached to a live entity
    pub fn sampler(&self, key: SlotKey) -> Option<Arc<dyn CurveSampler>> {
        let id = self.store.get(key)?.id;
        self.samplers.0.get(&id).cloned()
    }
}

fn new_session() -> u32 {
    Uuid::new_v4().as_u128() as u32
}

/// Result type for design edits
pub type DesignResult<T> = Result<T, DesignError>;

/// Design-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum DesignError {
    #[error("Component not found: {0}")]
    ComponentNotFound(ComponentId),
    #[error("Occurrence not found: {0}")]
    OccurrenceNotFound(OccurrenceId),
    #[error("Entity key is stale: {0}")]
    StaleKey(SlotKey),
    #[error("Name must not be empty")]
    EmptyName,
    #[error("Name already in use: {0}")]
    DuplicateName(String),
    #[error("Entity already exists: {0}")]
    DuplicateId(EntityId),
    #[error("Occurrence would create a cycle")]
    WouldCreateCycle,
    #[error("The root component cannot be instantiated")]
    CannotInstantiateRoot,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Unsupported entity kind: {0:?}")]
    UnsupportedKind(EntityKind),
    #[error("Unsupported file format version: {0}")]
    UnsupportedVersion(u32),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
