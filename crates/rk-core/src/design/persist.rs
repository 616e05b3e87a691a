//! Design file serialization

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Design, DesignError, DesignId, DesignResult};
use crate::component::{ComponentDefinition, ComponentId};
use crate::constants::FILE_FORMAT_VERSION;
use crate::entity::EntityRecord;
use crate::occurrence::{Occurrence, OccurrenceId};
use crate::store::EntityStore;

/// On-disk form of a design
///
/// Only committed entities are written. Samplers, the undo stack and the
/// session value are runtime state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DesignData {
    version: u32,
    id: DesignId,
    name: String,
    root: ComponentId,
    components: Vec<ComponentDefinition>,
    occurrences: Vec<Occurrence>,
    entities: Vec<EntityRecord>,
}

impl From<&Design> for DesignData {
    fn from(design: &Design) -> Self {
        let mut entities = Vec::new();
        let components = design
            .components
            .values()
            .map(|component| {
                let mut component = component.clone();
                component.entities.retain(|id| {
                    match design.store.get_by_id(*id).filter(|r| r.persisted) {
                        Some(record) => {
                            entities.push(record.clone());
                            true
                        }
                        None => false,
                    }
                });
                component
            })
            .collect();

        Self {
            version: FILE_FORMAT_VERSION,
            id: design.id,
            name: design.name.clone(),
            root: design.root,
            components,
            occurrences: design.occurrences.values().cloned().collect(),
            entities,
        }
    }
}

impl TryFrom<DesignData> for Design {
    type Error = DesignError;

    fn try_from(data: DesignData) -> Result<Self, Self::Error> {
        if data.version != FILE_FORMAT_VERSION {
            return Err(DesignError::UnsupportedVersion(data.version));
        }

        let mut components: HashMap<ComponentId, ComponentDefinition> =
            data.components.into_iter().map(|c| (c.id, c)).collect();
        if !components.contains_key(&data.root) {
            return Err(DesignError::ComponentNotFound(data.root));
        }

        let mut store = EntityStore::new();
        for record in data.entities {
            if components.contains_key(&record.component) {
                store.insert(record);
            } else {
                tracing::warn!(
                    "Dropping entity {} owned by missing component {}",
                    record.name,
                    record.component
                );
            }
        }
        let mut listed_entities = HashSet::new();
        for component in components.values_mut() {
            let owner = component.id;
            component.entities.retain(|id| {
                store.get_by_id(*id).is_some_and(|r| r.component == owner)
                    && listed_entities.insert(*id)
            });
        }

        // Occurrence lists are rebuilt below, parents before children
        let mut listed: HashMap<ComponentId, Vec<OccurrenceId>> = components
            .values_mut()
            .map(|c| (c.id, std::mem::take(&mut c.occurrences)))
            .collect();
        let mut pending: HashMap<OccurrenceId, Occurrence> =
            data.occurrences.into_iter().map(|o| (o.id, o)).collect();

        let root = data.root;
        let mut design = Design::from_parts(
            data.id,
            data.name,
            root,
            components,
            HashMap::new(),
            store,
        );

        let mut queue = VecDeque::from([root]);
        loop {
            let Some(parent) = queue
                .pop_front()
                .or_else(|| listed.keys().next().copied())
            else {
                break;
            };
            let Some(ids) = listed.remove(&parent) else {
                continue;
            };
            for id in ids {
                let Some(occurrence) = pending.remove(&id) else {
                    continue;
                };
                if let Err(e) = design.check_loaded_occurrence(parent, &occurrence) {
                    tracing::warn!("Dropping occurrence {}: {}", occurrence.name, e);
                    continue;
                }
                queue.push_back(occurrence.component);
                if let Some(definition) = design.components.get_mut(&parent) {
                    definition.occurrences.push(id);
                }
                design.occurrences.insert(id, occurrence);
            }
        }
        for occurrence in pending.values() {
            tracing::warn!(
                "Dropping occurrence {} not listed by its parent",
                occurrence.name
            );
        }

        Ok(design)
    }
}

impl Design {
    /// Validate an occurrence read from a file against what is loaded so far
    fn check_loaded_occurrence(
        &self,
        parent: ComponentId,
        occurrence: &Occurrence,
    ) -> DesignResult<()> {
        if occurrence.parent != parent || !self.components.contains_key(&parent) {
            return Err(DesignError::ComponentNotFound(occurrence.parent));
        }
        if !self.components.contains_key(&occurrence.component) {
            return Err(DesignError::ComponentNotFound(occurrence.component));
        }
        if occurrence.component == self.root_component() {
            return Err(DesignError::CannotInstantiateRoot);
        }
        if self.contains_component(occurrence.component, parent) {
            return Err(DesignError::WouldCreateCycle);
        }
        Ok(())
    }
}

impl Serialize for Design {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        DesignData::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Design {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = DesignData::deserialize(deserializer)?;
        Design::try_from(data).map_err(serde::de::Error::custom)
    }
}

impl Design {
    /// Save design to a file
    pub fn save(&self, path: impl AsRef<Path>) -> DesignResult<()> {
        let content = self.to_bytes()?;
        std::fs::write(path.as_ref(), content).map_err(|e| DesignError::Io(e.to_string()))?;
        Ok(())
    }

    /// Serialize design to bytes
    pub fn to_bytes(&self) -> DesignResult<Vec<u8>> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| DesignError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load design from a file
    pub fn load(path: impl AsRef<Path>) -> DesignResult<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| DesignError::Io(e.to_string()))?;
        Self::load_from_str(&content)
    }

    /// Load design from bytes
    pub fn load_from_bytes(data: &[u8]) -> DesignResult<Self> {
        let content =
            std::str::from_utf8(data).map_err(|e| DesignError::Deserialize(e.to_string()))?;
        Self::load_from_str(content)
    }

    fn load_from_str(content: &str) -> DesignResult<Self> {
        let data: DesignData =
            ron::from_str(content).map_err(|e| DesignError::Deserialize(e.to_string()))?;
        Design::try_from(data)
    }

    /// Copy of this design under a new design ID ("save as copy")
    pub fn duplicate(&self) -> DesignResult<Self> {
        let mut copy = Self::load_from_bytes(&self.to_bytes()?)?;
        copy.id = DesignId::new();
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, PropertyValue};
    use glam::{Mat4, Vec3};

    fn sample() -> Design {
        let mut design = Design::new("bracket");
        let root = design.root_component();
        let part = design.add_component("plate").unwrap();
        design
            .add_occurrence(root, part, "plate:1", Mat4::from_translation(Vec3::Z))
            .unwrap();
        design
            .add_entity(
                EntityRecord::new(EntityKind::SketchPoint, "p1", part)
                    .with_property("position", PropertyValue::Point(Vec3::ONE)),
            )
            .unwrap();
        design
            .begin_entity(part, EntityKind::SketchPoint, "draft")
            .unwrap();
        design
    }

    #[test]
    fn test_round_trip_bytes() {
        let design = sample();
        let loaded = Design::load_from_bytes(&design.to_bytes().unwrap()).unwrap();

        assert_eq!(loaded.id, design.id);
        assert_eq!(loaded.name, "bracket");
        assert_eq!(loaded.root_component(), design.root_component());
        assert_eq!(loaded.components().count(), 2);
        // Transient "draft" is not persisted
        assert_eq!(loaded.store().len(), 1);

        let (_, record) = loaded.store().iter().next().unwrap();
        assert_eq!(record.name, "p1");
        assert_eq!(
            record.property("position").and_then(|v| v.as_point()),
            Some(Vec3::ONE)
        );
    }

    #[test]
    fn test_save_and_load_file() {
        use tempfile::tempdir;

        let design = sample();
        let temp = tempdir().unwrap();
        let path = temp.path().join("bracket.rkd");

        design.save(&path).unwrap();
        let loaded = Design::load(&path).unwrap();
        assert_eq!(loaded.id, design.id);
        assert_eq!(loaded.store().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Design::load("/nonexistent/design.rkd");
        assert!(matches!(result, Err(DesignError::Io(_))));
    }

    #[test]
    fn test_reject_unknown_version() {
        let design = sample();
        let mut data = DesignData::from(&design);
        data.version = FILE_FORMAT_VERSION + 1;

        assert!(matches!(
            Design::try_from(data),
            Err(DesignError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_reject_garbage() {
        assert!(matches!(
            Design::load_from_bytes(b"not a design"),
            Err(DesignError::Deserialize(_))
        ));
    }

    #[test]
    fn test_cyclic_occurrences_dropped_on_load() {
        let mut design = Design::new("loop");
        let root = design.root_component();
        let a = design.add_component("a").unwrap();
        let b = design.add_component("b").unwrap();
        design.add_occurrence(root, a, "a:1", Mat4::IDENTITY).unwrap();
        design.add_occurrence(a, b, "b:1", Mat4::IDENTITY).unwrap();

        let mut data = DesignData::from(&design);
        for (parent, component, name) in [(b, a, "a:back"), (a, root, "root:1")] {
            let occurrence = Occurrence {
                id: OccurrenceId::new(),
                name: name.into(),
                parent,
                component,
                transform: Mat4::IDENTITY,
            };
            data.components
                .iter_mut()
                .find(|c| c.id == parent)
                .unwrap()
                .occurrences
                .push(occurrence.id);
            data.occurrences.push(occurrence);
        }

        let loaded = Design::try_from(data).unwrap();
        assert_eq!(loaded.occurrences.len(), 2);
        assert_eq!(loaded.instance_paths(a).len(), 1);
        assert_eq!(loaded.instance_paths(b).len(), 1);
        assert!(loaded.instance_paths(root).is_empty());
    }

    #[test]
    fn test_entity_listed_twice_loads_once() {
        let design = sample();
        let mut data = DesignData::from(&design);
        let part = data.entities[0].component;
        let id = data.entities[0].id;
        for component in &mut data.components {
            component.entities.push(id);
        }

        let loaded = Design::try_from(data).unwrap();
        assert_eq!(loaded.entities_of(part, None).len(), 1);
        assert_eq!(loaded.entities_of(loaded.root_component(), None).len(), 0);
    }

    #[test]
    fn test_duplicate_gets_new_id() {
        let design = sample();
        let copy = design.duplicate().unwrap();
        assert_ne!(copy.id, design.id);
        assert_eq!(copy.store().len(), 1);
    }
}
