//! Generational entity storage
//!
//! Every entity lives in a slot addressed by a [`SlotKey`]. Removing an
//! entity bumps the slot's generation, so keys handed out before the removal
//! never resolve again, even after the slot is reused.

use std::collections::HashMap;
use std::fmt;

use crate::entity::{EntityId, EntityRecord};

/// In-session key of an entity slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

/// Slot arena of entity records with an index by persistent ID
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_id: HashMap<EntityId, SlotKey>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Insert a record, returning its key
    ///
    /// A record whose ID is already live replaces nothing; the existing key
    /// is returned and the new record is dropped.
    pub fn insert(&mut self, record: EntityRecord) -> SlotKey {
        if let Some(key) = self.by_id.get(&record.id) {
            return *key;
        }

        let id = record.id;
        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.record = Some(record);
                SlotKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    record: Some(record),
                });
                SlotKey {
                    index,
                    generation: 0,
                }
            }
        };
        self.by_id.insert(id, key);
        key
    }

    /// Remove the record behind `key`; the key is stale afterwards
    pub fn remove(&mut self, key: SlotKey) -> Option<EntityRecord> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let record = slot.record.take()?;
        self.by_id.remove(&record.id);

        // A slot at the last generation is retired instead of recycled so
        // that no key can ever wrap around to a later occupant.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(key.index);
        }
        Some(record)
    }

    /// Whether `key` still refers to a live record
    pub fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: SlotKey) -> Option<&EntityRecord> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.record.as_ref()
    }

    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut EntityRecord> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.record.as_mut()
    }

    /// Current key of a live entity
    pub fn key_of(&self, id: EntityId) -> Option<SlotKey> {
        self.by_id.get(&id).copied()
    }

    pub fn get_by_id(&self, id: EntityId) -> Option<&EntityRecord> {
        self.key_of(id).and_then(|key| self.get(key))
    }

    /// Iterate over live records
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &EntityRecord)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.record.as_ref().map(|record| {
                (
                    SlotKey {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    record,
                )
            })
        })
    }
}
