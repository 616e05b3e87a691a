//! Occurrences and occurrence paths

use std::fmt;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::ComponentId;

/// Identifier of a single occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OccurrenceId(pub Uuid);

impl OccurrenceId {
    /// Create a fresh occurrence ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OccurrenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One instantiation of a component inside a parent component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: OccurrenceId,
    pub name: String,
    /// Component this occurrence is placed in
    pub parent: ComponentId,
    /// Component this occurrence instantiates
    pub component: ComponentId,
    /// Transform relative to the parent component
    pub transform: Mat4,
}

/// Path through the occurrence tree
///
/// The first occurrence is placed in the path's *context* component, each
/// following occurrence is placed in the component of the one before it.
/// An empty path denotes the native, context-free view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccurrencePath(Vec<OccurrenceId>);

impl OccurrencePath {
    /// The empty (native) path
    pub fn native() -> Self {
        Self(Vec::new())
    }

    pub fn new(ids: impl IntoIterator<Item = OccurrenceId>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ids(&self) -> &[OccurrenceId] {
        &self.0
    }

    pub fn first(&self) -> Option<OccurrenceId> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<OccurrenceId> {
        self.0.last().copied()
    }

    /// Path extended by one occurrence
    pub fn child(&self, id: OccurrenceId) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    /// `self` followed by `tail`
    pub fn join(&self, tail: &OccurrencePath) -> Self {
        let mut ids = Vec::with_capacity(self.0.len() + tail.0.len());
        ids.extend_from_slice(&self.0);
        ids.extend_from_slice(&tail.0);
        Self(ids)
    }
}

impl From<Vec<OccurrenceId>> for OccurrencePath {
    fn from(ids: Vec<OccurrenceId>) -> Self {
        Self(ids)
    }
}

impl fmt::Display for OccurrencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<native>");
        }
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}
