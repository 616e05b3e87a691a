//! Entity records and kinds

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::ComponentId;

/// Persistent identifier of an entity
///
/// Never reused. Survives save/reload and undo of a deletion, unlike
/// [`crate::SlotKey`] which is only meaningful inside one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a fresh entity ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Body,
    Face,
    Edge,
    Feature,
    Sketch,
    SketchPoint,
    SketchCurve,
    ConstructionPlane,
}

impl EntityKind {
    /// Stable type identifier reported for entities of this kind
    pub fn type_id(&self) -> &'static str {
        match self {
            EntityKind::Body => "rk::BRepBody",
            EntityKind::Face => "rk::BRepFace",
            EntityKind::Edge => "rk::BRepEdge",
            EntityKind::Feature => "rk::Feature",
            EntityKind::Sketch => "rk::Sketch",
            EntityKind::SketchPoint => "rk::SketchPoint",
            EntityKind::SketchCurve => "rk::SketchCurve",
            EntityKind::ConstructionPlane => "rk::ConstructionPlane",
        }
    }

    /// Look up a kind by its type identifier
    pub fn from_type_id(type_id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.type_id() == type_id)
    }

    /// Whether callers may create entities of this kind through a collection.
    /// B-Rep topology is only ever produced by the host.
    pub fn is_user_creatable(&self) -> bool {
        !matches!(
            self,
            EntityKind::Body | EntityKind::Face | EntityKind::Edge
        )
    }

    /// All entity kinds
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Body,
            EntityKind::Face,
            EntityKind::Edge,
            EntityKind::Feature,
            EntityKind::Sketch,
            EntityKind::SketchPoint,
            EntityKind::SketchCurve,
            EntityKind::ConstructionPlane,
        ]
    }
}

/// A property value stored on an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Point(Vec3),
    Reals(Vec<f64>),
    Points(Vec<Vec3>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Vec3> {
        match self {
            PropertyValue::Point(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&[Vec3]> {
        match self {
            PropertyValue::Points(v) => Some(v),
            _ => None,
        }
    }

    /// Move the point list out of the value
    pub fn into_points(self) -> Option<Vec<Vec3>> {
        match self {
            PropertyValue::Points(v) => Some(v),
            _ => None,
        }
    }

    /// Whether two values hold the same variant
    pub fn same_variant(&self, other: &PropertyValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Host-side storage for one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    /// Component definition that owns this entity
    pub component: ComponentId,
    /// False while the entity is uncommitted construction state
    pub persisted: bool,
    /// Kind-specific properties
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl EntityRecord {
    /// Create a new persisted record
    pub fn new(kind: EntityKind, name: impl Into<String>, component: ComponentId) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            name: name.into(),
            component,
            persisted: true,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Get a property by name
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}
