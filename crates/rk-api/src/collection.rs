//! Entity collections
//!
//! "All entities of kind X owned by component Y", in model order. Lookups
//! miss with None, never with an error. A collection created for an
//! occurrence path hands out proxies bound to that path.

use std::rc::{Rc, Weak};

use rk_core::{ComponentId, EntityId, EntityKind, EntityRecord, OccurrencePath, SlotKey};
use uuid::Uuid;

use crate::document::Shared;
use crate::error::{ApiError, ApiResult};
use crate::handle::Handle;

/// Entities of one kind owned by one component
#[derive(Debug, Clone)]
pub struct EntityCollection {
    doc: Weak<Shared>,
    /// None when the collection was created for an unresolvable path
    component: Option<ComponentId>,
    kind: Option<EntityKind>,
    context: OccurrencePath,
}

impl EntityCollection {
    pub(crate) fn new(
        doc: &Rc<Shared>,
        component: Option<ComponentId>,
        kind: Option<EntityKind>,
        context: OccurrencePath,
    ) -> Self {
        Self {
            doc: Rc::downgrade(doc),
            component,
            kind,
            context,
        }
    }

    /// Kind of the items, None for a mixed collection
    pub fn kind(&self) -> Option<EntityKind> {
        self.kind
    }

    /// Occurrence path items are bound to; empty for native items
    pub fn context(&self) -> &OccurrencePath {
        &self.context
    }

    /// Whether [`EntityCollection::add`] can succeed at all
    pub fn is_mutable(&self) -> bool {
        self.kind.is_some_and(|kind| kind.is_user_creatable())
    }

    /// Keys of the items in model order, or None if the collection is dead
    fn keys(&self, shared: &Shared) -> Option<Vec<SlotKey>> {
        let component = self.component?;
        let design = shared.design.try_borrow().ok()?;
        if !self.context.is_empty()
            && design.resolve_path(&self.context).map(|info| info.leaf) != Some(component)
        {
            return None;
        }
        Some(design.entities_of(component, self.kind))
    }

    fn handle_for(&self, shared: &Rc<Shared>, key: SlotKey) -> Option<Handle> {
        let design = shared.design.try_borrow().ok()?;
        let record = design.entity(key)?;
        Some(Handle::new(shared, design.id, key, record, self.context.clone()))
    }

    /// First item whose record satisfies `predicate`
    fn find(&self, predicate: impl Fn(&EntityRecord) -> bool) -> Option<Handle> {
        let shared = self.doc.upgrade()?;
        let key = {
            let keys = self.keys(&shared)?;
            let design = shared.design.try_borrow().ok()?;
            keys.into_iter()
                .find(|key| design.entity(*key).is_some_and(&predicate))?
        };
        self.handle_for(&shared, key)
    }

    /// Number of items; zero once the document is closed
    pub fn count(&self) -> usize {
        self.doc
            .upgrade()
            .and_then(|shared| self.keys(&shared))
            .map_or(0, |keys| keys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Item at `index`; None for negative or out-of-range indices
    pub fn item(&self, index: isize) -> Option<Handle> {
        let index = usize::try_from(index).ok()?;
        let shared = self.doc.upgrade()?;
        let key = *self.keys(&shared)?.get(index)?;
        self.handle_for(&shared, key)
    }

    /// First item with a matching name
    pub fn item_by_name(&self, name: &str) -> Option<Handle> {
        let matching = self.doc.upgrade()?.config.name_matching;
        self.find(|record| matching.matches(&record.name, name))
    }

    /// Item by the string form of its entity ID
    pub fn item_by_id(&self, id: &str) -> Option<Handle> {
        let id = EntityId(Uuid::parse_str(id).ok()?);
        self.find(|record| record.id == id)
    }

    /// Create a new item; None if the host rejects it
    pub fn add(&self, name: &str) -> Option<Handle> {
        self.try_add(name).ok()
    }

    /// Like [`EntityCollection::add`], naming the reason for failure
    pub fn try_add(&self, name: &str) -> ApiResult<Handle> {
        let kind = self
            .kind
            .filter(EntityKind::is_user_creatable)
            .ok_or_else(|| ApiError::Unsupported("collection is read-only".into()))?;
        self.create(|component| EntityRecord::new(kind, name, component))
    }

    /// Copy an item under a new name
    ///
    /// Returns None if `source` is stale or not of this collection's kind,
    /// or if the host rejects the copy.
    ///
    /// # Panics
    ///
    /// Panics if `new_name` already names an item of this collection.
    /// Callers must pick an unused name.
    pub fn copy_item(&self, source: &Handle, new_name: &str) -> Option<Handle> {
        assert!(
            self.item_by_name(new_name).is_none(),
            "copy_item: name {new_name:?} is already used in this collection"
        );
        let template = source.with_live(|_, _, record| Some(record.clone()))?;
        if Some(template.kind) != self.kind || !self.is_mutable() {
            return None;
        }
        self.create(|component| {
            let mut record = EntityRecord::new(template.kind, new_name, component);
            record.properties = template.properties;
            record
        })
        .ok()
    }

    fn create(&self, build: impl FnOnce(ComponentId) -> EntityRecord) -> ApiResult<Handle> {
        let shared = self.doc.upgrade().ok_or(ApiError::Stale)?;
        let component = self.component.ok_or(ApiError::Ineligible)?;
        let key = {
            let mut design = shared.design.try_borrow_mut().map_err(|_| ApiError::Busy)?;
            if !self.context.is_empty()
                && design.resolve_path(&self.context).map(|info| info.leaf) != Some(component)
            {
                return Err(ApiError::Ineligible);
            }
            design.add_entity(build(component)).inspect_err(|e| {
                tracing::debug!("Collection rejected new item: {}", e);
            })?
        };
        self.handle_for(&shared, key).ok_or(ApiError::Stale)
    }

    /// Iterate over a snapshot of the current items
    ///
    /// Items deleted during the traversal are skipped. The order of items
    /// added during the traversal is undefined.
    pub fn iter(&self) -> CollectionIter {
        let keys = self
            .doc
            .upgrade()
            .and_then(|shared| self.keys(&shared))
            .unwrap_or_default();
        CollectionIter {
            collection: self.clone(),
            keys: keys.into_iter(),
        }
    }
}

impl IntoIterator for &EntityCollection {
    type Item = Handle;
    type IntoIter = CollectionIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a collection snapshot
pub struct CollectionIter {
    collection: EntityCollection,
    keys: std::vec::IntoIter<SlotKey>,
}

impl Iterator for CollectionIter {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let shared = self.collection.doc.upgrade()?;
        self.keys
            .by_ref()
            .find_map(|key| self.collection.handle_for(&shared, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, NameMatching};
    use crate::document::Document;
    use crate::test_support::fixture;
    use rk_core::Design;

    #[test]
    fn test_three_item_bounds() {
        let mut design = Design::new("bounds");
        let root = design.root_component();
        for name in ["a", "b", "c"] {
            design.create_entity(root, EntityKind::Feature, name).unwrap();
        }
        let doc = Document::new(design);
        let features = doc.entities(root, EntityKind::Feature);

        assert_eq!(features.count(), 3);
        for i in 0..3 {
            assert!(features.item(i).is_some());
        }
        assert!(features.item(3).is_none());
        assert!(features.item(-1).is_none());
        assert!(features.item(isize::MIN).is_none());
    }

    #[test]
    fn test_model_order() {
        let fx = fixture();
        let names: Vec<_> = fx
            .doc
            .all_entities(fx.wheel)
            .iter()
            .filter_map(|h| h.name())
            .collect();
        assert_eq!(names, vec!["rim", "center", "spoke"]);
    }

    #[test]
    fn test_item_by_name_and_id() {
        let fx = fixture();
        let features = fx.doc.entities(fx.root, EntityKind::Feature);

        let extrude = features.item_by_name("Extrude1").unwrap();
        let id = extrude.entity_id().unwrap().to_string();
        assert!(features.item_by_id(&id).unwrap().equivalent(&extrude));

        assert!(features.item_by_name("extrude1").is_none());
        assert!(features.item_by_name("Missing").is_none());
        assert!(features.item_by_id("not-a-uuid").is_none());
        assert!(features.item_by_id(&Uuid::new_v4().to_string()).is_none());
        // The sketch lives in the root too, but not in the feature collection
        let sketch_id = fx.doc.handle(fx.sketch).unwrap().entity_id().unwrap();
        assert!(features.item_by_id(&sketch_id.to_string()).is_none());
    }

    #[test]
    fn test_case_insensitive_names() {
        let mut design = Design::new("names");
        let root = design.root_component();
        design.create_entity(root, EntityKind::Sketch, "Sketch1").unwrap();
        let config = ApiConfig {
            name_matching: NameMatching::AsciiCaseInsensitive,
            ..ApiConfig::default()
        };
        let doc = Document::with_config(design, config);

        let sketches = doc.entities(root, EntityKind::Sketch);
        assert!(sketches.item_by_name("SKETCH1").is_some());
    }

    #[test]
    fn test_add_grows_by_one() {
        let fx = fixture();
        let features = fx.doc.entities(fx.root, EntityKind::Feature);
        let before = features.count();

        let added = features.add("Fillet1").unwrap();
        assert_eq!(added.name().as_deref(), Some("Fillet1"));
        assert_eq!(features.count(), before + 1);
        assert!(features.item(before as isize).unwrap().equivalent(&added));
    }

    #[test]
    fn test_rejected_add_leaves_count() {
        let fx = fixture();
        let features = fx.doc.entities(fx.root, EntityKind::Feature);
        let before = features.count();

        assert!(features.add("Extrude1").is_none());
        assert!(features.add("").is_none());
        assert!(matches!(
            features.try_add("Extrude1"),
            Err(ApiError::Host(rk_core::DesignError::DuplicateName(_)))
        ));
        assert_eq!(features.count(), before);

        let faces = fx.doc.entities(fx.wheel, EntityKind::Face);
        assert!(!faces.is_mutable());
        assert!(matches!(faces.try_add("cap"), Err(ApiError::Unsupported(_))));
        assert_eq!(faces.count(), 1);
    }

    #[test]
    fn test_add_while_editing_is_busy() {
        let fx = fixture();
        let features = fx.doc.entities(fx.root, EntityKind::Feature);
        let result = fx.doc.edit(|_| features.try_add("Fillet1")).unwrap();
        assert!(matches!(result, Err(ApiError::Busy)));
    }

    #[test]
    fn test_context_collection_yields_proxies() {
        let fx = fixture();
        let points = fx.doc.entities_in_context(fx.left.clone(), EntityKind::SketchPoint);
        assert_eq!(points.count(), 1);

        let proxy = points.item(0).unwrap();
        assert!(proxy.is_proxy());
        assert_eq!(proxy.assembly_context(), Some(fx.left.clone()));
        let native = fx.doc.handle(fx.center).unwrap();
        assert!(proxy.native_object().unwrap().equivalent(&native));

        let added = points.add("hub").unwrap();
        assert!(added.is_proxy());
        assert_eq!(fx.doc.entities(fx.wheel, EntityKind::SketchPoint).count(), 2);
    }

    #[test]
    fn test_invalid_context_collection_is_empty() {
        let fx = fixture();
        let bogus = fx.left.join(&fx.right);
        let points = fx.doc.entities_in_context(bogus, EntityKind::SketchPoint);
        assert_eq!(points.count(), 0);
        assert!(points.item(0).is_none());
        assert!(matches!(points.try_add("x"), Err(ApiError::Ineligible)));
    }

    #[test]
    fn test_iteration_skips_deleted() {
        let fx = fixture();
        let all = fx.doc.all_entities(fx.wheel);
        let mut iter = all.iter();

        let first = iter.next().unwrap();
        assert_eq!(first.name().as_deref(), Some("rim"));
        fx.doc.edit(|d| d.delete_entity(fx.center)).unwrap().unwrap();

        let rest: Vec<_> = iter.filter_map(|h| h.name()).collect();
        assert_eq!(rest, vec!["spoke"]);
    }

    #[test]
    fn test_closed_document_collection() {
        let fx = fixture();
        let features = fx.doc.entities(fx.root, EntityKind::Feature);
        fx.doc.close();
        assert_eq!(features.count(), 0);
        assert!(features.item(0).is_none());
        assert!(features.iter().next().is_none());
        assert!(matches!(features.try_add("x"), Err(ApiError::Stale)));
    }

    #[test]
    fn test_copy_item() {
        let fx = fixture();
        let sketches = fx.doc.entities(fx.root, EntityKind::Sketch);
        let source = fx.doc.handle(fx.sketch).unwrap();
        assert!(source.set_property("plane", rk_core::PropertyValue::Text("XY".into())));

        let copy = sketches.copy_item(&source, "Sketch2").unwrap();
        assert_eq!(copy.property("plane"), source.property("plane"));
        assert!(!copy.equivalent(&source));

        let feature = fx.doc.handle(fx.extrude).unwrap();
        assert!(sketches.copy_item(&feature, "Sketch3").is_none());
    }

    #[test]
    #[should_panic(expected = "already used")]
    fn test_copy_item_name_collision_panics() {
        let fx = fixture();
        let sketches = fx.doc.entities(fx.root, EntityKind::Sketch);
        let source = fx.doc.handle(fx.sketch).unwrap();
        sketches.copy_item(&source, "Sketch1");
    }
}
