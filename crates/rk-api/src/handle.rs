//! Entity handles
//!
//! A [`Handle`] is a reference-counted view of one host entity, optionally
//! bound to an occurrence path (a proxy, see [`crate::proxy`]). Handles never
//! keep the document alive. Before every operation a handle checks that its
//! document is open, that its slot generation still matches and that its
//! occurrence path still resolves, so a deletion is observed by the very
//! next call.

use std::fmt;
use std::rc::{Rc, Weak};

use rk_core::{Design, DesignId, EntityId, EntityRecord, OccurrencePath, PropertyValue, SlotKey};

use crate::document::Shared;
use crate::error::{ApiError, ApiResult};
use crate::views::TypedView;

struct HandleInner {
    doc: Weak<Shared>,
    design: DesignId,
    key: SlotKey,
    entity: EntityId,
    /// Capability this handle was obtained as
    view: String,
    context: OccurrencePath,
}

/// Reference-counted handle to a host entity
///
/// Cloning a handle shares it; [`Handle::ref_count`] reports the number of
/// clones alive. Equality of two handles is decided by
/// [`Handle::equivalent`], never by representation.
#[derive(Clone)]
pub struct Handle {
    inner: Rc<HandleInner>,
}

impl Handle {
    pub(crate) fn new(
        doc: &Rc<Shared>,
        design: DesignId,
        key: SlotKey,
        record: &EntityRecord,
        context: OccurrencePath,
    ) -> Self {
        Self::with_view(doc, design, key, record.id, record.kind.type_id(), context)
    }

    pub(crate) fn with_view(
        doc: &Rc<Shared>,
        design: DesignId,
        key: SlotKey,
        entity: EntityId,
        view: impl Into<String>,
        context: OccurrencePath,
    ) -> Self {
        Self {
            inner: Rc::new(HandleInner {
                doc: Rc::downgrade(doc),
                design,
                key,
                entity,
                view: view.into(),
                context,
            }),
        }
    }

    /// Same entity and context seen through another capability
    pub(crate) fn rebind(&self, doc: &Rc<Shared>, view: &str, context: OccurrencePath) -> Self {
        Self::with_view(
            doc,
            self.inner.design,
            self.inner.key,
            self.inner.entity,
            view,
            context,
        )
    }

    pub(crate) fn context(&self) -> &OccurrencePath {
        &self.inner.context
    }

    pub(crate) fn key(&self) -> SlotKey {
        self.inner.key
    }

    pub(crate) fn design_id(&self) -> DesignId {
        self.inner.design
    }

    /// Run `f` against the live entity, or return None if the handle is stale
    pub(crate) fn with_live<R>(
        &self,
        f: impl FnOnce(&Rc<Shared>, &Design, &EntityRecord) -> Option<R>,
    ) -> Option<R> {
        let shared = self.inner.doc.upgrade()?;
        let design = shared.design.try_borrow().ok()?;
        let record = self.live_record(&design)?;
        f(&shared, &design, record)
    }

    /// Run a host edit scoped to the live entity, or return None if stale
    pub(crate) fn with_live_mut<R>(
        &self,
        f: impl FnOnce(&mut Design, SlotKey) -> Option<R>,
    ) -> Option<R> {
        let shared = self.inner.doc.upgrade()?;
        let mut design = shared.design.try_borrow_mut().ok()?;
        self.live_record(&design)?;
        f(&mut design, self.inner.key)
    }

    /// The record this handle denotes, if it is still the same entity of the
    /// same design and the context still reaches it
    fn live_record<'d>(&self, design: &'d Design) -> Option<&'d EntityRecord> {
        if design.id != self.inner.design {
            return None;
        }
        let record = design
            .entity(self.inner.key)
            .filter(|record| record.id == self.inner.entity)?;
        if !self.inner.context.is_empty()
            && design.resolve_path(&self.inner.context).map(|info| info.leaf)
                != Some(record.component)
        {
            return None;
        }
        Some(record)
    }

    /// Whether the handle still refers to a live entity
    pub fn is_valid(&self) -> bool {
        self.with_live(|_, _, _| Some(())).is_some()
    }

    /// Number of clones of this handle currently alive
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Type identifier of the entity
    pub fn type_id(&self) -> Option<&'static str> {
        self.with_live(|_, _, record| Some(record.kind.type_id()))
    }

    /// Capability this handle was obtained as
    ///
    /// This describes the handle itself, not the entity, so it stays
    /// available after the handle turns stale. Check [`Handle::is_valid`]
    /// before relying on the entity.
    pub fn view(&self) -> &str {
        &self.inner.view
    }

    /// Persistent ID of the entity
    pub fn entity_id(&self) -> Option<EntityId> {
        self.with_live(|_, _, record| Some(record.id))
    }

    /// Whether the entity is committed content of the design
    pub fn is_persisted(&self) -> bool {
        self.with_live(|_, _, record| Some(record.persisted))
            .unwrap_or(false)
    }

    pub fn name(&self) -> Option<String> {
        self.with_live(|_, _, record| Some(record.name.clone()))
    }

    /// Rename the entity; fails on an empty or already used name
    pub fn set_name(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.with_live_mut(|design, key| {
            let record = design.entity(key)?;
            if design
                .find_entity(record.component, record.kind, name)
                .is_some_and(|other| other != key)
            {
                return None;
            }
            design.entity_mut(key)?.name = name.to_string();
            Some(())
        })
        .is_some()
    }

    /// Copy of a property value
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.with_live(|_, _, record| record.property(name).cloned())
    }

    /// Set a property; an existing property keeps its value type
    pub fn set_property(&self, name: &str, value: PropertyValue) -> bool {
        self.with_live_mut(|design, key| {
            let record = design.entity(key)?;
            if record
                .property(name)
                .is_some_and(|current| !current.same_variant(&value))
            {
                return None;
            }
            design
                .entity_mut(key)?
                .properties
                .insert(name.to_string(), value);
            Some(())
        })
        .is_some()
    }

    /// Ask the host to delete the entity
    ///
    /// Deleting through a proxy deletes the native entity, so every proxy
    /// of it turns stale as well.
    pub fn delete(&self) -> bool {
        self.with_live_mut(|design, key| design.delete_entity(key).ok())
            .is_some()
    }

    /// View of the same entity through another capability
    ///
    /// Returns None when the entity does not implement the capability right
    /// now, or when the handle is stale.
    pub fn query_capability(&self, capability: &str) -> Option<Handle> {
        self.try_query_capability(capability).ok()
    }

    /// Like [`Handle::query_capability`], naming the reason for failure
    pub fn try_query_capability(&self, capability: &str) -> ApiResult<Handle> {
        self.with_live(|shared, design, record| {
            let registry = shared.registry.try_borrow().ok()?;
            let result = if registry.supports(design, self.inner.key, record, capability) {
                Ok(self.rebind(shared, capability, self.inner.context.clone()))
            } else {
                Err(ApiError::Unsupported(capability.to_string()))
            };
            Some(result)
        })
        .unwrap_or(Err(ApiError::Stale))
    }

    /// Typed view of the entity, if it implements the view's capability
    pub fn cast<T: TypedView>(&self) -> Option<T> {
        self.query_capability(T::CAPABILITY).map(T::from_handle)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("entity", &self.inner.entity)
            .field("key", &self.inner.key)
            .field("view", &self.inner.view)
            .field("context", &self.inner.context)
            .finish()
    }
}
