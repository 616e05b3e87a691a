//! Assembly-context proxies
//!
//! An entity stored in a component definition is *native*. Every place the
//! component is instantiated gives the same entity another context, and a
//! proxy is a handle bound to one such occurrence path. Proxies are plain
//! values: there is no registry of proxies, and two handles denote the same
//! thing exactly when their [`EntityRef`]s are equal.
//!
//! ```text
//! Native --create_for_assembly_context(occ)--> Proxied(occ)
//! Proxied(p) --create_for_assembly_context(occ)--> Proxied(occ ++ p)
//! Proxied(p) --native_object()--> Native
//! Native --native_object()--> None
//! ```

use std::collections::HashSet;

use glam::Mat4;
use rk_core::{DesignId, EntityId, OccurrencePath};

use crate::error::{ApiError, ApiResult};
use crate::handle::Handle;

/// Identity of an entity in one assembly context
///
/// Structural equality is the equivalence rule for handles: same design,
/// same native entity, same occurrence path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub design: DesignId,
    pub entity: EntityId,
    /// Empty for a native handle
    pub path: OccurrencePath,
}

impl Handle {
    /// Identity of the live entity and its context
    pub fn identity(&self) -> Option<EntityRef> {
        self.with_live(|_, _, record| {
            Some(EntityRef {
                design: self.design_id(),
                entity: record.id,
                path: self.context().clone(),
            })
        })
    }

    /// Whether both handles are live and denote the same entity in the same context
    pub fn equivalent(&self, other: &Handle) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Whether this is a live proxy
    pub fn is_proxy(&self) -> bool {
        !self.context().is_empty() && self.is_valid()
    }

    /// Occurrence path of a live proxy; None for native or stale handles
    pub fn assembly_context(&self) -> Option<OccurrencePath> {
        if self.context().is_empty() {
            return None;
        }
        self.with_live(|_, _, _| Some(self.context().clone()))
    }

    /// Context-free handle of a proxy
    ///
    /// Returns None for a native handle (it is already native) and for a
    /// stale handle.
    pub fn native_object(&self) -> Option<Handle> {
        if self.context().is_empty() {
            return None;
        }
        self.with_live(|shared, _, _| {
            Some(self.rebind(shared, self.view(), OccurrencePath::native()))
        })
    }

    /// Transform from the entity's component into its context component
    ///
    /// Identity for native handles.
    pub fn world_transform(&self) -> Option<Mat4> {
        self.with_live(|_, design, _| design.path_transform(self.context()))
    }

    /// Proxy of this entity bound to `occurrence`
    ///
    /// `occurrence` must be a valid path whose last occurrence instantiates
    /// the component this handle lives in (for a proxy, the component its
    /// own path starts in). A proxy is re-contexted by prefixing its path.
    /// Returns None for ineligible paths and stale handles.
    pub fn create_for_assembly_context(&self, occurrence: &OccurrencePath) -> Option<Handle> {
        self.try_create_for_assembly_context(occurrence).ok()
    }

    /// Like [`Handle::create_for_assembly_context`], naming the reason for failure
    pub fn try_create_for_assembly_context(
        &self,
        occurrence: &OccurrencePath,
    ) -> ApiResult<Handle> {
        let result = self
            .with_live(|shared, design, record| {
                if !self.context().is_empty() && !shared.config.allow_recontext {
                    return Some(Err(ApiError::RecontextDisabled));
                }

                let context_component = if self.context().is_empty() {
                    record.component
                } else {
                    design.resolve_path(self.context())?.context
                };
                let eligible = design
                    .resolve_path(occurrence)
                    .is_some_and(|info| info.leaf == context_component);
                if !eligible {
                    return Some(Err(ApiError::Ineligible));
                }

                let path = occurrence.join(self.context());
                Some(Ok(self.rebind(shared, self.view(), path)))
            })
            .unwrap_or(Err(ApiError::Stale));

        if let Err(e) = &result {
            tracing::debug!("No proxy for {} in {}: {}", self.view(), occurrence, e);
        }
        result
    }
}

/// Drop stale handles and all but the first of each equivalent group
pub fn dedup_equivalent(handles: impl IntoIterator<Item = Handle>) -> Vec<Handle> {
    let mut seen = HashSet::new();
    handles
        .into_iter()
        .filter(|handle| handle.identity().is_some_and(|id| seen.insert(id)))
        .collect()
}
