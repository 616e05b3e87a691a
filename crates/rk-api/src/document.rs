//! Open design documents
//!
//! A [`Document`] owns one [`Design`] for the lifetime of a session. Handles
//! only hold a weak reference to it, so closing the document makes every
//! outstanding handle stale without the identity layer freeing anything.

use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;

use rk_core::{ComponentId, Design, DesignId, EntityId, EntityKind, OccurrencePath, SlotKey};

use crate::capability::{Capability, CapabilityRegistry};
use crate::collection::EntityCollection;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::handle::Handle;

/// State shared between a document and the handles it hands out
pub(crate) struct Shared {
    pub(crate) design: RefCell<Design>,
    pub(crate) registry: RefCell<CapabilityRegistry>,
    pub(crate) config: ApiConfig,
}

/// An open design
pub struct Document {
    id: DesignId,
    shared: Rc<Shared>,
}

impl Document {
    /// Open an in-memory design with the default configuration
    pub fn new(design: Design) -> Self {
        Self::with_config(design, ApiConfig::default())
    }

    /// Open an in-memory design
    pub fn with_config(design: Design, config: ApiConfig) -> Self {
        tracing::debug!("Opened design {} ({})", design.name, design.id);
        Self {
            id: design.id,
            shared: Rc::new(Shared {
                design: RefCell::new(design),
                registry: RefCell::new(CapabilityRegistry::with_defaults()),
                config,
            }),
        }
    }

    /// Load a design file
    pub fn open(path: impl AsRef<Path>, config: ApiConfig) -> ApiResult<Self> {
        let design = Design::load(path)?;
        Ok(Self::with_config(design, config))
    }

    /// Save the design to a file
    pub fn save(&self, path: impl AsRef<Path>) -> ApiResult<()> {
        self.design()?.save(path)?;
        Ok(())
    }

    /// Save and load the design into a fresh session
    ///
    /// Handles of this document are not carried over; tokens are.
    pub fn reopen(&self) -> ApiResult<Self> {
        let bytes = self.design()?.to_bytes()?;
        let design = Design::load_from_bytes(&bytes)?;
        Ok(Self::with_config(design, self.shared.config.clone()))
    }

    /// Close the document; outstanding handles become stale
    pub fn close(self) {
        tracing::debug!("Closed design {}", self.design_id());
    }

    pub(crate) fn shared(&self) -> &Rc<Shared> {
        &self.shared
    }

    fn design(&self) -> ApiResult<Ref<'_, Design>> {
        self.shared.design.try_borrow().map_err(|_| ApiError::Busy)
    }

    /// ID of the open design
    ///
    /// Falls back to the ID it was opened with while the design is borrowed.
    pub fn design_id(&self) -> DesignId {
        self.read(|design| design.id).unwrap_or(self.id)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.shared.config
    }

    /// Run a read-only query against the design
    ///
    /// Returns None if the design is currently being edited.
    pub fn read<R>(&self, f: impl FnOnce(&Design) -> R) -> Option<R> {
        let design = self.shared.design.try_borrow().ok()?;
        Some(f(&design))
    }

    /// Run a host-side edit against the design
    ///
    /// Returns None if the design is currently borrowed.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Design) -> R) -> Option<R> {
        let mut design = self.shared.design.try_borrow_mut().ok()?;
        Some(f(&mut design))
    }

    /// Register an extra capability for a type; false if already present
    pub fn register_capability(&self, type_id: impl Into<String>, capability: Capability) -> bool {
        self.shared
            .registry
            .try_borrow_mut()
            .is_ok_and(|mut registry| registry.register(type_id, capability))
    }

    /// Native handle for a live entity key
    pub fn handle(&self, key: SlotKey) -> Option<Handle> {
        let design = self.shared.design.try_borrow().ok()?;
        let record = design.entity(key)?;
        Some(Handle::new(
            &self.shared,
            design.id,
            key,
            record,
            OccurrencePath::native(),
        ))
    }

    /// Native handle for a live entity by persistent ID
    pub fn handle_by_id(&self, id: EntityId) -> Option<Handle> {
        let key = self.read(|design| design.key_of(id))??;
        self.handle(key)
    }

    /// Entities of one kind owned by a component
    pub fn entities(&self, component: ComponentId, kind: EntityKind) -> EntityCollection {
        EntityCollection::new(
            &self.shared,
            Some(component),
            Some(kind),
            OccurrencePath::native(),
        )
    }

    /// Every entity owned by a component, regardless of kind (read-only)
    pub fn all_entities(&self, component: ComponentId) -> EntityCollection {
        EntityCollection::new(&self.shared, Some(component), None, OccurrencePath::native())
    }

    /// Entities of the component instantiated at `path`, as proxies bound to it
    ///
    /// An invalid path yields an empty collection.
    pub fn entities_in_context(&self, path: OccurrencePath, kind: EntityKind) -> EntityCollection {
        let component = self
            .read(|design| design.resolve_path(&path).map(|info| info.leaf))
            .flatten();
        EntityCollection::new(&self.shared, component, Some(kind), path)
    }

    /// Full paths at which a component is instantiated
    pub fn instance_paths(&self, component: ComponentId) -> Vec<OccurrencePath> {
        self.read(|design| design.instance_paths(component))
            .unwrap_or_default()
    }
}
