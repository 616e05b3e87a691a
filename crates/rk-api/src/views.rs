//! Typed views
//!
//! A typed view wraps a [`Handle`] obtained through [`Handle::cast`], which
//! only succeeds when the entity implements the view's capability. Every
//! accessor still goes through the handle's liveness check, so a view of a
//! deleted entity returns None/false like any other handle.

use glam::{Mat4, Vec3};
use rk_core::{PropertyValue, sample_parallel};

use crate::capability::ids;
use crate::handle::Handle;

/// Property holding a feature's suppression state
pub const SUPPRESSED: &str = "suppressed";
/// Property holding a sketch point position
pub const POSITION: &str = "position";
/// Property holding a face's boundary vertices
pub const VERTICES: &str = "vertices";

/// A typed view bound to one capability id
pub trait TypedView: Sized {
    /// Capability the view requires
    const CAPABILITY: &'static str;

    /// Wrap a handle already known to implement [`TypedView::CAPABILITY`]
    fn from_handle(handle: Handle) -> Self;

    fn handle(&self) -> &Handle;

    fn into_handle(self) -> Handle;
}

macro_rules! typed_view {
    ($(#[$meta:meta])* $name:ident => $capability:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Handle);

        impl TypedView for $name {
            const CAPABILITY: &'static str = $capability;

            fn from_handle(handle: Handle) -> Self {
                Self(handle)
            }

            fn handle(&self) -> &Handle {
                &self.0
            }

            fn into_handle(self) -> Handle {
                self.0
            }
        }
    };
}

typed_view!(
    /// Any entity with a user-visible name
    Named => ids::NAMED
);
typed_view!(
    /// A feature that can be suppressed
    Suppressible => ids::SUPPRESSIBLE
);
typed_view!(
    /// A sketch point
    SketchPointView => "rk::SketchPoint"
);
typed_view!(
    /// A B-Rep face
    FaceView => "rk::BRepFace"
);
typed_view!(
    /// A sketch curve with an attached sampler
    SampledCurveView => ids::SAMPLED_CURVE
);

impl Named {
    pub fn name(&self) -> Option<String> {
        self.0.name()
    }

    pub fn set_name(&self, name: &str) -> bool {
        self.0.set_name(name)
    }
}

impl Suppressible {
    /// Whether the feature is suppressed; unset means not suppressed
    pub fn is_suppressed(&self) -> Option<bool> {
        self.0.with_live(|_, _, record| {
            Some(
                record
                    .property(SUPPRESSED)
                    .and_then(PropertyValue::as_bool)
                    .unwrap_or(false),
            )
        })
    }

    pub fn set_suppressed(&self, suppressed: bool) -> bool {
        self.0
            .set_property(SUPPRESSED, PropertyValue::Bool(suppressed))
    }
}

impl SketchPointView {
    /// Position in the owning component's space
    pub fn geometry(&self) -> Option<Vec3> {
        self.0.property(POSITION)?.as_point()
    }

    /// Position in the space of the proxy's context component
    pub fn world_geometry(&self) -> Option<Vec3> {
        let transform = self.0.world_transform()?;
        Some(transform.transform_point3(self.geometry()?))
    }

    pub fn set_geometry(&self, position: Vec3) -> bool {
        self.0.set_property(POSITION, PropertyValue::Point(position))
    }
}

impl FaceView {
    /// Boundary vertices in the owning component's space
    ///
    /// The returned vector is owned by the caller.
    pub fn vertices(&self) -> Option<Vec<Vec3>> {
        self.0.property(VERTICES)?.into_points()
    }

    /// Boundary vertices in the space of the proxy's context component
    pub fn world_vertices(&self) -> Option<Vec<Vec3>> {
        let transform = self.0.world_transform()?;
        Some(transform_all(transform, self.vertices()?))
    }

    /// Replace the boundary; a face needs at least three vertices
    pub fn set_vertices(&self, vertices: Vec<Vec3>) -> bool {
        if vertices.len() < 3 {
            return false;
        }
        self.0.set_property(VERTICES, PropertyValue::Points(vertices))
    }

    /// Mean of the boundary vertices
    pub fn centroid(&self) -> Option<Vec3> {
        let vertices = self.vertices()?;
        if vertices.is_empty() {
            return None;
        }
        Some(vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32)
    }
}

impl SampledCurveView {
    /// Sample `count` points along the curve on worker threads
    ///
    /// The design is not borrowed while the sampler runs. Proxies return
    /// points in their context component's space.
    pub fn sample(&self, count: usize) -> Option<Vec<Vec3>> {
        let (sampler, transform) = self.0.with_live(|_, design, _| {
            let transform = design.path_transform(self.0.context())?;
            Some((design.sampler(self.0.key())?, transform))
        })?;
        Some(transform_all(transform, sample_parallel(sampler.as_ref(), count)))
    }
}

fn transform_all(transform: Mat4, mut points: Vec<Vec3>) -> Vec<Vec3> {
    if transform != Mat4::IDENTITY {
        for p in &mut points {
            *p = transform.transform_point3(*p);
        }
    }
    points
}
