//! Shared test model: a car root with two wheel occurrences, each wheel
//! holding a bolt occurrence.

use glam::{Mat4, Vec3};
use rk_core::{
    ComponentId, Design, EntityKind, EntityRecord, OccurrenceId, OccurrencePath, PropertyValue,
    SlotKey,
};

use crate::document::Document;
use crate::views::{POSITION, VERTICES};

pub(crate) struct Fixture {
    pub doc: Document,
    pub root: ComponentId,
    pub wheel: ComponentId,
    pub bolt: ComponentId,
    pub extrude: SlotKey,
    pub sketch: SlotKey,
    pub rim: SlotKey,
    pub center: SlotKey,
    pub spoke: SlotKey,
    pub tip: SlotKey,
    /// Root > wheel:1, offset +10 X
    pub left: OccurrencePath,
    /// Root > wheel:2, offset -10 X
    pub right: OccurrencePath,
    /// Wheel > bolt:1, offset +1 Y
    pub bolt_in_wheel: OccurrenceId,
}

pub(crate) fn fixture() -> Fixture {
    let mut design = Design::new("car");
    let root = design.root_component();
    let wheel = design.add_component("wheel").unwrap();
    let bolt = design.add_component("bolt").unwrap();

    let extrude = design
        .create_entity(root, EntityKind::Feature, "Extrude1")
        .unwrap();
    let sketch = design
        .create_entity(root, EntityKind::Sketch, "Sketch1")
        .unwrap();

    let rim = design
        .add_entity(
            EntityRecord::new(EntityKind::Face, "rim", wheel).with_property(
                VERTICES,
                PropertyValue::Points(vec![
                    Vec3::new(-1.0, -1.0, 0.0),
                    Vec3::new(1.0, -1.0, 0.0),
                    Vec3::new(1.0, 1.0, 0.0),
                    Vec3::new(-1.0, 1.0, 0.0),
                ]),
            ),
        )
        .unwrap();
    let center = design
        .add_entity(
            EntityRecord::new(EntityKind::SketchPoint, "center", wheel)
                .with_property(POSITION, PropertyValue::Point(Vec3::new(0.0, 2.0, 0.0))),
        )
        .unwrap();
    let spoke = design
        .create_entity(wheel, EntityKind::SketchCurve, "spoke")
        .unwrap();
    let tip = design
        .add_entity(
            EntityRecord::new(EntityKind::SketchPoint, "tip", bolt)
                .with_property(POSITION, PropertyValue::Point(Vec3::ZERO)),
        )
        .unwrap();

    let left = design
        .add_occurrence(
            root,
            wheel,
            "wheel:1",
            Mat4::from_translation(Vec3::X * 10.0),
        )
        .unwrap();
    let right = design
        .add_occurrence(
            root,
            wheel,
            "wheel:2",
            Mat4::from_translation(Vec3::X * -10.0),
        )
        .unwrap();
    let bolt_in_wheel = design
        .add_occurrence(wheel, bolt, "bolt:1", Mat4::from_translation(Vec3::Y))
        .unwrap();

    Fixture {
        doc: Document::new(design),
        root,
        wheel,
        bolt,
        extrude,
        sketch,
        rim,
        center,
        spoke,
        tip,
        left: OccurrencePath::new([left]),
        right: OccurrencePath::new([right]),
        bolt_in_wheel,
    }
}
