//! Standard part layouts.
//!
//! Each factory returns a [`Part`] with the default point layout, mass,
//! health and properties for its kind, placed at `pose`. Layouts assume a
//! unit-sized part centred on its origin.

use glam::Vec3;

use crate::types::{
    AttachmentPoint, Health, Part, PartKind, PartProperties, PointKind, Pose,
};

fn point(kind: PointKind, offset: Vec3, direction: Vec3) -> AttachmentPoint {
    AttachmentPoint::with_default_radius(kind, offset, direction)
}

/// Build the standard part for `kind`.
pub fn standard_part(kind: PartKind, pose: Pose) -> Part {
    match kind {
        PartKind::Block => block(pose),
        PartKind::Beam => beam(pose),
        PartKind::Wheel => wheel(pose),
        PartKind::Motor => motor(pose),
        PartKind::Seat => seat(pose),
        PartKind::Tool => tool(pose),
        PartKind::Connector => connector(pose),
    }
}

/// Unit cube with a Universal point on each face (+X, -X, +Y, -Y, +Z, -Z).
pub fn block(pose: Pose) -> Part {
    let faces = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    let points = faces
        .iter()
        .map(|n| point(PointKind::Universal, *n * 0.5, *n))
        .collect();
    Part::new(PartKind::Block, pose, 10.0, points).with_health(Health::full(100.0))
}

/// Two-unit beam along X: Structural ends and a Linkage point on top.
pub fn beam(pose: Pose) -> Part {
    Part::new(
        PartKind::Beam,
        pose,
        6.0,
        vec![
            point(PointKind::Structural, Vec3::X, Vec3::X),
            point(PointKind::Structural, Vec3::NEG_X, Vec3::NEG_X),
            point(PointKind::Linkage, Vec3::Y * 0.25, Vec3::Y),
        ],
    )
    .with_health(Health::full(80.0))
}

/// Wheel with one axle mount on its inner face (-X).
pub fn wheel(pose: Pose) -> Part {
    Part::new(
        PartKind::Wheel,
        pose,
        4.0,
        vec![point(PointKind::WheelMount, Vec3::NEG_X * 0.2, Vec3::NEG_X)],
    )
    .with_health(Health::full(60.0))
    .with_properties(PartProperties::Wheel {
        wheel_radius: 0.5,
        grip: 0.9,
    })
}

/// Motor with a shaft mount (+X) and a Linkage base (-Y).
pub fn motor(pose: Pose) -> Part {
    Part::new(
        PartKind::Motor,
        pose,
        8.0,
        vec![
            point(PointKind::MotorMount, Vec3::X * 0.3, Vec3::X),
            point(PointKind::Linkage, Vec3::NEG_Y * 0.3, Vec3::NEG_Y),
        ],
    )
    .with_health(Health::full(70.0))
    .with_properties(PartProperties::Motor {
        torque: 120.0,
        max_speed: 40.0,
    })
}

/// Seat mounted from below.
pub fn seat(pose: Pose) -> Part {
    Part::new(
        PartKind::Seat,
        pose,
        5.0,
        vec![point(PointKind::SeatMount, Vec3::NEG_Y * 0.4, Vec3::NEG_Y)],
    )
    .with_health(Health::full(50.0))
    .with_properties(PartProperties::Seat { capacity: 1 })
}

/// Tool mounted from behind (-Z).
pub fn tool(pose: Pose) -> Part {
    Part::new(
        PartKind::Tool,
        pose,
        3.0,
        vec![point(PointKind::ToolMount, Vec3::NEG_Z * 0.3, Vec3::NEG_Z)],
    )
    .with_health(Health::full(40.0))
    .with_properties(PartProperties::Tool {
        tool: "drill".to_string(),
    })
}

/// Short adapter with a Linkage point at each end along X.
pub fn connector(pose: Pose) -> Part {
    Part::new(
        PartKind::Connector,
        pose,
        1.0,
        vec![
            point(PointKind::Linkage, Vec3::X * 0.25, Vec3::X),
            point(PointKind::Linkage, Vec3::NEG_X * 0.25, Vec3::NEG_X),
        ],
    )
    .with_health(Health::full(30.0))
}
