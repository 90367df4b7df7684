//! Part types: identity, pose, health and type-specific properties.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::point::AttachmentPoint;

/// Unique identifier for a part in a [`ConnectionGraph`](crate::graph::ConnectionGraph).
///
/// Ids are handed out in increasing order, so ordering by `PartId` is
/// ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartId(u64);

impl PartId {
    /// Create a part id from its raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part-{}", self.0)
    }
}

/// Kind of part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartKind {
    /// Cube frame block.
    Block,
    /// Long structural member.
    Beam,
    /// Wheel.
    Wheel,
    /// Drive motor.
    Motor,
    /// Driver seat.
    Seat,
    /// Mounted tool.
    Tool,
    /// Small adapter piece.
    Connector,
}

impl PartKind {
    /// Every kind, in declaration order.
    pub const ALL: [PartKind; 7] = [
        Self::Block,
        Self::Beam,
        Self::Wheel,
        Self::Motor,
        Self::Seat,
        Self::Tool,
        Self::Connector,
    ];

    /// Parse part kind from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "block" => Some(Self::Block),
            "beam" => Some(Self::Beam),
            "wheel" => Some(Self::Wheel),
            "motor" => Some(Self::Motor),
            "seat" => Some(Self::Seat),
            "tool" => Some(Self::Tool),
            "connector" => Some(Self::Connector),
            _ => None,
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Beam => write!(f, "beam"),
            Self::Wheel => write!(f, "wheel"),
            Self::Motor => write!(f, "motor"),
            Self::Seat => write!(f, "seat"),
            Self::Tool => write!(f, "tool"),
            Self::Connector => write!(f, "connector"),
        }
    }
}

/// World pose of a part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position.
    pub position: Vec3,
    /// World orientation.
    pub orientation: Quat,
}

impl Pose {
    /// Create a new pose. An orientation that cannot be normalised (zero
    /// length or non-finite) falls back to identity.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        let length = orientation.length();
        let orientation = if length.is_finite() && length > f32::EPSILON {
            orientation.normalize()
        } else {
            Quat::IDENTITY
        };
        Self {
            position,
            orientation,
        }
    }

    /// Whether position and orientation are free of NaN and infinities.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }

    /// Pose at a position with identity orientation.
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Map a part-local point into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// Map a part-local direction into world space.
    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.orientation * local
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

/// Current and maximum health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Remaining health, in `0.0..=max`.
    pub current: f32,
    /// Maximum health.
    pub max: f32,
}

impl Health {
    /// Full health at the given maximum.
    pub fn full(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    /// Reduce health, saturating at zero. Returns the health left.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        self.current = (self.current - amount.max(0.0)).max(0.0);
        self.current
    }

    /// Restore health, saturating at `max`.
    pub fn repair(&mut self, amount: f32) -> f32 {
        self.current = (self.current + amount.max(0.0)).min(self.max);
        self.current
    }

    /// Whether the part has no health left.
    pub fn is_destroyed(&self) -> bool {
        self.current <= 0.0
    }

    /// Health as a fraction of max (0 when max is 0).
    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::full(100.0)
    }
}

/// Type-specific part data carried through blueprints unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartProperties {
    /// No extra data.
    Plain,
    /// Wheel data.
    Wheel {
        /// Rolling radius.
        wheel_radius: f32,
        /// Friction coefficient.
        grip: f32,
    },
    /// Motor data.
    Motor {
        /// Peak torque.
        torque: f32,
        /// Maximum angular speed (rad/s).
        max_speed: f32,
    },
    /// Seat data.
    Seat {
        /// Number of occupants.
        capacity: u8,
    },
    /// Tool data.
    Tool {
        /// Tool identifier, interpreted by the game layer.
        tool: String,
    },
}

impl Default for PartProperties {
    fn default() -> Self {
        Self::Plain
    }
}

/// A placed part and its attachment points.
///
/// The point list is fixed once the part is registered: indices are stable
/// and double as the point half of [`PointId`](super::point::PointId).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part kind.
    pub kind: PartKind,
    /// World pose.
    pub pose: Pose,
    /// Mass in kg.
    pub mass: f32,
    /// Health.
    pub health: Health,
    /// Type-specific data.
    #[serde(default)]
    pub properties: PartProperties,
    points: Vec<AttachmentPoint>,
}

impl Part {
    /// Create a new part.
    pub fn new(kind: PartKind, pose: Pose, mass: f32, points: Vec<AttachmentPoint>) -> Self {
        Self {
            kind,
            pose,
            mass: mass.max(0.0),
            health: Health::default(),
            properties: PartProperties::Plain,
            points,
        }
    }

    /// Set health (builder style).
    pub fn with_health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    /// Set properties (builder style).
    pub fn with_properties(mut self, properties: PartProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Whether every float on the part (pose, mass, health, properties and
    /// point geometry) is finite.
    pub fn is_finite(&self) -> bool {
        let properties = match &self.properties {
            PartProperties::Wheel { wheel_radius, grip } => wheel_radius.is_finite() && grip.is_finite(),
            PartProperties::Motor { torque, max_speed } => torque.is_finite() && max_speed.is_finite(),
            PartProperties::Plain | PartProperties::Seat { .. } | PartProperties::Tool { .. } => true,
        };
        self.pose.is_finite()
            && self.mass.is_finite()
            && self.health.current.is_finite()
            && self.health.max.is_finite()
            && properties
            && self.points.iter().all(|p| {
                p.local_offset.is_finite() && p.direction.is_finite() && p.radius.is_finite()
            })
    }

    /// Attachment points in creation order.
    pub fn points(&self) -> &[AttachmentPoint] {
        &self.points
    }

    /// Get one attachment point.
    pub fn point(&self, index: usize) -> Option<&AttachmentPoint> {
        self.points.get(index)
    }

    pub(crate) fn point_mut(&mut self, index: usize) -> Option<&mut AttachmentPoint> {
        self.points.get_mut(index)
    }

    /// Clear occupancy on every point. Used when a part enters a graph.
    pub(crate) fn clear_occupancy(&mut self) {
        for point in &mut self.points {
            point.set_occupied(false);
        }
    }

    /// World position of a point.
    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.points
            .get(index)
            .map(|p| self.pose.transform_point(p.local_offset))
    }

    /// World direction of a point.
    pub fn world_direction(&self, index: usize) -> Option<Vec3> {
        self.points
            .get(index)
            .map(|p| self.pose.transform_vector(p.direction))
    }

    /// World pose of a point: positioned at the point, rotated so that local
    /// `+Z` follows the point direction.
    pub fn point_pose(&self, index: usize) -> Option<Pose> {
        let point = self.points.get(index)?;
        let position = self.pose.transform_point(point.local_offset);
        let orientation = self.pose.orientation * Quat::from_rotation_arc(Vec3::Z, point.direction);
        Some(Pose::new(position, orientation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::point::PointKind;
    use std::f32::consts::FRAC_PI_2;

    fn make_part(pose: Pose) -> Part {
        Part::new(
            PartKind::Block,
            pose,
            10.0,
            vec![AttachmentPoint::with_default_radius(PointKind::Universal, Vec3::X, Vec3::X)],
        )
    }

    #[test]
    fn test_world_position_follows_pose() {
        let part = make_part(Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2)));
        let world = part.world_position(0).unwrap();
        assert!((world - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);

        let dir = part.world_direction(0).unwrap();
        assert!((dir - Vec3::Y).length() < 1e-5);
        assert!(part.world_position(1).is_none());
    }

    #[test]
    fn test_point_pose_aligns_z_with_direction() {
        let part = make_part(Pose::default());
        let pose = part.point_pose(0).unwrap();
        assert!((pose.transform_vector(Vec3::Z) - Vec3::X).length() < 1e-5);
        assert!((pose.position - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_health_saturates() {
        let mut h = Health::full(50.0);
        assert_eq!(h.apply_damage(80.0), 0.0);
        assert!(h.is_destroyed());
        assert_eq!(h.repair(100.0), 50.0);
        assert_eq!(h.fraction(), 1.0);
        assert_eq!(Health::full(0.0).fraction(), 0.0);
    }

    #[test]
    fn test_properties_serde_tagged() {
        let props = PartProperties::Motor { torque: 40.0, max_speed: 12.0 };
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json["type"], "motor");
        let back: PartProperties = serde_json::from_value(json).unwrap();
        assert_eq!(back, props);
    }

    #[test]
    fn test_degenerate_orientation_falls_back_to_identity() {
        let pose = Pose::new(Vec3::ONE, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert_eq!(pose.orientation, Quat::IDENTITY);
        assert!(pose.is_finite());

        let pose = Pose::new(Vec3::ONE, Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0));
        assert_eq!(pose.orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_part_is_finite() {
        assert!(make_part(Pose::default()).is_finite());

        let mut part = make_part(Pose::default());
        part.pose.position.x = f32::NAN;
        assert!(!part.is_finite());

        let part = make_part(Pose::default()).with_properties(PartProperties::Motor {
            torque: f32::INFINITY,
            max_speed: 1.0,
        });
        assert!(!part.is_finite());
    }
}
