//! Attachment point types.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::part::PartId;

/// Default match tolerance for catalog points.
pub const DEFAULT_POINT_RADIUS: f32 = 0.5;

/// Type of an attachment point.
///
/// The kind decides which other points it may bond with, see
/// [`compatible`](crate::compat::compatible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PointKind {
    /// Bonds with any kind.
    Universal,
    /// Frame-to-frame joint.
    Structural,
    /// Axle socket for wheels.
    WheelMount,
    /// Shaft socket for motors.
    MotorMount,
    /// Adapter between structural frame and mounted equipment.
    Linkage,
    /// Tool socket.
    ToolMount,
    /// Seat socket.
    SeatMount,
}

impl PointKind {
    /// Every kind, in declaration order.
    pub const ALL: [PointKind; 7] = [
        Self::Universal,
        Self::Structural,
        Self::WheelMount,
        Self::MotorMount,
        Self::Linkage,
        Self::ToolMount,
        Self::SeatMount,
    ];

    /// Parse point kind from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "universal" => Some(Self::Universal),
            "structural" => Some(Self::Structural),
            "wheel_mount" | "wheelmount" => Some(Self::WheelMount),
            "motor_mount" | "motormount" => Some(Self::MotorMount),
            "linkage" => Some(Self::Linkage),
            "tool_mount" | "toolmount" => Some(Self::ToolMount),
            "seat_mount" | "seatmount" => Some(Self::SeatMount),
            _ => None,
        }
    }
}

impl Default for PointKind {
    fn default() -> Self {
        Self::Universal
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universal => write!(f, "universal"),
            Self::Structural => write!(f, "structural"),
            Self::WheelMount => write!(f, "wheel_mount"),
            Self::MotorMount => write!(f, "motor_mount"),
            Self::Linkage => write!(f, "linkage"),
            Self::ToolMount => write!(f, "tool_mount"),
            Self::SeatMount => write!(f, "seat_mount"),
        }
    }
}

/// Stable identity of an attachment point: owning part plus index in that
/// part's point list.
///
/// Orders by part first, then index, so sorting point ids sorts by part
/// insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointId {
    /// Owning part.
    pub part: PartId,
    /// Index into the part's point list.
    pub index: usize,
}

impl PointId {
    /// Create a new point id.
    pub fn new(part: PartId, index: usize) -> Self {
        Self { part, index }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.part, self.index)
    }
}

/// A typed, directional socket on a part.
///
/// Geometry is part-local. Occupancy is owned by the
/// [`ConnectionGraph`](crate::graph::ConnectionGraph): it is only set or
/// cleared when a connection is recorded or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentPoint {
    /// Type of the point.
    pub kind: PointKind,
    /// Position relative to the owning part.
    pub local_offset: Vec3,
    /// Outward unit direction, part-local.
    pub direction: Vec3,
    /// Match tolerance.
    pub radius: f32,
    /// Disabled points never take part in a connection.
    pub active: bool,
    #[serde(skip)]
    occupied: bool,
}

impl AttachmentPoint {
    /// Create a new active, unoccupied point.
    ///
    /// `direction` is normalised; a zero vector falls back to `+Z`.
    pub fn new(kind: PointKind, local_offset: Vec3, direction: Vec3, radius: f32) -> Self {
        Self {
            kind,
            local_offset,
            direction: direction.try_normalize().unwrap_or(Vec3::Z),
            radius: radius.max(0.0),
            active: true,
            occupied: false,
        }
    }

    /// Create a point with the default radius.
    pub fn with_default_radius(kind: PointKind, local_offset: Vec3, direction: Vec3) -> Self {
        Self::new(kind, local_offset, direction, DEFAULT_POINT_RADIUS)
    }

    /// Whether a connection currently terminates here.
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Whether the point can accept a new connection.
    pub fn is_available(&self) -> bool {
        self.active && !self.occupied
    }

    pub(crate) fn set_occupied(&mut self, occupied: bool) {
        self.occupied = occupied;
    }
}
