//! Connection types for the attachment graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::part::{PartId, Pose};
use super::point::PointId;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a connection id from its raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Bond between two attachment points on two distinct parts.
///
/// Stored once per pair: endpoints are kept in canonical order (`a < b`),
/// so the same bond looks identical from either side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Connection {
    a: PointId,
    b: PointId,
    /// Force/torque magnitude at which the physics layer may sever the bond.
    pub break_threshold: f32,
}

impl Connection {
    /// Create a new connection. Endpoint order is normalised.
    pub fn new(p: PointId, q: PointId, break_threshold: f32) -> Self {
        let (a, b) = if p <= q { (p, q) } else { (q, p) };
        Self { a, b, break_threshold }
    }

    /// Lower endpoint.
    pub fn a(&self) -> PointId {
        self.a
    }

    /// Upper endpoint.
    pub fn b(&self) -> PointId {
        self.b
    }

    /// Both endpoints, lower first.
    pub fn endpoints(&self) -> (PointId, PointId) {
        (self.a, self.b)
    }

    /// Whether `point` is an endpoint.
    pub fn touches(&self, point: PointId) -> bool {
        self.a == point || self.b == point
    }

    /// Whether either endpoint belongs to `part`.
    pub fn touches_part(&self, part: PartId) -> bool {
        self.a.part == part || self.b.part == part
    }

    /// The endpoint opposite `point`, if `point` is an endpoint.
    pub fn other_end(&self, point: PointId) -> Option<PointId> {
        if self.a == point {
            Some(self.b)
        } else if self.b == point {
            Some(self.a)
        } else {
            None
        }
    }

    /// The part on the other side from `part`.
    pub fn other_part(&self, part: PartId) -> Option<PartId> {
        if self.a.part == part {
            Some(self.b.part)
        } else if self.b.part == part {
            Some(self.a.part)
        } else {
            None
        }
    }
}

/// Rigid joint request handed to the external physics layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointRequest {
    /// Connection this joint enforces.
    pub connection: ConnectionId,
    /// World pose of endpoint `a`.
    pub pose_a: Pose,
    /// World pose of endpoint `b`.
    pub pose_b: Pose,
    /// Break threshold.
    pub break_threshold: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(part: u64, index: usize) -> PointId {
        PointId::new(PartId::new(part), index)
    }

    #[test]
    fn test_connection_is_symmetric() {
        let c1 = Connection::new(pid(2, 0), pid(1, 3), 10.0);
        let c2 = Connection::new(pid(1, 3), pid(2, 0), 10.0);
        assert_eq!(c1, c2);
        assert_eq!(c1.a(), pid(1, 3));
    }

    #[test]
    fn test_other_end() {
        let c = Connection::new(pid(1, 0), pid(2, 1), 10.0);
        assert_eq!(c.other_end(pid(1, 0)), Some(pid(2, 1)));
        assert_eq!(c.other_end(pid(2, 1)), Some(pid(1, 0)));
        assert_eq!(c.other_end(pid(3, 0)), None);
        assert_eq!(c.other_part(PartId::new(2)), Some(PartId::new(1)));
        assert!(c.touches_part(PartId::new(1)));
        assert!(!c.touches_part(PartId::new(3)));
    }
}
