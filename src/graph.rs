//! Live attachment graph.
//!
//! Parts live in an arena keyed by [`PartId`]; each part owns its points, and
//! a point is addressed by `(part, index)`. Connections are a separate table
//! of id pairs plus a point -> connection index, so there are no
//! back-references between parts and connections and cascading removal is a
//! range scan.
//!
//! ## Invariants
//!
//! - A point is occupied iff exactly one connection references it
//! - No connection references a point of a removed part
//! - No connection joins two points of the same part
//!
//! Every mutating call either completes or leaves the graph unchanged.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec3;
use tracing::debug;

use crate::compat::compatible;
use crate::policy::SnapPolicyV1;
use crate::types::{
    AttachmentPoint, Connection, ConnectionId, GraphEvent, JointRequest, Part, PartId, PartKind,
    PointId, PointKind, Pose,
};

/// Error returned by attach/detach operations.
///
/// All variants are recoverable: the graph is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttachError {
    /// Point does not exist (stale part id or index out of range).
    #[error("Unknown attachment point: {0}")]
    UnknownPoint(PointId),
    /// Connection id is not live.
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
    /// Both points belong to one part.
    #[error("Points {0} and {1} belong to the same part")]
    SamePart(PointId, PointId),
    /// Point is disabled.
    #[error("Attachment point is inactive: {0}")]
    Inactive(PointId),
    /// Point already carries a connection.
    #[error("Attachment point already occupied: {0}")]
    AlreadyOccupied(PointId),
    /// Kinds may not bond.
    #[error("Incompatible point kinds: {0} and {1}")]
    Incompatible(PointKind, PointKind),
    /// Points are further apart than the sum of their radii.
    #[error("Points too far apart: {distance} > {reach}")]
    TooFar {
        /// World distance between the points.
        distance: f32,
        /// Sum of both radii.
        reach: f32,
    },
    /// Directions are not opposed enough.
    #[error("Points not facing each other: dot {dot} >= {threshold}")]
    BadOrientation {
        /// Dot product of the world directions.
        dot: f32,
        /// Policy threshold.
        threshold: f32,
    },
}

/// Error returned by part-level operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Part not found.
    #[error("Part not found: {0}")]
    UnknownPart(PartId),
    /// Part has no attachment points and the policy requires connectivity.
    #[error("Part has no attachment points")]
    NoAttachmentPoints,
    /// Pose has a NaN or infinite component.
    #[error("Pose is not finite: {0:?}")]
    NonFinitePose(Pose),
    /// Mass, health, properties or point geometry has a NaN or infinite value.
    #[error("Part geometry is not finite ({0})")]
    NonFiniteGeometry(PartKind),
}

/// A broken structural invariant, reported by
/// [`ConnectionGraph::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A connection references a point that no longer exists.
    DanglingConnection {
        /// Offending connection.
        connection: ConnectionId,
        /// Missing endpoint.
        point: PointId,
    },
    /// A connection joins a part to itself.
    SelfLoop {
        /// Offending connection.
        connection: ConnectionId,
    },
    /// Two connections share an endpoint.
    SharedEndpoint {
        /// Shared point.
        point: PointId,
        /// Number of connections referencing it.
        count: usize,
    },
    /// Point occupancy flag disagrees with the connection table.
    OccupancyMismatch {
        /// Offending point.
        point: PointId,
        /// Flag stored on the point.
        occupied: bool,
    },
}

/// Registry of live parts and the connections between their points.
///
/// Uses BTreeMap throughout for deterministic iteration order.
#[derive(Debug, Clone)]
pub struct ConnectionGraph {
    policy: SnapPolicyV1,
    /// Parts by id (id order = insertion order).
    parts: BTreeMap<PartId, Part>,
    /// Live connections.
    connections: BTreeMap<ConnectionId, Connection>,
    /// Point -> connection terminating there.
    by_point: BTreeMap<PointId, ConnectionId>,
    next_part: u64,
    next_connection: u64,
    /// Notifications not yet drained.
    events: Vec<GraphEvent>,
}

impl Default for ConnectionGraph {
    fn default() -> Self {
        Self::new(SnapPolicyV1::default())
    }
}

impl ConnectionGraph {
    /// Create an empty graph governed by `policy`.
    pub fn new(policy: SnapPolicyV1) -> Self {
        Self {
            policy,
            parts: BTreeMap::new(),
            connections: BTreeMap::new(),
            by_point: BTreeMap::new(),
            next_part: 1,
            next_connection: 1,
            events: Vec::new(),
        }
    }

    /// The policy this graph enforces.
    pub fn policy(&self) -> &SnapPolicyV1 {
        &self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parts
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a part. Its points start unoccupied.
    ///
    /// Isolated parts are legal unless the policy sets
    /// `require_connectivity`, in which case a part without points is
    /// rejected.
    pub fn add_part(&mut self, mut part: Part) -> Result<PartId, GraphError> {
        if self.policy.require_connectivity && part.points().is_empty() {
            return Err(GraphError::NoAttachmentPoints);
        }
        if !part.pose.is_finite() {
            return Err(GraphError::NonFinitePose(part.pose));
        }
        if !part.is_finite() {
            return Err(GraphError::NonFiniteGeometry(part.kind));
        }

        part.clear_occupancy();
        let id = PartId::new(self.next_part);
        self.next_part += 1;

        let kind = part.kind;
        self.parts.insert(id, part);
        self.events.push(GraphEvent::PartAdded { part: id, kind });
        debug!(part = %id, %kind, "part added");
        Ok(id)
    }

    /// Destroy a part, detaching every connection touching it first.
    ///
    /// Returns the removed part with its points unoccupied.
    pub fn remove_part(&mut self, id: PartId) -> Result<Part, GraphError> {
        if !self.parts.contains_key(&id) {
            return Err(GraphError::UnknownPart(id));
        }

        let detached = self.connections_of(id);
        for connection in &detached {
            self.detach(*connection);
        }

        let mut part = self.parts.remove(&id).ok_or(GraphError::UnknownPart(id))?;
        part.clear_occupancy();

        debug!(part = %id, detached = detached.len(), "part removed");
        self.events.push(GraphEvent::PartRemoved { part: id, detached });
        Ok(part)
    }

    /// Get a part.
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(&id)
    }

    /// Whether the part is live.
    pub fn contains_part(&self, id: PartId) -> bool {
        self.parts.contains_key(&id)
    }

    /// All parts in insertion order.
    pub fn parts(&self) -> impl Iterator<Item = (PartId, &Part)> + '_ {
        self.parts.iter().map(|(id, part)| (*id, part))
    }

    /// All part ids in insertion order.
    pub fn part_ids(&self) -> Vec<PartId> {
        self.parts.keys().copied().collect()
    }

    /// Number of live parts.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Move a part. Connections are kept; enforcing them is the physics
    /// layer's job.
    /// A non-finite pose is rejected and the part stays where it was.
    pub fn set_pose(&mut self, id: PartId, pose: Pose) -> Result<(), GraphError> {
        let part = self.parts.get_mut(&id).ok_or(GraphError::UnknownPart(id))?;
        if !pose.is_finite() {
            return Err(GraphError::NonFinitePose(pose));
        }
        part.pose = pose;
        self.events.push(GraphEvent::PoseChanged { part: id });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Points
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an attachment point.
    pub fn point(&self, id: PointId) -> Option<&AttachmentPoint> {
        self.parts.get(&id.part).and_then(|p| p.point(id.index))
    }

    /// All point ids of a part, in index order.
    pub fn point_ids(&self, part: PartId) -> Vec<PointId> {
        self.parts
            .get(&part)
            .map(|p| (0..p.points().len()).map(|i| PointId::new(part, i)).collect())
            .unwrap_or_default()
    }

    /// World position of a point.
    pub fn world_position(&self, id: PointId) -> Option<Vec3> {
        self.parts.get(&id.part).and_then(|p| p.world_position(id.index))
    }

    /// World direction of a point.
    pub fn world_direction(&self, id: PointId) -> Option<Vec3> {
        self.parts.get(&id.part).and_then(|p| p.world_direction(id.index))
    }

    /// Enable or disable a point. An occupied point cannot be disabled.
    pub fn set_point_active(&mut self, id: PointId, active: bool) -> Result<(), AttachError> {
        let point = self
            .parts
            .get_mut(&id.part)
            .and_then(|p| p.point_mut(id.index))
            .ok_or(AttachError::UnknownPoint(id))?;

        if !active && point.is_occupied() {
            return Err(AttachError::AlreadyOccupied(id));
        }
        point.active = active;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────────────────────

    /// Run every `connect` check without mutating anything.
    ///
    /// Returns the world distance between the points on success.
    pub fn check_pair(&self, a: PointId, b: PointId) -> Result<f32, AttachError> {
        let part_a = self.parts.get(&a.part).ok_or(AttachError::UnknownPoint(a))?;
        let part_b = self.parts.get(&b.part).ok_or(AttachError::UnknownPoint(b))?;
        let point_a = part_a.point(a.index).ok_or(AttachError::UnknownPoint(a))?;
        let point_b = part_b.point(b.index).ok_or(AttachError::UnknownPoint(b))?;

        if a.part == b.part {
            return Err(AttachError::SamePart(a, b));
        }
        if !point_a.active {
            return Err(AttachError::Inactive(a));
        }
        if !point_b.active {
            return Err(AttachError::Inactive(b));
        }
        if point_a.is_occupied() {
            return Err(AttachError::AlreadyOccupied(a));
        }
        if point_b.is_occupied() {
            return Err(AttachError::AlreadyOccupied(b));
        }
        if !compatible(point_a.kind, point_b.kind) {
            return Err(AttachError::Incompatible(point_a.kind, point_b.kind));
        }

        let pos_a = part_a.pose.transform_point(point_a.local_offset);
        let pos_b = part_b.pose.transform_point(point_b.local_offset);
        let distance = pos_a.distance(pos_b);
        let reach = point_a.radius + point_b.radius;
        if distance > reach {
            return Err(AttachError::TooFar { distance, reach });
        }

        let dir_a = part_a.pose.transform_vector(point_a.direction);
        let dir_b = part_b.pose.transform_vector(point_b.direction);
        let dot = dir_a.dot(dir_b);
        if !self.policy.orientation_ok(dot) {
            return Err(AttachError::BadOrientation {
                dot,
                threshold: self.policy.max_alignment_dot,
            });
        }

        Ok(distance)
    }

    /// Connect two points with the policy's default break threshold.
    pub fn connect(&mut self, a: PointId, b: PointId) -> Result<ConnectionId, AttachError> {
        let threshold = self.policy.default_break_threshold;
        self.connect_with_threshold(a, b, threshold)
    }

    /// Connect two points.
    ///
    /// Connecting an already-connected pair again fails with
    /// `AlreadyOccupied`; no duplicate edge is created.
    pub fn connect_with_threshold(
        &mut self,
        a: PointId,
        b: PointId,
        break_threshold: f32,
    ) -> Result<ConnectionId, AttachError> {
        self.check_pair(a, b)?;

        let id = ConnectionId::new(self.next_connection);
        self.next_connection += 1;

        let connection = Connection::new(a, b, break_threshold.max(0.0));
        self.set_occupied(a, true);
        self.set_occupied(b, true);
        self.by_point.insert(a, id);
        self.by_point.insert(b, id);
        self.connections.insert(id, connection);

        debug!(connection = %id, a = %connection.a(), b = %connection.b(), "connected");
        self.events.push(GraphEvent::Connected {
            connection: id,
            a: connection.a(),
            b: connection.b(),
        });
        Ok(id)
    }

    /// Remove a connection and clear occupancy on both endpoints.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<Connection, AttachError> {
        self.detach(id).ok_or(AttachError::UnknownConnection(id))
    }

    fn detach(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        let (a, b) = connection.endpoints();
        self.by_point.remove(&a);
        self.by_point.remove(&b);
        self.set_occupied(a, false);
        self.set_occupied(b, false);

        debug!(connection = %id, "disconnected");
        self.events.push(GraphEvent::Disconnected { connection: id, a, b });
        Some(connection)
    }

    fn set_occupied(&mut self, id: PointId, occupied: bool) {
        if let Some(point) = self.parts.get_mut(&id.part).and_then(|p| p.point_mut(id.index)) {
            point.set_occupied(occupied);
        }
    }

    /// Get a connection.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All connections in id order.
    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> + '_ {
        self.connections.iter().map(|(id, c)| (*id, c))
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connection terminating at a point, if any.
    pub fn connection_at(&self, point: PointId) -> Option<ConnectionId> {
        self.by_point.get(&point).copied()
    }

    /// All connections touching any point of `part`, in id order.
    pub fn connections_of(&self, part: PartId) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .by_point
            .range(PointId::new(part, 0)..=PointId::new(part, usize::MAX))
            .map(|(_, id)| *id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Parts directly connected to `part`, in id order.
    pub fn neighbors(&self, part: PartId) -> Vec<PartId> {
        let set: BTreeSet<PartId> = self
            .connections_of(part)
            .into_iter()
            .filter_map(|id| self.connections.get(&id))
            .filter_map(|c| c.other_part(part))
            .collect();
        set.into_iter().collect()
    }

    /// Connected components of parts. Each group is sorted; groups are
    /// ordered by their first part.
    pub fn assemblies(&self) -> Vec<Vec<PartId>> {
        let mut seen: BTreeSet<PartId> = BTreeSet::new();
        let mut groups = Vec::new();

        for &start in self.parts.keys() {
            if !seen.insert(start) {
                continue;
            }
            let mut group = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                group.push(current);
                for next in self.neighbors(current) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            group.sort();
            groups.push(group);
        }

        groups
    }

    /// Joint request for the physics layer.
    pub fn joint_request(&self, id: ConnectionId) -> Option<JointRequest> {
        let connection = self.connections.get(&id)?;
        let (a, b) = connection.endpoints();
        let pose_a = self.parts.get(&a.part)?.point_pose(a.index)?;
        let pose_b = self.parts.get(&b.part)?.point_pose(b.index)?;
        Some(JointRequest {
            connection: id,
            pose_a,
            pose_b,
            break_threshold: connection.break_threshold,
        })
    }

    /// Joint requests for every live connection, in id order.
    pub fn joint_requests(&self) -> Vec<JointRequest> {
        self.connections
            .keys()
            .filter_map(|id| self.joint_request(*id))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Take all queued notifications, oldest first.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queued notifications, oldest first.
    pub fn pending_events(&self) -> &[GraphEvent] {
        &self.events
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Check every structural invariant. Returns all violations found.
    pub fn check_invariants(&self) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        let mut refs: BTreeMap<PointId, usize> = BTreeMap::new();

        for (id, connection) in &self.connections {
            let (a, b) = connection.endpoints();
            if a.part == b.part {
                violations.push(InvariantViolation::SelfLoop { connection: *id });
            }
            for point in [a, b] {
                if self.point(point).is_none() {
                    violations.push(InvariantViolation::DanglingConnection {
                        connection: *id,
                        point,
                    });
                }
                *refs.entry(point).or_default() += 1;
            }
        }

        for (point, count) in &refs {
            if *count > 1 {
                violations.push(InvariantViolation::SharedEndpoint {
                    point: *point,
                    count: *count,
                });
            }
        }

        for (part_id, part) in &self.parts {
            for (index, point) in part.points().iter().enumerate() {
                let id = PointId::new(*part_id, index);
                let referenced = refs.contains_key(&id);
                if point.is_occupied() != referenced {
                    violations.push(InvariantViolation::OccupancyMismatch {
                        point: id,
                        occupied: point.is_occupied(),
                    });
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
