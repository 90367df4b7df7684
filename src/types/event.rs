//! Graph change notifications.
//!
//! The graph queues plain data events as it mutates; the presentation layer
//! drains the queue once per tick (see
//! [`ConnectionGraph::drain_events`](crate::graph::ConnectionGraph::drain_events))
//! to update highlighting, inventory counts and physics joints.

use serde::{Deserialize, Serialize};

use super::connection::ConnectionId;
use super::part::{PartId, PartKind};
use super::point::PointId;

/// A single change to the attachment graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    /// A part was registered.
    PartAdded {
        /// New part.
        part: PartId,
        /// Its kind.
        kind: PartKind,
    },
    /// A part was destroyed, after its connections were detached.
    PartRemoved {
        /// Removed part.
        part: PartId,
        /// Connections detached by the cascade, in id order.
        detached: Vec<ConnectionId>,
    },
    /// A connection was committed; physics should create a joint.
    Connected {
        /// New connection.
        connection: ConnectionId,
        /// Lower endpoint.
        a: PointId,
        /// Upper endpoint.
        b: PointId,
    },
    /// A connection was removed; physics should drop the joint.
    Disconnected {
        /// Removed connection.
        connection: ConnectionId,
        /// Lower endpoint.
        a: PointId,
        /// Upper endpoint.
        b: PointId,
    },
    /// A part was moved.
    PoseChanged {
        /// Moved part.
        part: PartId,
    },
}

impl GraphEvent {
    /// Part the event is about, for part-level events.
    pub fn part(&self) -> Option<PartId> {
        match self {
            Self::PartAdded { part, .. }
            | Self::PartRemoved { part, .. }
            | Self::PoseChanged { part } => Some(*part),
            Self::Connected { .. } | Self::Disconnected { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_tag() {
        let event = GraphEvent::PartRemoved {
            part: PartId::new(4),
            detached: vec![ConnectionId::new(1)],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "part_removed");
        assert_eq!(event.part(), Some(PartId::new(4)));
    }
}
