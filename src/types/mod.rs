//! Core types for the assembly kernel.

pub mod point;
pub mod part;
pub mod connection;
pub mod event;

pub use point::{AttachmentPoint, PointId, PointKind, DEFAULT_POINT_RADIUS};
pub use part::{Health, Part, PartId, PartKind, PartProperties, Pose};
pub use connection::{Connection, ConnectionId, JointRequest};
pub use event::GraphEvent;
