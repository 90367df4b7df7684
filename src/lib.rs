//! # assembly-kernel
//!
//! Attachment graph engine for snap-together vehicle assemblies.
//!
//! The kernel answers one question:
//!
//! > Given two parts in space, **may these two points be joined**, and if so,
//! > how do we remember it so the assembly can be rebuilt later?
//!
//! ## Core Contract
//!
//! 1. Parts own typed attachment points; a point carries at most one connection
//! 2. `connect` admits a pair only if kinds are compatible, the points are
//!    within the sum of their radii, and their directions face each other
//! 3. A blueprint stores parts plus endpoint positions, never point indices;
//!    loading re-derives the points greedily from geometry
//!
//! ## Architecture
//!
//! ```text
//! AttachmentController ──drag/snap──→ ConnectionGraph ──events──→ controller
//!                                           │
//!                                     BlueprintCodec
//!                                           ↓
//!                       BlueprintSnapshot → BlueprintStore (memory or fs)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Part ids are monotonic, so id order is insertion order
//! - Connection endpoints are stored in canonical order (lower point first)
//! - Same snapshot + same policy → identical rebuilt graph and fingerprint

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod compat;
pub mod policy;
pub mod graph;
pub mod catalog;
pub mod controller;
pub mod canonical;
pub mod blueprint;
pub mod store;
pub mod workspace;

// Re-exports
pub use types::{
    AttachmentPoint, Connection, ConnectionId, GraphEvent, Health, JointRequest, Part, PartId,
    PartKind, PartProperties, PointId, PointKind, Pose, DEFAULT_POINT_RADIUS,
};
pub use compat::compatible;
pub use policy::{SnapPolicyV1, SnapCandidate, DEFAULT_BREAK_THRESHOLD, DEFAULT_MAX_ALIGNMENT_DOT};
pub use graph::{AttachError, ConnectionGraph, GraphError, InvariantViolation};
pub use controller::{AttachmentController, ControllerError, DragSession, DragState, DropOutcome};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use blueprint::{
    BlueprintCodec, BlueprintMetadata, BlueprintSnapshot, BlueprintStats, CodecError,
    ConnectionRecord, PartRecord, PointRecord, Reconstruction, RecordError, SkippedRecord,
    BLUEPRINT_SCHEMA_VERSION,
};
pub use store::{BlueprintStore, InMemoryBlueprintStore, StoreError};
#[cfg(feature = "fs")]
pub use store::FileBlueprintStore;
pub use workspace::{LoadReport, SharedWorkspace, Workspace, WorkspaceError};

/// Schema version for all kernel types.
/// Increment on breaking changes to any schema type.
pub const ASSEMBLY_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "snap_policy_v1";
