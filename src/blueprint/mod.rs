//! Blueprints: persisted, position-based descriptions of an assembly.
//!
//! ```text
//! ConnectionGraph → snapshot → BlueprintSnapshot → (store) → build → ConnectionGraph
//!                                   ↓
//!                     parts[] + connections[(i, j, pos_a, pos_b)]
//! ```
//!
//! Part identity in a blueprint is the record index; point identity is not
//! stored at all and is re-derived on load from geometry and point kinds.

pub mod document;
pub mod stats;
pub mod codec;

// Re-exports
pub use document::{
    normalize_tags, BlueprintMetadata, BlueprintSnapshot, ConnectionRecord, PartRecord, PointRecord,
};
pub use stats::BlueprintStats;
pub use codec::{BlueprintCodec, CodecError, Reconstruction, RecordError, SkippedRecord};

/// Blueprint schema version. Increment the major on breaking changes.
pub const BLUEPRINT_SCHEMA_VERSION: &str = "1.0.0";
