//! Snap policy definitions.

pub mod v1;
pub mod scoring;

pub use v1::{SnapPolicyV1, DEFAULT_BREAK_THRESHOLD, DEFAULT_MAX_ALIGNMENT_DOT};
pub use scoring::{best_candidate, SnapCandidate};
