//! Blueprint storage backends.
//!
//! Blueprints are stored as a JSON envelope carrying a SHA-256 hash of the
//! canonical blueprint bytes; the hash is checked on every load so a
//! truncated or hand-edited file is reported instead of half-loaded.

pub mod memory;

#[cfg(feature = "fs")]
pub mod file;

use std::sync::OnceLock;

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::blueprint::BlueprintSnapshot;
use crate::canonical::to_canonical_bytes;

/// Envelope format identifier.
pub const BLUEPRINT_FORMAT: &str = "blueprint_v1";

/// Error type shared by the bundled stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Bytes are not a valid envelope.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Content hash does not match the blueprint.
    #[error("Blueprint corrupted: expected hash {expected}, got {actual}")]
    Corrupted {
        /// Hash stored in the envelope.
        expected: String,
        /// Hash of the content actually read.
        actual: String,
    },
    /// Envelope was written in an unknown format.
    #[error("Unknown blueprint format: {0}")]
    UnknownFormat(String),
    /// Name is not a valid blueprint name.
    #[error("Invalid blueprint name: {0:?}")]
    InvalidName(String),
    /// Blueprint holds a NaN or infinite float, which JSON cannot carry.
    #[error("Blueprint has a non-finite value at {0}")]
    NonFinite(String),
}

/// Trait for blueprint storage backends.
///
/// Names are validated with [`validate_name`] by every backend.
#[async_trait]
pub trait BlueprintStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Save a blueprint under `name`, replacing any previous one.
    async fn save(&self, name: &str, blueprint: &BlueprintSnapshot) -> Result<(), Self::Error>;

    /// Load a blueprint by name.
    async fn load(&self, name: &str) -> Result<Option<BlueprintSnapshot>, Self::Error>;

    /// All stored names, sorted.
    async fn list(&self) -> Result<Vec<String>, Self::Error>;

    /// Delete a blueprint. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Self::Error>;
}

pub use memory::InMemoryBlueprintStore;

#[cfg(feature = "fs")]
pub use file::FileBlueprintStore;

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("static regex"))
}

/// Check that `name` is 1-64 characters of `[A-Za-z0-9_-]`.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedBlueprint {
    format: String,
    content_hash: String,
    blueprint: BlueprintSnapshot,
}

/// SHA-256 of the canonical blueprint bytes, hex encoded.
pub fn content_hash(blueprint: &BlueprintSnapshot) -> String {
    hex::encode(Sha256::digest(to_canonical_bytes(blueprint)))
}

/// Encode a blueprint into its persisted envelope.
///
/// Fails with `NonFinite` rather than writing a document that could not be
/// decoded again. Metadata is normalised first so the hash matches what a
/// later decode will see.
pub fn encode(blueprint: &BlueprintSnapshot) -> Result<Vec<u8>, StoreError> {
    let mut blueprint = blueprint.clone();
    blueprint.metadata.normalize();
    if let Some(field) = blueprint.non_finite_field() {
        return Err(StoreError::NonFinite(field));
    }
    let envelope = PersistedBlueprint {
        format: BLUEPRINT_FORMAT.to_string(),
        content_hash: content_hash(&blueprint),
        blueprint,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Decode and verify a persisted envelope.
pub fn decode(bytes: &[u8]) -> Result<BlueprintSnapshot, StoreError> {
    let envelope: PersistedBlueprint = serde_json::from_slice(bytes)?;
    if envelope.format != BLUEPRINT_FORMAT {
        return Err(StoreError::UnknownFormat(envelope.format));
    }
    let actual = content_hash(&envelope.blueprint);
    if actual != envelope.content_hash {
        return Err(StoreError::Corrupted {
            expected: envelope.content_hash,
            actual,
        });
    }
    Ok(envelope.blueprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{BlueprintCodec, BlueprintMetadata};
    use crate::catalog;
    use crate::graph::ConnectionGraph;
    use crate::types::Pose;

    fn sample() -> BlueprintSnapshot {
        let mut graph = ConnectionGraph::default();
        graph.add_part(catalog::block(Pose::default())).unwrap();
        BlueprintCodec::default().snapshot(&graph, BlueprintMetadata::new("sample", "test"))
    }

    #[test]
    fn test_encode_decode() {
        let blueprint = sample();
        let bytes = encode(&blueprint).unwrap();
        assert_eq!(decode(&bytes).unwrap(), blueprint);
    }

    #[test]
    fn test_tampered_content_detected() {
        let bytes = encode(&sample()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["blueprint"]["parts"][0]["mass"] = serde_json::json!(999.0);
        let tampered = serde_json::to_vec(&value).unwrap();

        assert!(matches!(decode(&tampered), Err(StoreError::Corrupted { .. })));
    }

    #[test]
    fn test_unknown_format() {
        let bytes = encode(&sample()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["format"] = serde_json::json!("blueprint_v0");
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(decode(&bytes), Err(StoreError::UnknownFormat(f)) if f == "blueprint_v0"));
    }

    #[test]
    fn test_non_finite_blueprint_refused_on_save() {
        let mut blueprint = sample();
        blueprint.parts[0].pose.position.x = f32::NAN;

        match encode(&blueprint) {
            Err(StoreError::NonFinite(field)) => assert_eq!(field, "parts[0].pose.position"),
            other => panic!("expected NonFinite, got {other:?}"),
        }
    }

    #[test]
    fn test_unnormalised_metadata_still_decodes() {
        let mut blueprint = sample();
        blueprint.metadata.tags = vec!["Off Road".to_string()];
        blueprint.metadata.rating = 11.0;

        let decoded = decode(&encode(&blueprint).unwrap()).unwrap();
        assert_eq!(decoded.metadata.tags, vec!["off-road"]);
        assert_eq!(decoded.metadata.rating, 5.0);
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        assert!(matches!(decode(b"{not json"), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("dune_buggy-2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name(&"x".repeat(65)).is_err());
    }
}
