//! In-memory blueprint store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::blueprint::BlueprintSnapshot;
use super::{decode, encode, validate_name, BlueprintStore, StoreError};

/// In-memory blueprint store.
///
/// Keeps encoded envelopes rather than live values so loads go through the
/// same decode and integrity check as the file store. Uses a BTreeMap for
/// deterministic listing order.
#[derive(Debug, Default)]
pub struct InMemoryBlueprintStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlueprintStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blueprints.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Store raw envelope bytes under `name` without encoding, e.g. bytes
    /// received from elsewhere.
    pub fn insert_raw(&self, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        validate_name(name)?;
        self.entries.write().insert(name.to_string(), bytes);
        Ok(())
    }
}

#[async_trait]
impl BlueprintStore for InMemoryBlueprintStore {
    type Error = StoreError;

    async fn save(&self, name: &str, blueprint: &BlueprintSnapshot) -> Result<(), Self::Error> {
        validate_name(name)?;
        let bytes = encode(blueprint)?;
        self.entries.write().insert(name.to_string(), bytes);
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<BlueprintSnapshot>, Self::Error> {
        validate_name(name)?;
        let bytes = match self.entries.read().get(name) {
            Some(bytes) => bytes.clone(),
            None => return Ok(None),
        };
        decode(&bytes).map(Some)
    }

    async fn list(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Self::Error> {
        validate_name(name)?;
        Ok(self.entries.write().remove(name).is_some())
    }
}
