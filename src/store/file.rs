//! File-system blueprint store (feature `fs`).
//!
//! One `<name>.blueprint.json` file per blueprint under a root directory.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! failed save never leaves a half-written blueprint behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::blueprint::BlueprintSnapshot;
use super::{decode, encode, validate_name, BlueprintStore, StoreError};

/// File extension for stored blueprints.
pub const BLUEPRINT_EXTENSION: &str = ".blueprint.json";

/// Blueprint store backed by a directory.
#[derive(Debug, Clone)]
pub struct FileBlueprintStore {
    root: PathBuf,
}

impl FileBlueprintStore {
    /// Create a store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}{BLUEPRINT_EXTENSION}")))
    }
}

#[async_trait]
impl BlueprintStore for FileBlueprintStore {
    type Error = StoreError;

    async fn save(&self, name: &str, blueprint: &BlueprintSnapshot) -> Result<(), Self::Error> {
        let path = self.path_for(name)?;
        let bytes = encode(blueprint)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "blueprint written");
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<BlueprintSnapshot>, Self::Error> {
        let path = self.path_for(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode(&bytes).map(Some)
    }

    async fn list(&self) -> Result<Vec<String>, Self::Error> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(BLUEPRINT_EXTENSION) {
                if validate_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, Self::Error> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
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
        graph.add_part(catalog::seat(Pose::default())).unwrap();
        BlueprintCodec::default().snapshot(&graph, BlueprintMetadata::new("seat", "test"))
    }

    #[tokio::test]
    async fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlueprintStore::new(dir.path().join("blueprints"));
        let blueprint = sample();

        store.save("seat", &blueprint).await.unwrap();
        assert!(store.path_for("seat").unwrap().exists());
        assert_eq!(store.load("seat").await.unwrap(), Some(blueprint));
        assert_eq!(store.list().await.unwrap(), vec!["seat"]);
    }

    #[tokio::test]
    async fn test_missing_root_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlueprintStore::new(dir.path().join("nope"));
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.load("ghost").await.unwrap().is_none());
        assert!(!store.delete("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlueprintStore::new(dir.path());
        store.save("seat", &sample()).await.unwrap();

        let path = store.path_for("seat").unwrap();
        let mut value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        value["blueprint"]["parts"][0]["mass"] = serde_json::json!(123.0);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(matches!(store.load("seat").await, Err(StoreError::Corrupted { .. })));
    }
}
