//! Workspace: the live assembly plus its controller and codec.
//!
//! Loading is all-or-nothing for the live graph: a blueprint is fetched,
//! decoded and rebuilt into a fresh graph first, and only a successful
//! rebuild replaces what the user is editing.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::blueprint::{BlueprintCodec, BlueprintMetadata, BlueprintSnapshot, CodecError, SkippedRecord};
use crate::controller::AttachmentController;
use crate::graph::{ConnectionGraph, GraphError};
use crate::policy::SnapPolicyV1;
use crate::store::BlueprintStore;
use crate::types::{GraphEvent, Part, PartId};

/// Error type for workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Store failed.
    #[error("Store error: {0}")]
    Store(String),
    /// No blueprint under that name.
    #[error("Blueprint not found: {0}")]
    NotFound(String),
    /// Blueprint could not be rebuilt.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Graph refused an edit.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl WorkspaceError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }
}

/// Summary of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Parts in the new live graph.
    pub part_count: usize,
    /// Connections restored.
    pub connection_count: usize,
    /// Connection records that were dropped.
    pub skipped: Vec<SkippedRecord>,
}

impl LoadReport {
    /// Whether every connection record was restored.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Workspace shared across threads. The lock is the single-writer boundary;
/// never hold it across an `.await`.
pub type SharedWorkspace = Arc<RwLock<Workspace>>;

/// The live assembly being edited.
#[derive(Debug, Clone)]
pub struct Workspace {
    policy: SnapPolicyV1,
    graph: ConnectionGraph,
    controller: AttachmentController,
    codec: BlueprintCodec,
}

impl Workspace {
    /// Create an empty workspace. Graph, controller and codec share `policy`.
    pub fn new(policy: SnapPolicyV1) -> Self {
        Self {
            graph: ConnectionGraph::new(policy.clone()),
            controller: AttachmentController::new(policy.clone()),
            codec: BlueprintCodec::new(policy.clone()),
            policy,
        }
    }

    /// Wrap into a [`SharedWorkspace`].
    pub fn into_shared(self) -> SharedWorkspace {
        Arc::new(RwLock::new(self))
    }

    /// Policy in force.
    pub fn policy(&self) -> &SnapPolicyV1 {
        &self.policy
    }

    /// Live graph.
    pub fn graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    /// Live graph, mutably. Call [`Workspace::pump_events`] after edits so
    /// the controller sees removals.
    pub fn graph_mut(&mut self) -> &mut ConnectionGraph {
        &mut self.graph
    }

    /// Controller.
    pub fn controller(&self) -> &AttachmentController {
        &self.controller
    }

    /// Graph and controller borrowed together, for drag calls.
    pub fn split_mut(&mut self) -> (&mut ConnectionGraph, &mut AttachmentController) {
        (&mut self.graph, &mut self.controller)
    }

    /// Codec.
    pub fn codec(&self) -> &BlueprintCodec {
        &self.codec
    }

    /// Place a part in the live graph.
    pub fn add_part(&mut self, part: Part) -> Result<PartId, WorkspaceError> {
        let id = self.graph.add_part(part)?;
        self.pump_events();
        Ok(id)
    }

    /// Delete a part, detaching its connections and aborting a drag of it.
    pub fn remove_part(&mut self, id: PartId) -> Result<Part, WorkspaceError> {
        let part = self.graph.remove_part(id)?;
        self.pump_events();
        Ok(part)
    }

    /// Drain pending graph events, forwarding each to the controller.
    pub fn pump_events(&mut self) -> Vec<GraphEvent> {
        let events = self.graph.drain_events();
        for event in &events {
            self.controller.handle_event(event);
        }
        events
    }

    /// Capture the live graph. `metadata` is touched before it is stored.
    pub fn snapshot(&self, mut metadata: BlueprintMetadata) -> BlueprintSnapshot {
        metadata.touch();
        self.codec.snapshot(&self.graph, metadata)
    }

    /// Snapshot the live graph and persist it under `name`.
    pub async fn save<S: BlueprintStore>(
        &self,
        store: &S,
        name: &str,
        metadata: BlueprintMetadata,
    ) -> Result<BlueprintSnapshot, WorkspaceError> {
        let snapshot = self.snapshot(metadata);
        store
            .save(name, &snapshot)
            .await
            .map_err(WorkspaceError::from_store)?;
        info!(name, parts = snapshot.parts.len(), "blueprint saved");
        Ok(snapshot)
    }

    /// Load `name` from `store` and make it the live graph.
    pub async fn load<S: BlueprintStore>(
        &mut self,
        store: &S,
        name: &str,
    ) -> Result<LoadReport, WorkspaceError> {
        let snapshot = fetch(store, name).await?;
        self.install(&snapshot)
    }

    /// Rebuild `snapshot` and make it the live graph.
    ///
    /// On error nothing changes. On success any drag in progress is dropped,
    /// since its part belonged to the old graph.
    pub fn install(&mut self, snapshot: &BlueprintSnapshot) -> Result<LoadReport, WorkspaceError> {
        let rebuilt = self.codec.build(snapshot)?;

        if let Some(part) = self.controller.dragged_part() {
            info!(part = %part, "drag dropped by blueprint load");
        }
        self.controller = AttachmentController::new(self.policy.clone());
        self.graph = rebuilt.graph;

        let report = LoadReport {
            part_count: self.graph.part_count(),
            connection_count: self.graph.connection_count(),
            skipped: rebuilt.skipped,
        };
        if !report.is_complete() {
            warn!(
                name = %snapshot.metadata.name,
                skipped = report.skipped.len(),
                "blueprint loaded with skipped connections"
            );
        }
        Ok(report)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(SnapPolicyV1::default())
    }
}

async fn fetch<S: BlueprintStore>(store: &S, name: &str) -> Result<BlueprintSnapshot, WorkspaceError> {
    store
        .load(name)
        .await
        .map_err(WorkspaceError::from_store)?
        .ok_or_else(|| WorkspaceError::NotFound(name.to_string()))
}

/// Save a shared workspace. The snapshot is taken under a read lock that is
/// released before the store is awaited.
pub async fn save_shared<S: BlueprintStore>(
    workspace: &SharedWorkspace,
    store: &S,
    name: &str,
    metadata: BlueprintMetadata,
) -> Result<BlueprintSnapshot, WorkspaceError> {
    let snapshot = workspace.read().snapshot(metadata);
    store
        .save(name, &snapshot)
        .await
        .map_err(WorkspaceError::from_store)?;
    Ok(snapshot)
}

/// Load into a shared workspace. The blueprint is fetched without holding
/// the lock; only the rebuild and swap run under the write lock.
pub async fn load_shared<S: BlueprintStore>(
    workspace: &SharedWorkspace,
    store: &S,
    name: &str,
) -> Result<LoadReport, WorkspaceError> {
    let snapshot = fetch(store, name).await?;
    workspace.write().install(&snapshot)
}
