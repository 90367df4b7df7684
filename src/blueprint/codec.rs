//! Snapshot and reconstruction of attachment graphs.
//!
//! ## Reconstruction
//!
//! Connection records carry part indices and endpoint world positions but no
//! point indices. For each record, in snapshot order, the rebuild picks the
//! pair `(p, q)` of free, active, compatible points on the two parts that
//! minimises `|p - position_a| + |q - position_b|`, then commits it through
//! [`ConnectionGraph::connect_with_threshold`].
//!
//! The match is greedy and local: an earlier record can consume a point that
//! a later record would have preferred, and on symmetric parts a record can
//! land on a geometrically equivalent but different point than the one that
//! was saved. Records that cannot be matched or are refused by `connect` are
//! skipped and reported; they never abort the load.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::compat::compatible;
use crate::graph::{AttachError, ConnectionGraph, GraphError};
use crate::policy::SnapPolicyV1;
use crate::types::{ConnectionId, PartId, PointId};
use super::document::{BlueprintMetadata, BlueprintSnapshot, ConnectionRecord, PartRecord};
use super::stats::BlueprintStats;
use super::BLUEPRINT_SCHEMA_VERSION;

/// Why a single connection record was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// A part index does not name a part record.
    #[error("Part index {index} out of range ({part_count} parts)")]
    PartIndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of part records.
        part_count: usize,
    },
    /// Both indices name the same part.
    #[error("Record joins part {0} to itself")]
    SelfReference(usize),
    /// No free, active, compatible point pair exists on the two parts.
    #[error("No qualifying point pair")]
    NoQualifyingPair,
    /// The nearest pair was refused by the graph.
    #[error("Connect rejected: {0}")]
    Rejected(#[from] AttachError),
}

/// A connection record that did not make it into the rebuilt graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Index into the snapshot's connection records.
    pub record: usize,
    /// Why it was skipped.
    pub reason: RecordError,
}

/// Error that aborts a rebuild before any graph is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Snapshot was written by an incompatible schema.
    #[error("Unsupported blueprint schema {found} (expected {expected})")]
    UnsupportedSchema {
        /// Version in the snapshot.
        found: String,
        /// Version this build understands.
        expected: String,
    },
    /// A part record could not be registered.
    #[error("Part record {index} rejected: {source}")]
    InvalidPart {
        /// Index of the part record.
        index: usize,
        /// Graph error.
        #[source]
        source: GraphError,
    },
}

/// Output of [`BlueprintCodec::build`].
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// The rebuilt graph. Its event queue is empty.
    pub graph: ConnectionGraph,
    /// Part id for each part record, by record index.
    pub part_ids: Vec<PartId>,
    /// Connection records that were dropped.
    pub skipped: Vec<SkippedRecord>,
}

impl Reconstruction {
    /// Number of dropped connection records.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Whether every connection record was restored.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Serialises graphs to blueprints and rebuilds graphs from them.
#[derive(Debug, Clone)]
pub struct BlueprintCodec {
    policy: SnapPolicyV1,
}

impl BlueprintCodec {
    /// Create a codec. Rebuilt graphs are governed by `policy`.
    pub fn new(policy: SnapPolicyV1) -> Self {
        Self { policy }
    }

    /// The policy given to rebuilt graphs.
    pub fn policy(&self) -> &SnapPolicyV1 {
        &self.policy
    }

    /// Capture `graph` as a blueprint.
    ///
    /// Parts are emitted in insertion order and that order becomes their
    /// identity. Each connection is emitted once: the graph stores a bond as
    /// a single record with canonically ordered endpoints, so the lower
    /// endpoint always becomes `a`.
    pub fn snapshot(&self, graph: &ConnectionGraph, metadata: BlueprintMetadata) -> BlueprintSnapshot {
        let mut index_of: BTreeMap<PartId, usize> = BTreeMap::new();
        let mut parts = Vec::with_capacity(graph.part_count());
        for (index, (id, part)) in graph.parts().enumerate() {
            index_of.insert(id, index);
            parts.push(PartRecord::from(part));
        }

        let mut connections = Vec::with_capacity(graph.connection_count());
        for (id, connection) in graph.connections() {
            let (a, b) = connection.endpoints();
            let record = (
                index_of.get(&a.part),
                index_of.get(&b.part),
                graph.world_position(a),
                graph.world_position(b),
            );
            match record {
                (Some(&part_a), Some(&part_b), Some(position_a), Some(position_b)) => {
                    connections.push(ConnectionRecord {
                        part_a,
                        part_b,
                        position_a,
                        position_b,
                        break_threshold: Some(connection.break_threshold),
                    });
                }
                _ => warn!(connection = %id, "connection references a missing point; not saved"),
            }
        }

        let stats = BlueprintStats::from_graph(graph);
        info!(
            parts = parts.len(),
            connections = connections.len(),
            total_mass = stats.total_mass,
            "blueprint snapshot taken"
        );
        BlueprintSnapshot::new(metadata, parts, connections, stats)
    }

    /// Rebuild a graph from a blueprint.
    ///
    /// Fails only if the schema is unsupported or a part record cannot be
    /// registered; in that case no graph is produced. Bad connection
    /// records are skipped and listed in the result.
    pub fn build(&self, snapshot: &BlueprintSnapshot) -> Result<Reconstruction, CodecError> {
        check_schema(&snapshot.schema_version)?;

        let mut graph = ConnectionGraph::new(self.policy.clone());
        let mut part_ids = Vec::with_capacity(snapshot.parts.len());
        for (index, record) in snapshot.parts.iter().enumerate() {
            let id = graph
                .add_part(record.to_part())
                .map_err(|source| CodecError::InvalidPart { index, source })?;
            part_ids.push(id);
        }

        let mut skipped = Vec::new();
        for (index, record) in snapshot.connections.iter().enumerate() {
            match self.restore_connection(&mut graph, &part_ids, record) {
                Ok(connection) => {
                    debug!(record = index, connection = %connection, "connection restored");
                }
                Err(reason) => {
                    warn!(record = index, %reason, "skipping connection record");
                    skipped.push(SkippedRecord { record: index, reason });
                }
            }
        }

        graph.drain_events();
        info!(
            parts = graph.part_count(),
            connections = graph.connection_count(),
            skipped = skipped.len(),
            "blueprint rebuilt"
        );
        Ok(Reconstruction {
            graph,
            part_ids,
            skipped,
        })
    }

    fn restore_connection(
        &self,
        graph: &mut ConnectionGraph,
        part_ids: &[PartId],
        record: &ConnectionRecord,
    ) -> Result<ConnectionId, RecordError> {
        let lookup = |index: usize| {
            part_ids
                .get(index)
                .copied()
                .ok_or(RecordError::PartIndexOutOfRange {
                    index,
                    part_count: part_ids.len(),
                })
        };
        let part_a = lookup(record.part_a)?;
        let part_b = lookup(record.part_b)?;
        if record.part_a == record.part_b {
            return Err(RecordError::SelfReference(record.part_a));
        }

        let (p, q) = nearest_pair(graph, part_a, part_b, record).ok_or(RecordError::NoQualifyingPair)?;
        let threshold = record
            .break_threshold
            .unwrap_or(self.policy.default_break_threshold);
        Ok(graph.connect_with_threshold(p, q, threshold)?)
    }
}

impl Default for BlueprintCodec {
    fn default() -> Self {
        Self::new(SnapPolicyV1::default())
    }
}

/// Accept any snapshot with the same major schema version.
fn check_schema(found: &str) -> Result<(), CodecError> {
    let major = |v: &str| v.split('.').next().unwrap_or_default().to_string();
    if major(found) == major(BLUEPRINT_SCHEMA_VERSION) {
        Ok(())
    } else {
        Err(CodecError::UnsupportedSchema {
            found: found.to_string(),
            expected: BLUEPRINT_SCHEMA_VERSION.to_string(),
        })
    }
}

/// Free, active, compatible pair minimising the summed distance to the
/// recorded positions. Ties keep the lowest `(p, q)` indices.
fn nearest_pair(
    graph: &ConnectionGraph,
    part_a: PartId,
    part_b: PartId,
    record: &ConnectionRecord,
) -> Option<(PointId, PointId)> {
    let mut best: Option<(f32, PointId, PointId)> = None;

    for p in graph.point_ids(part_a) {
        let (Some(point_p), Some(pos_p)) = (graph.point(p), graph.world_position(p)) else {
            continue;
        };
        if !point_p.is_available() {
            continue;
        }
        let cost_p = pos_p.distance(record.position_a);

        for q in graph.point_ids(part_b) {
            let (Some(point_q), Some(pos_q)) = (graph.point(q), graph.world_position(q)) else {
                continue;
            };
            if !point_q.is_available() || !compatible(point_p.kind, point_q.kind) {
                continue;
            }
            let cost = cost_p + pos_q.distance(record.position_b);
            if !cost.is_finite() {
                continue;
            }
            if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                best = Some((cost, p, q));
            }
        }
    }

    best.map(|(_, p, q)| (p, q))
}
