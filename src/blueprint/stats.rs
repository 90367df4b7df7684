//! Aggregate statistics shown alongside a blueprint.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::graph::ConnectionGraph;

/// Derived summary of an assembly. Recomputed on every snapshot; never read
/// back when rebuilding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlueprintStats {
    /// Number of parts.
    pub part_count: usize,
    /// Number of connections.
    pub connection_count: usize,
    /// Sum of part masses.
    pub total_mass: f32,
    /// Mass-weighted centre of the part origins (origin when massless).
    pub center_of_mass: Vec3,
}

impl BlueprintStats {
    /// Compute stats for a live graph.
    pub fn from_graph(graph: &ConnectionGraph) -> Self {
        let (total_mass, weighted) = graph
            .parts()
            .fold((0.0_f32, Vec3::ZERO), |(mass, sum), (_, part)| {
                (mass + part.mass, sum + part.pose.position * part.mass)
            });

        let center_of_mass = if total_mass > 0.0 {
            weighted / total_mass
        } else {
            Vec3::ZERO
        };

        Self {
            part_count: graph.part_count(),
            connection_count: graph.connection_count(),
            total_mass,
            center_of_mass,
        }
    }
}
