//! Property-based tests for the connection graph.
//!
//! Random edit sequences are replayed against a graph and the structural
//! invariants are checked after every step.
//!
//! Run with: cargo test --test proptest_graph

use assembly_kernel::catalog;
use assembly_kernel::{
    BlueprintCodec, BlueprintMetadata, ConnectionGraph, PartKind, PointId, Pose, SnapPolicyV1,
};
use glam::Vec3;
use proptest::prelude::*;

// =============================================================================
// Strategies for generating random edit sequences
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add { kind: usize, cell: [i8; 3] },
    Connect { a: usize, pa: usize, b: usize, pb: usize },
    Disconnect { nth: usize },
    Remove { nth: usize },
    Move { nth: usize, cell: [i8; 3] },
}

/// Grid cell on a half-unit lattice so neighbouring parts often line up.
fn arb_cell() -> impl Strategy<Value = [i8; 3]> {
    prop::array::uniform3(-3i8..=3)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..PartKind::ALL.len(), arb_cell()).prop_map(|(kind, cell)| Op::Add { kind, cell }),
        5 => (0..16usize, 0..6usize, 0..16usize, 0..6usize)
            .prop_map(|(a, pa, b, pb)| Op::Connect { a, pa, b, pb }),
        1 => (0..16usize).prop_map(|nth| Op::Disconnect { nth }),
        1 => (0..16usize).prop_map(|nth| Op::Remove { nth }),
        1 => (0..16usize, arb_cell()).prop_map(|(nth, cell)| Op::Move { nth, cell }),
    ]
}

fn pose(cell: [i8; 3]) -> Pose {
    Pose::from_position(Vec3::new(cell[0] as f32, cell[1] as f32, cell[2] as f32) * 0.5)
}

/// Replay `ops`, checking invariants after each one.
fn replay(ops: &[Op]) -> Result<ConnectionGraph, TestCaseError> {
    let mut graph = ConnectionGraph::new(SnapPolicyV1::new(-0.8, 5000.0, true, false, false));

    for op in ops {
        match op {
            Op::Add { kind, cell } => {
                graph
                    .add_part(catalog::standard_part(PartKind::ALL[*kind], pose(*cell)))
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
            Op::Connect { a, pa, b, pb } => {
                let ids = graph.part_ids();
                if ids.is_empty() {
                    continue;
                }
                let p = PointId::new(ids[a % ids.len()], *pa);
                let q = PointId::new(ids[b % ids.len()], *pb);
                let precheck = graph.check_pair(p, q);
                let before = graph.connection_count();
                let result = graph.connect(p, q);

                // connect succeeds exactly when the dry run does.
                prop_assert_eq!(precheck.is_ok(), result.is_ok());
                let expected = if result.is_ok() { before + 1 } else { before };
                prop_assert_eq!(graph.connection_count(), expected);
            }
            Op::Disconnect { nth } => {
                let ids: Vec<_> = graph.connections().map(|(id, _)| id).collect();
                if let Some(id) = ids.get(nth % ids.len().max(1)) {
                    graph.disconnect(*id).map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
            }
            Op::Remove { nth } => {
                let ids = graph.part_ids();
                if ids.is_empty() {
                    continue;
                }
                let removed = ids[nth % ids.len()];
                graph.remove_part(removed).map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert!(graph.connections().all(|(_, c)| !c.touches_part(removed)));
            }
            Op::Move { nth, cell } => {
                let ids = graph.part_ids();
                if ids.is_empty() {
                    continue;
                }
                graph
                    .set_pose(ids[nth % ids.len()], pose(*cell))
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
        }

        if let Err(violations) = graph.check_invariants() {
            return Err(TestCaseError::fail(format!("after {op:?}: {violations:?}")));
        }
    }

    Ok(graph)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_invariants_hold_for_any_edit_sequence(ops in prop::collection::vec(arb_op(), 1..60)) {
        replay(&ops)?;
    }

    #[test]
    fn prop_each_point_has_at_most_one_connection(ops in prop::collection::vec(arb_op(), 1..60)) {
        let graph = replay(&ops)?;
        for id in graph.part_ids() {
            for point in graph.point_ids(id) {
                let count = graph.connections().filter(|(_, c)| c.touches(point)).count();
                prop_assert!(count <= 1, "{} has {} connections", point, count);
                let occupied = graph.point(point).map(|p| p.is_occupied()).unwrap_or(false);
                prop_assert_eq!(occupied, count == 1);
            }
        }
    }

    #[test]
    fn prop_rebuild_is_sound_and_deterministic(ops in prop::collection::vec(arb_op(), 1..40)) {
        let graph = replay(&ops)?;
        let codec = BlueprintCodec::new(graph.policy().clone());
        let snapshot = codec.snapshot(&graph, BlueprintMetadata::new("prop", "proptest"));

        let first = codec.build(&snapshot).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let second = codec.build(&snapshot).map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(first.graph.part_count(), graph.part_count());
        prop_assert!(first.graph.connection_count() <= graph.connection_count());
        prop_assert_eq!(
            first.graph.connection_count() + first.skipped_count(),
            snapshot.connections.len()
        );
        prop_assert!(first.graph.check_invariants().is_ok());

        let endpoints = |g: &ConnectionGraph| g.connections().map(|(_, c)| c.endpoints()).collect::<Vec<_>>();
        prop_assert_eq!(endpoints(&first.graph), endpoints(&second.graph));
    }
}
