//! Golden tests for the assembly kernel.
//!
//! These tests pin the attach rules, drag tie-breaking and blueprint
//! round trips end to end through the public API.

use assembly_kernel::catalog;
use assembly_kernel::{
    AttachError, AttachmentController, AttachmentPoint, BlueprintCodec, BlueprintMetadata,
    ConnectionGraph, DropOutcome, GraphEvent, Part, PartId, PartKind, PointId, PointKind, Pose,
    SnapPolicyV1,
};
use glam::Vec3;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Default thresholds, no alignment after snapping.
fn policy() -> SnapPolicyV1 {
    SnapPolicyV1::new(-0.8, 5000.0, true, false, false)
}

fn at(x: f32, y: f32, z: f32) -> Pose {
    Pose::from_position(Vec3::new(x, y, z))
}

fn single_point(kind: PointKind, pose: Pose, direction: Vec3) -> Part {
    Part::new(
        PartKind::Connector,
        pose,
        1.0,
        vec![AttachmentPoint::new(kind, Vec3::ZERO, direction, 0.5)],
    )
}

/// Four blocks in a row along X with a seat on top of the second one.
///
/// ```text
///        [S]
///   [0]-[1]-[2]-[3]
/// ```
fn buggy() -> (ConnectionGraph, Vec<PartId>) {
    let mut graph = ConnectionGraph::new(policy());
    let mut ids: Vec<PartId> = (0..4)
        .map(|i| graph.add_part(catalog::block(at(i as f32, 0.0, 0.0))).unwrap())
        .collect();
    for pair in ids.windows(2) {
        // Block faces: 0 = +X, 1 = -X, 2 = +Y.
        graph.connect(PointId::new(pair[0], 0), PointId::new(pair[1], 1)).unwrap();
    }
    let seat = graph.add_part(catalog::seat(at(1.0, 0.9, 0.0))).unwrap();
    graph.connect(PointId::new(ids[1], 2), PointId::new(seat, 0)).unwrap();
    ids.push(seat);
    graph.drain_events();
    (graph, ids)
}

fn connection_set(graph: &ConnectionGraph) -> Vec<(PointId, PointId)> {
    graph.connections().map(|(_, c)| c.endpoints()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Attach rules
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_blocks_connect_within_reach_only() {
    let mut graph = ConnectionGraph::new(policy());
    let a = graph.add_part(catalog::block(at(0.0, 0.0, 0.0))).unwrap();
    // +X face of `a` sits at 0.5, -X face of `b` at 0.9: 0.4 apart.
    let b = graph.add_part(catalog::block(at(1.4, 0.0, 0.0))).unwrap();
    let (pa, pb) = (PointId::new(a, 0), PointId::new(b, 1));

    let id = graph.connect(pa, pb).unwrap();
    assert!(graph.point(pa).unwrap().is_occupied());

    graph.disconnect(id).unwrap();
    graph.set_pose(b, at(2.2, 0.0, 0.0)).unwrap();
    match graph.connect(pa, pb) {
        Err(AttachError::TooFar { distance, reach }) => {
            assert!((distance - 1.2).abs() < 1e-5);
            assert!((reach - 1.0).abs() < 1e-6);
        }
        other => panic!("expected TooFar, got {other:?}"),
    }
    assert!(!graph.point(pa).unwrap().is_occupied());
}

#[test]
fn test_wheel_mount_refuses_tool_mount() {
    let mut graph = ConnectionGraph::new(policy());
    let wheel = graph
        .add_part(single_point(PointKind::WheelMount, at(0.0, 0.0, 0.0), Vec3::X))
        .unwrap();
    let tool = graph
        .add_part(single_point(PointKind::ToolMount, at(0.2, 0.0, 0.0), Vec3::NEG_X))
        .unwrap();

    let err = graph
        .connect(PointId::new(wheel, 0), PointId::new(tool, 0))
        .unwrap_err();
    assert!(matches!(err, AttachError::Incompatible(PointKind::WheelMount, PointKind::ToolMount)));
    assert_eq!(graph.connection_count(), 0);
}

#[test]
fn test_point_holds_one_connection() {
    let mut graph = ConnectionGraph::new(policy());
    let hub = graph
        .add_part(single_point(PointKind::Universal, at(0.0, 0.0, 0.0), Vec3::X))
        .unwrap();
    let first = graph
        .add_part(single_point(PointKind::Universal, at(0.2, 0.0, 0.0), Vec3::NEG_X))
        .unwrap();
    let second = graph
        .add_part(single_point(PointKind::Universal, at(0.3, 0.0, 0.0), Vec3::NEG_X))
        .unwrap();

    graph.connect(PointId::new(hub, 0), PointId::new(first, 0)).unwrap();
    let err = graph
        .connect(PointId::new(hub, 0), PointId::new(second, 0))
        .unwrap_err();
    assert!(matches!(err, AttachError::AlreadyOccupied(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Removal cascade
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_remove_part_cascades() {
    let (mut graph, ids) = buggy();
    let removed = ids[1];

    graph.remove_part(removed).unwrap();

    for id in graph.part_ids() {
        for connection in graph.connections_of(id) {
            assert!(!graph.connection(connection).unwrap().touches_part(removed));
        }
    }
    assert_eq!(graph.connection_count(), 1);
    assert!(graph.check_invariants().is_ok());

    let events = graph.drain_events();
    assert!(matches!(
        events.last(),
        Some(GraphEvent::PartRemoved { part, detached }) if *part == removed && detached.len() == 3
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Drag and snap
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_drag_tie_breaks_on_part_order() {
    let mut graph = ConnectionGraph::new(policy());
    let upper = graph
        .add_part(single_point(PointKind::Universal, at(0.0, 0.1, 0.0), Vec3::X))
        .unwrap();
    let _lower = graph
        .add_part(single_point(PointKind::Universal, at(0.0, -0.1, 0.0), Vec3::X))
        .unwrap();
    let mover = graph
        .add_part(single_point(PointKind::Universal, at(5.0, 0.0, 0.0), Vec3::NEG_X))
        .unwrap();

    let mut controller = AttachmentController::new(policy());
    controller.begin_drag(&graph, mover).unwrap();
    assert!(controller.candidate().is_none());

    // Equidistant from both targets.
    let candidate = controller
        .update_drag(&mut graph, at(0.3, 0.0, 0.0))
        .unwrap()
        .expect("candidate in reach");
    assert_eq!(candidate.target, PointId::new(upper, 0));

    match controller.end_drag(&mut graph).unwrap() {
        DropOutcome::Snapped { candidate, .. } => {
            assert_eq!(candidate.target, PointId::new(upper, 0));
        }
        other => panic!("expected snap, got {other:?}"),
    }
    assert_eq!(graph.connection_count(), 1);
}

#[test]
fn test_drag_tie_breaks_on_point_index() {
    let mut graph = ConnectionGraph::new(policy());
    let target = graph
        .add_part(Part::new(
            PartKind::Connector,
            at(0.0, 0.0, 0.0),
            1.0,
            vec![
                AttachmentPoint::new(PointKind::Universal, Vec3::new(0.0, -0.1, 0.0), Vec3::X, 0.5),
                AttachmentPoint::new(PointKind::Universal, Vec3::new(0.0, 0.1, 0.0), Vec3::X, 0.5),
            ],
        ))
        .unwrap();
    let mover = graph
        .add_part(single_point(PointKind::Universal, at(5.0, 0.0, 0.0), Vec3::NEG_X))
        .unwrap();

    let mut controller = AttachmentController::new(policy());
    controller.begin_drag(&graph, mover).unwrap();
    let candidate = controller
        .update_drag(&mut graph, at(0.3, 0.0, 0.0))
        .unwrap()
        .unwrap();
    assert_eq!(candidate.target, PointId::new(target, 0));
}

#[test]
fn test_cancel_restores_pose() {
    let (mut graph, ids) = buggy();
    let seat = ids[4];
    let original = graph.part(seat).unwrap().pose;

    let mut controller = AttachmentController::new(policy());
    controller.begin_drag(&graph, seat).unwrap();
    controller.update_drag(&mut graph, at(9.0, 9.0, 9.0)).unwrap();
    controller.cancel_drag(&mut graph).unwrap();

    assert_eq!(graph.part(seat).unwrap().pose, original);
    assert_eq!(graph.connection_count(), 4);
}

// ─────────────────────────────────────────────────────────────────────────────
// Blueprints
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_single_part_blueprint() {
    let mut graph = ConnectionGraph::new(policy());
    graph.add_part(catalog::motor(Pose::default())).unwrap();
    let codec = BlueprintCodec::new(policy());
    let snapshot = codec.snapshot(&graph, BlueprintMetadata::new("motor", "golden"));
    assert!(snapshot.connections.is_empty());

    let rebuilt = codec.build(&snapshot).unwrap();
    assert_eq!(rebuilt.graph.part_count(), 1);
    assert_eq!(rebuilt.graph.connection_count(), 0);
    assert!(rebuilt.is_complete());
}

#[test]
fn test_round_trip_preserves_structure() {
    let (graph, _) = buggy();
    let codec = BlueprintCodec::new(policy());
    let first = codec.snapshot(&graph, BlueprintMetadata::new("buggy", "golden"));

    let rebuilt = codec.build(&first).unwrap();
    assert!(rebuilt.is_complete());
    assert_eq!(rebuilt.graph.part_count(), graph.part_count());
    assert_eq!(rebuilt.graph.connection_count(), graph.connection_count());
    assert!(rebuilt.graph.check_invariants().is_ok());

    let second = codec.snapshot(&rebuilt.graph, BlueprintMetadata::new("buggy", "golden"));
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.stats.total_mass, second.stats.total_mass);
}

#[test]
fn test_reconstruction_is_deterministic() {
    let (graph, _) = buggy();
    let codec = BlueprintCodec::new(policy());
    let snapshot = codec.snapshot(&graph, BlueprintMetadata::new("buggy", "golden"));

    let a = codec.build(&snapshot).unwrap();
    let b = codec.build(&snapshot).unwrap();
    assert_eq!(connection_set(&a.graph), connection_set(&b.graph));
    assert_eq!(a.part_ids, b.part_ids);
}

#[test]
fn test_snapshot_survives_json() {
    let (graph, _) = buggy();
    let codec = BlueprintCodec::new(policy());
    let snapshot = codec.snapshot(
        &graph,
        BlueprintMetadata::new("buggy", "golden").with_tags(["Offroad", " offroad ", "Two Seat"]),
    );

    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: assembly_kernel::BlueprintSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.metadata.tags, vec!["offroad", "two-seat"]);
    assert_eq!(codec.build(&parsed).unwrap().graph.connection_count(), 4);
}

#[test]
fn test_policy_hash_is_stable() {
    assert_eq!(policy().params_hash(), policy().params_hash());
    let loose = SnapPolicyV1::new(-0.5, 5000.0, true, false, false);
    assert_ne!(policy().params_hash(), loose.params_hash());
}
