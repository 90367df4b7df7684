//! Interactive drag-and-snap controller.
//!
//! The controller drives one manipulated part at a time through
//! `Idle -> Dragging -> Idle`. While dragging it previews the best snap
//! candidate each tick; the graph is only mutated on commit, and only the
//! part pose is touched before that.

use tracing::{debug, info, warn};

use crate::graph::{AttachError, ConnectionGraph, GraphError};
use crate::policy::{best_candidate, SnapCandidate, SnapPolicyV1};
use crate::types::{ConnectionId, GraphEvent, PartId, PointId, Pose};

/// Error type for controller operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControllerError {
    /// A drag is already running.
    #[error("A drag is already in progress for {0}")]
    AlreadyDragging(PartId),
    /// No drag is running.
    #[error("No drag in progress")]
    NotDragging,
    /// Part to drag does not exist.
    #[error("Part not found: {0}")]
    UnknownPart(PartId),
    /// The dragged part was destroyed; the drag has been aborted.
    #[error("Dragged part was removed: {0}")]
    PartRemoved(PartId),
    /// The graph refused the new pose; the drag continues from the last one.
    #[error("Pose rejected: {0}")]
    PoseRejected(GraphError),
}

/// State of an in-progress drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Dragged part.
    pub part: PartId,
    /// Pose at drag start, restored on cancel.
    pub original_pose: Pose,
    /// Pose from the latest update.
    pub current_pose: Pose,
    /// Points of the dragged part that are searching for a partner.
    pub searching: Vec<PointId>,
    /// Current preview.
    pub candidate: Option<SnapCandidate>,
}

/// Controller state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    /// Nothing is being manipulated.
    #[default]
    Idle,
    /// A part is being dragged.
    Dragging(DragSession),
}

/// Result of releasing a dragged part.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The previewed candidate was committed.
    Snapped {
        /// New connection.
        connection: ConnectionId,
        /// Pair that was connected.
        candidate: SnapCandidate,
    },
    /// No snap was attempted; the part stays where it was released.
    Released,
    /// The snap was attempted and refused; the part stays where it was
    /// released.
    SnapFailed {
        /// Pair that was tried.
        candidate: SnapCandidate,
        /// Why the graph refused it.
        error: AttachError,
    },
}

/// Drives interactive manipulation on top of a [`ConnectionGraph`].
///
/// Only `auto_snap` and `align_on_snap` are read from the policy; attach
/// thresholds come from the graph's own policy.
#[derive(Debug, Clone)]
pub struct AttachmentController {
    policy: SnapPolicyV1,
    state: DragState,
}

impl AttachmentController {
    /// Create an idle controller.
    pub fn new(policy: SnapPolicyV1) -> Self {
        Self {
            policy,
            state: DragState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Whether a drag is running.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Part being dragged, if any.
    pub fn dragged_part(&self) -> Option<PartId> {
        match &self.state {
            DragState::Dragging(session) => Some(session.part),
            DragState::Idle => None,
        }
    }

    /// Current snap preview.
    pub fn candidate(&self) -> Option<&SnapCandidate> {
        match &self.state {
            DragState::Dragging(session) => session.candidate.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Points currently searching for a partner.
    pub fn searching_points(&self) -> &[PointId] {
        match &self.state {
            DragState::Dragging(session) => &session.searching,
            DragState::Idle => &[],
        }
    }

    /// Start dragging `part`.
    pub fn begin_drag(&mut self, graph: &ConnectionGraph, part: PartId) -> Result<(), ControllerError> {
        if let DragState::Dragging(session) = &self.state {
            return Err(ControllerError::AlreadyDragging(session.part));
        }
        let pose = graph.part(part).ok_or(ControllerError::UnknownPart(part))?.pose;

        let session = DragSession {
            part,
            original_pose: pose,
            current_pose: pose,
            searching: graph.point_ids(part),
            candidate: Self::find_candidate(graph, part),
        };
        debug!(part = %part, points = session.searching.len(), "drag started");
        self.state = DragState::Dragging(session);
        Ok(())
    }

    /// Move the dragged part and refresh the preview.
    ///
    /// If the part has been destroyed the drag is aborted and
    /// `PartRemoved` is returned. A pose the graph refuses leaves the drag
    /// and the preview as they were.
    pub fn update_drag(
        &mut self,
        graph: &mut ConnectionGraph,
        pose: Pose,
    ) -> Result<Option<SnapCandidate>, ControllerError> {
        let part = self.dragged_part().ok_or(ControllerError::NotDragging)?;

        match graph.set_pose(part, pose) {
            Ok(()) => {}
            Err(GraphError::UnknownPart(_)) => {
                self.abort(part);
                return Err(ControllerError::PartRemoved(part));
            }
            Err(error) => {
                warn!(part = %part, %error, "drag pose rejected");
                return Err(ControllerError::PoseRejected(error));
            }
        }

        let candidate = Self::find_candidate(graph, part);
        if let DragState::Dragging(session) = &mut self.state {
            session.current_pose = pose;
            session.candidate = candidate;
        }
        Ok(candidate)
    }

    /// Release the dragged part.
    ///
    /// With `auto_snap` on and a candidate previewed, the pair is
    /// connected. A refused connect leaves the part at its released pose.
    pub fn end_drag(&mut self, graph: &mut ConnectionGraph) -> Result<DropOutcome, ControllerError> {
        let session = match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => session,
            DragState::Idle => return Err(ControllerError::NotDragging),
        };
        if !graph.contains_part(session.part) {
            info!(part = %session.part, "drag ended on a removed part");
            return Err(ControllerError::PartRemoved(session.part));
        }

        let candidate = match session.candidate {
            Some(candidate) if self.policy.auto_snap => candidate,
            _ => {
                debug!(part = %session.part, "released without snap");
                return Ok(DropOutcome::Released);
            }
        };

        match graph.connect(candidate.dragged, candidate.target) {
            Ok(connection) => {
                if self.policy.align_on_snap {
                    Self::align(graph, session.part, &candidate);
                }
                info!(part = %session.part, connection = %connection, target = %candidate.target, "snapped");
                Ok(DropOutcome::Snapped {
                    connection,
                    candidate,
                })
            }
            Err(error) => {
                warn!(
                    part = %session.part,
                    dragged = %candidate.dragged,
                    target = %candidate.target,
                    %error,
                    "snap refused"
                );
                Ok(DropOutcome::SnapFailed { candidate, error })
            }
        }
    }

    /// Abandon the drag and restore the original pose. The graph's
    /// connections are not touched.
    pub fn cancel_drag(&mut self, graph: &mut ConnectionGraph) -> Result<(), ControllerError> {
        let session = match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => session,
            DragState::Idle => return Err(ControllerError::NotDragging),
        };
        if graph.set_pose(session.part, session.original_pose).is_err() {
            debug!(part = %session.part, "cancelled drag of a removed part");
        } else {
            debug!(part = %session.part, "drag cancelled");
        }
        Ok(())
    }

    /// React to a graph notification. Returns true if the event aborted the
    /// current drag.
    pub fn handle_event(&mut self, event: &GraphEvent) -> bool {
        match (event, self.dragged_part()) {
            (GraphEvent::PartRemoved { part, .. }, Some(dragged)) if *part == dragged => {
                self.abort(dragged);
                true
            }
            _ => false,
        }
    }

    fn abort(&mut self, part: PartId) {
        info!(part = %part, "drag aborted: part removed");
        self.state = DragState::Idle;
    }

    /// Best snap pair for `part` at its current pose.
    ///
    /// Every free point of `part` is tested against every point of every
    /// other part with the graph's `connect` pre-checks; among the passing
    /// pairs the closest wins, ties broken by target point index, then
    /// target part insertion order, then dragged point index.
    pub fn find_candidate(graph: &ConnectionGraph, part: PartId) -> Option<SnapCandidate> {
        let dragged: Vec<PointId> = graph
            .point_ids(part)
            .into_iter()
            .filter(|id| graph.point(*id).map(|p| p.is_available()).unwrap_or(false))
            .collect();
        if dragged.is_empty() {
            return None;
        }

        let targets = graph
            .part_ids()
            .into_iter()
            .filter(|id| *id != part)
            .flat_map(|id| graph.point_ids(id));

        let candidates = targets.flat_map(|target| {
            dragged.iter().filter_map(move |d| {
                graph
                    .check_pair(*d, target)
                    .ok()
                    .map(|distance| SnapCandidate::new(*d, target, distance))
            })
        });

        best_candidate(candidates)
    }

    /// Translate the dragged part so its point sits on the target point.
    /// Skipped when the part holds other connections that would be stretched.
    fn align(graph: &mut ConnectionGraph, part: PartId, candidate: &SnapCandidate) {
        if graph.connections_of(part).len() > 1 {
            return;
        }
        let (Some(from), Some(to)) = (
            graph.world_position(candidate.dragged),
            graph.world_position(candidate.target),
        ) else {
            return;
        };
        if let Some(current) = graph.part(part).map(|p| p.pose) {
            let aligned = Pose::new(current.position + (to - from), current.orientation);
            // Part was just looked up; a failure here means nothing moved.
            let _ = graph.set_pose(part, aligned);
        }
    }
}
