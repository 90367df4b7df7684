//! Candidate ranking for interactive snapping.

use crate::types::PointId;

/// A pair of points that passed every `connect` pre-check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    /// Point on the dragged part.
    pub dragged: PointId,
    /// Point on a stationary part.
    pub target: PointId,
    /// World distance between the two points.
    pub distance: f32,
}

impl SnapCandidate {
    /// Create a new candidate.
    pub fn new(dragged: PointId, target: PointId, distance: f32) -> Self {
        Self {
            dragged,
            target,
            distance,
        }
    }

    /// Whether `self` should be preferred over `other`.
    pub fn beats(&self, other: &SnapCandidate) -> bool {
        self.rank_key_cmp(other) == std::cmp::Ordering::Less
    }

    // Primary: shorter distance
    // Secondary: lower target point index
    // Tertiary: earlier target part (insertion order)
    // Last: lower dragged point index
    fn rank_key_cmp(&self, other: &SnapCandidate) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.target.index.cmp(&other.target.index))
            .then_with(|| self.target.part.cmp(&other.target.part))
            .then_with(|| self.dragged.index.cmp(&other.dragged.index))
    }
}

/// Pick the best candidate: minimum distance, ties broken deterministically.
pub fn best_candidate<I>(candidates: I) -> Option<SnapCandidate>
where
    I: IntoIterator<Item = SnapCandidate>,
{
    candidates
        .into_iter()
        .fold(None, |best: Option<SnapCandidate>, c| match best {
            Some(b) if !c.beats(&b) => Some(b),
            _ => Some(c),
        })
}
