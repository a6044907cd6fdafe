//! Per-agent neighbour set
//!
//! Seeded once by a bulk proximity scan at spawn, then kept current by the
//! agent's own enter/exit overlap events. Both paths go through the same
//! admission check.

use hashbrown::HashSet;
use tracing::trace;

use crate::flock::participant::{FlockParticipant, FlockRole};
use crate::physics::body::BodyId;

/// Which roles an agent accepts as neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborFilter {
    /// Boids flock with other boids and with flock targets
    BoidsAndTargets,
    /// The player ball only keeps track of boids
    BoidsOnly,
}

impl NeighborFilter {
    #[inline]
    pub fn admits(self, role: FlockRole) -> bool {
        match self {
            NeighborFilter::BoidsAndTargets => true,
            NeighborFilter::BoidsOnly => role == FlockRole::Boid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NeighborTracker {
    owner: BodyId,
    detection_radius: f32,
    filter: NeighborFilter,
    neighbors: HashSet<BodyId>,
}

impl NeighborTracker {
    pub fn new(owner: BodyId, detection_radius: f32, filter: NeighborFilter) -> Self {
        Self {
            owner,
            detection_radius,
            filter,
            neighbors: HashSet::new(),
        }
    }

    pub fn owner(&self) -> BodyId {
        self.owner
    }

    pub fn detection_radius(&self) -> f32 {
        self.detection_radius
    }

    pub fn filter(&self) -> NeighborFilter {
        self.filter
    }

    #[inline]
    fn admits(&self, other: &dyn FlockParticipant) -> bool {
        other.body_id() != self.owner && self.filter.admits(other.role())
    }

    /// Handle a body entering the detection radius.
    ///
    /// Ignored when the body is unresolved, already tracked, the owner itself,
    /// or of a role the filter rejects. Returns whether the set changed.
    pub fn on_enter_range(&mut self, other: Option<&dyn FlockParticipant>) -> bool {
        let Some(other) = other else {
            return false;
        };
        let id = other.body_id();
        if self.neighbors.contains(&id) || !self.admits(other) {
            return false;
        }

        self.neighbors.insert(id);
        trace!(owner = %self.owner, neighbor = %id, count = self.neighbors.len(), "neighbor entered");
        true
    }

    /// Handle a body leaving the detection radius. Returns whether the set changed.
    pub fn on_exit_range(&mut self, other: Option<BodyId>) -> bool {
        let Some(id) = other else {
            return false;
        };
        if !self.neighbors.remove(&id) {
            return false;
        }

        trace!(owner = %self.owner, neighbor = %id, count = self.neighbors.len(), "neighbor exited");
        true
    }

    /// Bulk initialisation from a proximity scan; returns how many were admitted
    pub fn seed<'a, I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Option<&'a dyn FlockParticipant>>,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.on_enter_range(*candidate))
            .count()
    }

    /// Drop a body that has left the simulation
    pub fn forget(&mut self, id: BodyId) -> bool {
        self.neighbors.remove(&id)
    }

    pub fn current_neighbors(&self) -> &HashSet<BodyId> {
        &self.neighbors
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.neighbors.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::vec3::Vec3;

    struct Fake {
        id: u64,
        role: FlockRole,
    }

    impl FlockParticipant for Fake {
        fn body_id(&self) -> BodyId {
            BodyId(self.id)
        }
        fn role(&self) -> FlockRole {
            self.role
        }
        fn position(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn velocity(&self) -> Vec3 {
            Vec3::ZERO
        }
    }

    fn boid(id: u64) -> Fake {
        Fake { id, role: FlockRole::Boid }
    }

    fn target(id: u64) -> Fake {
        Fake { id, role: FlockRole::Target }
    }

    fn tracker() -> NeighborTracker {
        NeighborTracker::new(BodyId(1), 1000.0, NeighborFilter::BoidsAndTargets)
    }

    #[test]
    fn test_enter_self_is_noop() {
        let mut t = tracker();
        assert!(!t.on_enter_range(Some(&boid(1))));
        assert!(t.is_empty());
    }

    #[test]
    fn test_enter_none_is_noop() {
        let mut t = tracker();
        assert!(!t.on_enter_range(None));
        assert!(t.is_empty());
    }

    #[test]
    fn test_enter_twice_is_idempotent() {
        let mut t = tracker();
        let b = boid(2);
        assert!(t.on_enter_range(Some(&b)));
        assert!(!t.on_enter_range(Some(&b)));
        assert_eq!(t.len(), 1);
        assert!(t.contains(BodyId(2)));
    }

    #[test]
    fn test_enter_then_exit_round_trip() {
        let mut t = tracker();
        t.on_enter_range(Some(&boid(2)));
        let before = t.current_neighbors().clone();

        assert!(t.on_enter_range(Some(&boid(3))));
        assert!(t.on_exit_range(Some(BodyId(3))));

        assert_eq!(t.current_neighbors(), &before);
    }

    #[test]
    fn test_exit_absent_or_none_is_noop() {
        let mut t = tracker();
        t.on_enter_range(Some(&boid(2)));
        assert!(!t.on_exit_range(None));
        assert!(!t.on_exit_range(Some(BodyId(9))));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_filter_roles() {
        let mut boids_only = NeighborTracker::new(BodyId(1), 375.0, NeighborFilter::BoidsOnly);
        assert!(!boids_only.on_enter_range(Some(&target(2))));
        assert!(boids_only.on_enter_range(Some(&boid(3))));

        let mut t = tracker();
        assert!(t.on_enter_range(Some(&target(2))));
    }

    #[test]
    fn test_seed_matches_incremental_filtering() {
        let (own, other, dup, ball) = (boid(1), boid(2), boid(2), target(3));
        let candidates: [Option<&dyn FlockParticipant>; 5] =
            [Some(&own), None, Some(&other), Some(&dup), Some(&ball)];

        let mut seeded = NeighborTracker::new(BodyId(1), 375.0, NeighborFilter::BoidsOnly);
        assert_eq!(seeded.seed(candidates.iter().copied()), 1);

        let mut incremental = NeighborTracker::new(BodyId(1), 375.0, NeighborFilter::BoidsOnly);
        for candidate in candidates {
            incremental.on_enter_range(candidate);
        }

        assert_eq!(seeded.current_neighbors(), incremental.current_neighbors());
    }

    #[test]
    fn test_forget() {
        let mut t = tracker();
        t.on_enter_range(Some(&boid(2)));
        assert!(t.forget(BodyId(2)));
        assert!(!t.forget(BodyId(2)));
        assert!(t.is_empty());
    }
}
