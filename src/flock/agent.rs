//! Flocking agents and their per-tick behaviour

use serde::Serialize;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::FlockTuning;
use crate::flock::ball::Ball;
use crate::flock::forces::{compute_forces, FlockForces};
use crate::flock::impulse::{apply_flock_impulses, AppliedImpulses};
use crate::flock::participant::FlockParticipant;
use crate::flock::tracker::{NeighborFilter, NeighborTracker};
use crate::physics::{
    BodyDesc, BodyId, DetectorId, DetectorSubscription, ParticipantView, PhysicsWorld, RigidBody,
};
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Boid,
    Ball,
}

/// Seed a fresh tracker from one proximity scan around its owner
pub(crate) fn seed_from_scan(world: &mut PhysicsWorld, tracker: &mut NeighborTracker) -> usize {
    let Some(center) = world.body(tracker.owner()).map(|body| body.position()) else {
        return 0;
    };

    let candidates = world.query_overlapping(center, tracker.detection_radius());
    let views: SmallVec<[Option<ParticipantView<'_>>; 32]> =
        candidates.iter().map(|id| world.participant(*id)).collect();

    tracker.seed(
        views
            .iter()
            .map(|view| view.as_ref().map(|p| p as &dyn FlockParticipant)),
    )
}

/// A flocking ball
#[derive(Debug)]
pub struct Boid {
    body: BodyId,
    tracker: NeighborTracker,
    tuning: FlockTuning,
    detector: DetectorSubscription,
}

impl Boid {
    /// Create the body, attach its detector and seed the neighbour set
    pub fn spawn(world: &mut PhysicsWorld, position: Vec3, velocity: Vec3, tuning: FlockTuning) -> Self {
        let body = world.add_body(BodyDesc::boid(position, velocity));
        let detector = world.register_detector(body, tuning.detection_radius);
        let mut tracker =
            NeighborTracker::new(body, tuning.detection_radius, NeighborFilter::BoidsAndTargets);
        let seeded = seed_from_scan(world, &mut tracker);

        debug!(%body, seeded, "boid spawned");

        Self {
            body,
            tracker,
            tuning,
            detector,
        }
    }

    pub fn body_id(&self) -> BodyId {
        self.body
    }

    pub fn tuning(&self) -> &FlockTuning {
        &self.tuning
    }

    pub fn tracker(&self) -> &NeighborTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut NeighborTracker {
        &mut self.tracker
    }

    pub fn detector(&self) -> &DetectorSubscription {
        &self.detector
    }

    /// Read-only half of the tick: mean flocking vectors from the current
    /// neighbour set. Neighbours that no longer resolve are skipped.
    pub fn compute_forces(&self, world: &PhysicsWorld, min_avoidance_distance: f32) -> FlockForces {
        let Some(me) = world.body(self.body) else {
            return FlockForces::default();
        };

        compute_forces(
            me.position(),
            self.tracker
                .current_neighbors()
                .iter()
                .map(|id| world.participant(*id)),
            min_avoidance_distance,
        )
    }

    /// Writing half of the tick: impulses on this boid's own body only
    pub fn apply_forces(
        &self,
        world: &mut PhysicsWorld,
        forces: &FlockForces,
        scale: f32,
    ) -> Option<AppliedImpulses> {
        let body = world.body_mut(self.body)?;
        apply_flock_impulses(body, forces, &self.tuning, scale)
    }
}

/// Any agent the simulation drives
#[derive(Debug)]
pub enum Agent {
    Boid(Boid),
    Ball(Ball),
}

impl Agent {
    pub fn body_id(&self) -> BodyId {
        match self {
            Agent::Boid(boid) => boid.body_id(),
            Agent::Ball(ball) => ball.body_id(),
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            Agent::Boid(_) => AgentKind::Boid,
            Agent::Ball(_) => AgentKind::Ball,
        }
    }

    /// Detector whose overlap events feed this agent's tracker
    pub fn detector_id(&self) -> DetectorId {
        match self {
            Agent::Boid(boid) => boid.detector().id(),
            Agent::Ball(ball) => ball.detector().id(),
        }
    }

    pub fn tracker(&self) -> &NeighborTracker {
        match self {
            Agent::Boid(boid) => boid.tracker(),
            Agent::Ball(ball) => ball.tracker(),
        }
    }

    pub fn tracker_mut(&mut self) -> &mut NeighborTracker {
        match self {
            Agent::Boid(boid) => boid.tracker_mut(),
            Agent::Ball(ball) => ball.tracker_mut(),
        }
    }

    pub fn as_boid(&self) -> Option<&Boid> {
        match self {
            Agent::Boid(boid) => Some(boid),
            Agent::Ball(_) => None,
        }
    }

    pub fn as_ball_mut(&mut self) -> Option<&mut Ball> {
        match self {
            Agent::Ball(ball) => Some(ball),
            Agent::Boid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flock::constants::boid;

    fn ground(x: f32, y: f32) -> Vec3 {
        Vec3::new(x, y, boid::RADIUS)
    }

    fn world() -> PhysicsWorld {
        PhysicsWorld::default().with_gravity(0.0)
    }

    fn steer(boid: &Boid, world: &mut PhysicsWorld) -> Option<AppliedImpulses> {
        let forces = boid.compute_forces(world, 1.0);
        boid.apply_forces(world, &forces, 1.0)
    }

    #[test]
    fn test_spawn_seeds_from_scan() {
        let mut world = world();
        let a = Boid::spawn(&mut world, ground(0.0, 0.0), Vec3::ZERO, FlockTuning::default());
        let far = Boid::spawn(&mut world, ground(5000.0, 0.0), Vec3::ZERO, FlockTuning::default());
        let b = Boid::spawn(&mut world, ground(300.0, 0.0), Vec3::ZERO, FlockTuning::default());

        assert!(a.tracker().is_empty());
        assert!(far.tracker().is_empty());
        assert!(b.tracker().contains(a.body_id()));
        assert!(!b.tracker().contains(b.body_id()));
        assert_eq!(b.tracker().len(), 1);
    }

    #[test]
    fn test_seed_skips_props() {
        let mut world = world();
        world.add_body(BodyDesc::prop(ground(100.0, 0.0), 20.0));
        let a = Boid::spawn(&mut world, ground(0.0, 0.0), Vec3::ZERO, FlockTuning::default());
        assert!(a.tracker().is_empty());
    }

    #[test]
    fn test_lonely_boid_applies_nothing() {
        let mut world = world();
        let a = Boid::spawn(&mut world, ground(0.0, 0.0), Vec3::ZERO, FlockTuning::default());

        assert!(steer(&a, &mut world).is_none());
        assert_eq!(world.body(a.body_id()).unwrap().pending_impulse(), Vec3::ZERO);
    }

    #[test]
    fn test_single_neighbor_cohesion() {
        let mut world = world();
        let _b = Boid::spawn(&mut world, ground(10.0, 0.0), Vec3::ZERO, FlockTuning::default());
        let a = Boid::spawn(&mut world, ground(0.0, 0.0), Vec3::ZERO, FlockTuning::default());

        let applied = steer(&a, &mut world).unwrap();
        let expected = Vec3::X * boid::COHESION_CONSTANT * 10.0;
        assert!(applied.cohesion.approx_eq(expected, 1e-3));
        assert_eq!(applied.alignment, Vec3::ZERO);
        assert!(applied.avoidance.x < 0.0, "avoidance pushes away from the neighbour");
    }

    #[test]
    fn test_stale_neighbor_is_skipped() {
        let mut world = world();
        let b = Boid::spawn(&mut world, ground(300.0, 0.0), Vec3::ZERO, FlockTuning::default());
        let a = Boid::spawn(&mut world, ground(0.0, 0.0), Vec3::ZERO, FlockTuning::default());
        assert!(a.tracker().contains(b.body_id()));

        world.remove_body(b.body_id());
        let forces = a.compute_forces(&world, 1.0);
        assert!(forces.is_empty());
    }

    #[test]
    fn test_agent_accessors() {
        let mut world = world();
        let mut agent = Agent::Boid(Boid::spawn(
            &mut world,
            ground(0.0, 0.0),
            Vec3::ZERO,
            FlockTuning::default(),
        ));

        assert_eq!(agent.kind(), AgentKind::Boid);
        assert!(agent.as_boid().is_some());
        assert!(agent.as_ball_mut().is_none());
        assert_eq!(agent.tracker().owner(), agent.body_id());
    }
}
