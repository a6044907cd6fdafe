//! Physics world: body storage, stepping and detector overlap events

use crossbeam_channel::{unbounded, Receiver, Sender};
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::physics::body::{Body, BodyDesc, BodyId, ParticipantView, RigidBody};
use crate::physics::constants::GRAVITY;
use crate::physics::spatial::{SpatialEntry, SpatialGrid, DEFAULT_CELL_SIZE};
use crate::util::vec3::Vec3;

/// Identifier of a registered detector sphere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetectorId(pub u64);

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "detector#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapKind {
    Begin,
    End,
}

/// A single overlap transition seen by a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapEvent {
    pub detector: DetectorId,
    /// Body the detector is attached to
    pub owner: BodyId,
    pub other: BodyId,
    pub kind: OverlapKind,
}

/// Keeps a detector registered for as long as it is alive
///
/// Dropping it queues the detector for removal; the world drains the queue
/// before the next overlap refresh, so no events are produced for it after that.
#[derive(Debug)]
pub struct DetectorSubscription {
    id: DetectorId,
    owner: BodyId,
    release: Sender<DetectorId>,
}

impl DetectorSubscription {
    pub fn id(&self) -> DetectorId {
        self.id
    }

    pub fn owner(&self) -> BodyId {
        self.owner
    }
}

impl Drop for DetectorSubscription {
    fn drop(&mut self) {
        // The world may already be gone; nothing left to release then.
        let _ = self.release.send(self.id);
    }
}

#[derive(Debug)]
struct Detector {
    owner: BodyId,
    radius: f32,
    overlapping: HashSet<BodyId>,
}

pub struct PhysicsWorld {
    bodies: HashMap<BodyId, Body>,
    next_body_id: u64,
    detectors: HashMap<DetectorId, Detector>,
    next_detector_id: u64,
    release_tx: Sender<DetectorId>,
    release_rx: Receiver<DetectorId>,
    grid: SpatialGrid,
    grid_dirty: bool,
    gravity: f32,
    pending_events: Vec<OverlapEvent>,
}

impl PhysicsWorld {
    pub fn new(cell_size: f32) -> Self {
        let (release_tx, release_rx) = unbounded();
        Self {
            bodies: HashMap::new(),
            next_body_id: 1,
            detectors: HashMap::new(),
            next_detector_id: 1,
            release_tx,
            release_rx,
            grid: SpatialGrid::new(cell_size),
            grid_dirty: false,
            gravity: GRAVITY,
            pending_events: Vec::new(),
        }
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_body_id);
        self.next_body_id += 1;
        self.bodies.insert(id, Body::new(id, desc));
        self.grid_dirty = true;
        id
    }

    /// Remove a body, purging it from every detector without emitting end events.
    /// Detectors owned by the body are dropped as well.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let body = self.bodies.remove(&id)?;
        self.detectors.retain(|_, detector| {
            detector.overlapping.remove(&id);
            detector.owner != id
        });
        self.pending_events.retain(|event| event.owner != id && event.other != id);
        self.grid_dirty = true;
        Some(body)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    /// Flocking view of a body; `None` for unknown ids and role-less bodies
    pub fn participant(&self, id: BodyId) -> Option<ParticipantView<'_>> {
        self.bodies.get(&id).and_then(Body::as_participant)
    }

    /// Move a body without going through the integrator
    pub fn teleport(&mut self, id: BodyId, position: Vec3) -> bool {
        match self.bodies.get_mut(&id) {
            Some(body) => {
                body.set_position(position);
                self.grid_dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    /// Register an overlap sphere attached to `owner`.
    ///
    /// Bodies already inside the sphere count as overlapping from the start and
    /// produce no begin events; pair this with [`Self::query_overlapping`] to
    /// pick them up.
    pub fn register_detector(&mut self, owner: BodyId, radius: f32) -> DetectorSubscription {
        let id = DetectorId(self.next_detector_id);
        self.next_detector_id += 1;

        let center = self.bodies.get(&owner).map(|body| body.position());
        let overlapping = match center {
            Some(center) => self
                .query_overlapping(center, radius)
                .into_iter()
                .filter(|other| *other != owner)
                .collect(),
            None => HashSet::new(),
        };

        self.detectors.insert(
            id,
            Detector {
                owner,
                radius,
                overlapping,
            },
        );
        tracing::trace!(%id, %owner, radius, "detector registered");

        DetectorSubscription {
            id,
            owner,
            release: self.release_tx.clone(),
        }
    }

    /// All bodies whose sphere overlaps the query sphere
    pub fn query_overlapping(&mut self, center: Vec3, radius: f32) -> Vec<BodyId> {
        self.ensure_grid();
        self.grid.query_sphere(center, radius)
    }

    /// Overlap transitions produced since the last drain
    pub fn drain_events(&mut self) -> Vec<OverlapEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending_events.len()
    }

    /// Integrate all bodies by `dt`, then refresh detector overlaps
    pub fn step(&mut self, dt: f32) {
        let gravity = self.gravity;

        #[cfg(feature = "parallel")]
        self.bodies
            .par_values_mut()
            .for_each(|body| body.integrate(dt, gravity));

        #[cfg(not(feature = "parallel"))]
        self.bodies
            .values_mut()
            .for_each(|body| body.integrate(dt, gravity));

        self.grid_dirty = true;
        self.refresh_overlaps();
    }

    /// Recompute every detector's overlap set and queue begin/end transitions
    pub fn refresh_overlaps(&mut self) {
        self.release_detectors();
        self.ensure_grid();

        let grid = &self.grid;
        let bodies = &self.bodies;
        let events = &mut self.pending_events;

        for (&detector_id, detector) in self.detectors.iter_mut() {
            let owner_id = detector.owner;
            let Some(owner) = bodies.get(&owner_id) else {
                continue;
            };

            let mut current: SmallVec<[BodyId; 32]> = SmallVec::new();
            grid.for_each_overlapping(owner.position(), detector.radius, |entry| {
                if entry.id != owner_id {
                    current.push(entry.id);
                }
            });

            current.sort_unstable();

            detector.overlapping.retain(|other| {
                let still_inside = current.binary_search(other).is_ok();
                if !still_inside {
                    events.push(OverlapEvent {
                        detector: detector_id,
                        owner: owner_id,
                        other: *other,
                        kind: OverlapKind::End,
                    });
                }
                still_inside
            });

            for other in current {
                if detector.overlapping.insert(other) {
                    events.push(OverlapEvent {
                        detector: detector_id,
                        owner: owner_id,
                        other,
                        kind: OverlapKind::Begin,
                    });
                }
            }
        }
    }

    fn release_detectors(&mut self) {
        for id in self.release_rx.try_iter() {
            if let Some(detector) = self.detectors.remove(&id) {
                tracing::trace!(%id, owner = %detector.owner, "detector released");
            }
        }
    }

    fn ensure_grid(&mut self) {
        if !self.grid_dirty {
            return;
        }
        self.grid.clear();
        for body in self.bodies.values() {
            self.grid.insert(SpatialEntry {
                id: body.id(),
                position: body.position(),
                radius: body.radius(),
            });
        }
        self.grid_dirty = false;
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flock::constants::boid;

    fn boid_at(world: &mut PhysicsWorld, x: f32) -> BodyId {
        world.add_body(BodyDesc::boid(Vec3::new(x, 0.0, boid::RADIUS), Vec3::ZERO))
    }

    fn events_for(events: &[OverlapEvent], owner: BodyId) -> Vec<(BodyId, OverlapKind)> {
        events
            .iter()
            .filter(|e| e.owner == owner)
            .map(|e| (e.other, e.kind))
            .collect()
    }

    #[test]
    fn test_query_overlapping_sees_fresh_bodies() {
        let mut world = PhysicsWorld::default().with_gravity(0.0);
        let a = boid_at(&mut world, 0.0);
        let b = boid_at(&mut world, 300.0);
        let _far = boid_at(&mut world, 5000.0);

        let mut found = world.query_overlapping(Vec3::new(0.0, 0.0, boid::RADIUS), 1000.0);
        found.sort();
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn test_register_detector_starts_with_current_overlaps() {
        let mut world = PhysicsWorld::default().with_gravity(0.0);
        let a = boid_at(&mut world, 0.0);
        let _b = boid_at(&mut world, 300.0);

        let _sub = world.register_detector(a, 1000.0);
        world.refresh_overlaps();

        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn test_begin_and_end_events_once_per_transition() {
        let mut world = PhysicsWorld::default().with_gravity(0.0);
        let a = boid_at(&mut world, 0.0);
        let b = boid_at(&mut world, 3000.0);
        let _sub = world.register_detector(a, 1000.0);

        // Move b into range
        world.teleport(b, Vec3::new(500.0, 0.0, boid::RADIUS));
        world.refresh_overlaps();
        world.refresh_overlaps();
        assert_eq!(events_for(&world.drain_events(), a), vec![(b, OverlapKind::Begin)]);

        // And back out
        world.teleport(b, Vec3::new(3000.0, 0.0, boid::RADIUS));
        world.refresh_overlaps();
        world.refresh_overlaps();
        assert_eq!(events_for(&world.drain_events(), a), vec![(b, OverlapKind::End)]);
    }

    #[test]
    fn test_crowded_detector_reports_each_transition_once() {
        let mut world = PhysicsWorld::default().with_gravity(0.0);
        let a = boid_at(&mut world, 0.0);
        let crowd: Vec<BodyId> = (1..=64).map(|i| boid_at(&mut world, i as f32 * 10.0)).collect();
        let _sub = world.register_detector(a, 1000.0);

        // Half the crowd leaves, in reverse id order
        for id in crowd.iter().rev().step_by(2) {
            world.teleport(*id, Vec3::new(-5000.0, 0.0, boid::RADIUS));
        }
        world.refresh_overlaps();
        world.refresh_overlaps();

        let events = events_for(&world.drain_events(), a);
        assert_eq!(events.len(), 32);
        assert!(events.iter().all(|(_, kind)| *kind == OverlapKind::End));
        let mut left: Vec<BodyId> = events.iter().map(|(id, _)| *id).collect();
        left.sort();
        let mut expected: Vec<BodyId> = crowd.iter().rev().step_by(2).copied().collect();
        expected.sort();
        assert_eq!(left, expected);
    }

    #[test]
    fn test_dropped_subscription_stops_events() {
        let mut world = PhysicsWorld::default().with_gravity(0.0);
        let a = boid_at(&mut world, 0.0);
        let b = boid_at(&mut world, 3000.0);
        let sub = world.register_detector(a, 1000.0);
        assert_eq!(world.detector_count(), 1);

        drop(sub);
        world.teleport(b, Vec3::new(500.0, 0.0, boid::RADIUS));
        world.refresh_overlaps();

        assert_eq!(world.detector_count(), 0);
        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn test_remove_body_purges_detectors_silently() {
        let mut world = PhysicsWorld::default().with_gravity(0.0);
        let a = boid_at(&mut world, 0.0);
        let b = boid_at(&mut world, 300.0);
        let _sub_a = world.register_detector(a, 1000.0);
        let _sub_b = world.register_detector(b, 1000.0);

        assert!(world.remove_body(b).is_some());
        world.refresh_overlaps();

        assert_eq!(world.detector_count(), 1);
        assert!(world.drain_events().is_empty());
        assert!(world.body(b).is_none());
        assert!(world.participant(b).is_none());
        assert!(world.remove_body(b).is_none());
    }

    #[test]
    fn test_step_applies_pending_impulses() {
        let mut world = PhysicsWorld::default().with_gravity(0.0);
        let a = boid_at(&mut world, 0.0);
        world.body_mut(a).unwrap().apply_impulse(Vec3::new(boid::MASS * 100.0, 0.0, 0.0));

        world.step(1.0 / 60.0);

        let body = world.body(a).unwrap();
        assert!(body.velocity().x > 0.0);
        assert!(body.position().x > 0.0);
        assert_eq!(body.pending_impulse(), Vec3::ZERO);
    }

    #[test]
    fn test_body_ids_are_not_reused() {
        let mut world = PhysicsWorld::default();
        let a = boid_at(&mut world, 0.0);
        world.remove_body(a);
        let b = boid_at(&mut world, 0.0);
        assert_ne!(a, b);
    }
}
