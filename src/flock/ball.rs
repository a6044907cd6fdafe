//! Player-controlled rolling ball
//!
//! Boids treat it as a flock target. The ball itself only rolls, jumps and
//! keeps track of the boids around it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::flock::agent::seed_from_scan;
use crate::flock::constants::ball::{JUMP_IMPULSE, ROLL_TORQUE};
use crate::flock::tracker::{NeighborFilter, NeighborTracker};
use crate::physics::{BodyDesc, BodyId, DetectorSubscription, PhysicsWorld, RigidBody};
use crate::util::vec3::Vec3;

/// Movement input for one tick; axes are clamped to [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BallInput {
    pub move_right: f32,
    pub move_forward: f32,
    /// Edge-triggered: consumed by the next tick
    pub jump: bool,
}

impl BallInput {
    fn sanitized(self) -> Self {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            move_right: axis(self.move_right),
            move_forward: axis(self.move_forward),
            jump: self.jump,
        }
    }

    /// Torque that rolls the ball in the input direction (+X forward, +Y right)
    pub fn roll_torque(&self) -> Vec3 {
        Vec3::new(
            -self.move_right * ROLL_TORQUE,
            self.move_forward * ROLL_TORQUE,
            0.0,
        )
    }
}

#[derive(Debug)]
pub struct Ball {
    body: BodyId,
    tracker: NeighborTracker,
    input: BallInput,
    can_jump: bool,
    detector: DetectorSubscription,
}

impl Ball {
    pub fn spawn(world: &mut PhysicsWorld, position: Vec3, detection_radius: f32) -> Self {
        let body = world.add_body(BodyDesc::ball(position));
        let detector = world.register_detector(body, detection_radius);
        let mut tracker = NeighborTracker::new(body, detection_radius, NeighborFilter::BoidsOnly);
        let seeded = seed_from_scan(world, &mut tracker);

        debug!(%body, seeded, "ball spawned");

        Self {
            body,
            tracker,
            input: BallInput::default(),
            can_jump: true,
            detector,
        }
    }

    pub fn body_id(&self) -> BodyId {
        self.body
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

    pub fn input(&self) -> BallInput {
        self.input
    }

    pub fn can_jump(&self) -> bool {
        self.can_jump
    }

    pub fn set_input(&mut self, input: BallInput) {
        self.input = input.sanitized();
    }

    /// Apply the current input to the body
    pub fn on_tick(&mut self, world: &mut PhysicsWorld) {
        let jump = std::mem::take(&mut self.input.jump);
        let Some(body) = world.body_mut(self.body) else {
            return;
        };

        // Touching the ground re-arms the jump
        if body.is_grounded() {
            self.can_jump = true;
        }

        let torque = self.input.roll_torque();
        if torque != Vec3::ZERO {
            body.apply_torque(torque);
        }

        if jump && self.can_jump {
            body.apply_impulse(Vec3::UP * JUMP_IMPULSE);
            self.can_jump = false;
            debug!(body = %self.body, "ball jumped");
        }
    }
}
