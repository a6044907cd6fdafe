use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flock::constants::{ball, boid};
use crate::flock::participant::{FlockParticipant, FlockRole};
use crate::physics::constants::{CONTACT_SLOP, GROUND_HEIGHT, ROLLING_GRIP};
use crate::util::vec3::Vec3;

/// Identifier of a body in the physics world
///
/// Handed out monotonically and never reused, so a stale id simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Operations the flocking code needs from a physical body
pub trait RigidBody {
    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    /// Instantaneous change in momentum, resolved on the next physics step
    fn apply_impulse(&mut self, impulse: Vec3);
    /// Torque applied over the next physics step
    fn apply_torque(&mut self, torque: Vec3);

    fn distance_to(&self, point: Vec3) -> f32 {
        self.position().distance_to(point)
    }
}

/// Construction parameters for a sphere body
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    /// Non-positive mass makes the body static
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Radians per second
    pub max_angular_speed: f32,
    /// Bodies without a role are never admitted into neighbour sets
    pub role: Option<FlockRole>,
}

impl BodyDesc {
    /// Boid ball: heavily damped so flocking impulses dominate its motion
    pub fn boid(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            radius: boid::RADIUS,
            mass: boid::MASS,
            linear_damping: boid::LINEAR_DAMPING,
            angular_damping: boid::ANGULAR_DAMPING,
            max_angular_speed: boid::MAX_ANGULAR_SPEED_DEG.to_radians(),
            role: Some(FlockRole::Boid),
        }
    }

    /// Player ball the flock is drawn toward
    pub fn ball(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius: ball::RADIUS,
            mass: ball::MASS,
            linear_damping: ball::LINEAR_DAMPING,
            angular_damping: ball::ANGULAR_DAMPING,
            max_angular_speed: ball::MAX_ANGULAR_SPEED_DEG.to_radians(),
            role: Some(FlockRole::Target),
        }
    }

    /// Static scenery that takes part in overlaps but never in flocking
    pub fn prop(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
            mass: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            max_angular_speed: 0.0,
            role: None,
        }
    }
}

/// Simulated sphere
#[derive(Debug, Clone)]
pub struct Body {
    // Integrated every step
    position: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
    pending_impulse: Vec3,
    pending_torque: Vec3,
    grounded: bool,

    // Fixed at construction
    inv_mass: f32,
    inv_inertia: f32,
    radius: f32,
    linear_damping: f32,
    angular_damping: f32,
    max_angular_speed: f32,
    role: Option<FlockRole>,
    id: BodyId,
}

impl Body {
    pub(crate) fn new(id: BodyId, desc: BodyDesc) -> Self {
        let (inv_mass, inv_inertia) = if desc.mass > 0.0 && desc.radius > 0.0 {
            // Solid sphere: I = 2/5 m r²
            let inertia = 0.4 * desc.mass * desc.radius * desc.radius;
            (1.0 / desc.mass, 1.0 / inertia)
        } else {
            (0.0, 0.0)
        };

        Self {
            position: desc.position,
            velocity: if inv_mass > 0.0 { desc.velocity } else { Vec3::ZERO },
            angular_velocity: Vec3::ZERO,
            pending_impulse: Vec3::ZERO,
            pending_torque: Vec3::ZERO,
            grounded: desc.position.z - desc.radius <= GROUND_HEIGHT + CONTACT_SLOP,
            inv_mass,
            inv_inertia,
            radius: desc.radius,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            max_angular_speed: desc.max_angular_speed,
            role: desc.role,
            id,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn role(&self) -> Option<FlockRole> {
        self.role
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Whether the body touched the ground during the last step
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Impulse accumulated since the last step
    pub fn pending_impulse(&self) -> Vec3 {
        self.pending_impulse
    }

    pub fn pending_torque(&self) -> Vec3 {
        self.pending_torque
    }

    /// Flocking view of this body, if it takes part in flocking at all
    pub fn as_participant(&self) -> Option<ParticipantView<'_>> {
        self.role.map(|role| ParticipantView { body: self, role })
    }

    /// Advance one step: resolve pending impulse/torque, then gravity, damping,
    /// rolling contact and ground clamping.
    pub(crate) fn integrate(&mut self, dt: f32, gravity: f32) {
        let impulse = std::mem::take(&mut self.pending_impulse);
        let torque = std::mem::take(&mut self.pending_torque);

        if self.is_static() {
            return;
        }

        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += torque * (self.inv_inertia * dt);

        self.velocity.z -= gravity * dt;
        self.velocity *= 1.0 / (1.0 + dt * self.linear_damping);
        self.angular_velocity *= 1.0 / (1.0 + dt * self.angular_damping);
        self.angular_velocity = self.angular_velocity.clamp_length(self.max_angular_speed);

        if self.grounded {
            self.apply_rolling_contact();
        }

        self.position += self.velocity * dt;

        let floor = GROUND_HEIGHT + self.radius;
        if self.position.z <= floor {
            self.position.z = floor;
            if self.velocity.z < 0.0 {
                self.velocity.z = 0.0;
            }
            self.grounded = true;
        } else {
            self.grounded = self.position.z - floor <= CONTACT_SLOP;
        }
    }

    /// Friction at the contact point couples spin and planar motion.
    ///
    /// For a solid sphere, cancelling contact slip `s` needs Δv = -2/7 s and
    /// Δω = -5/7 (r × s) / r², with r the contact offset.
    fn apply_rolling_contact(&mut self) {
        let contact = Vec3::new(0.0, 0.0, -self.radius);
        let slip = (self.velocity + self.angular_velocity.cross(contact)).planar() * ROLLING_GRIP;
        if slip.length_sq() == 0.0 {
            return;
        }

        self.velocity -= slip * (2.0 / 7.0);
        self.angular_velocity -= contact.cross(slip) * (5.0 / (7.0 * self.radius * self.radius));
    }
}

impl RigidBody for Body {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.pending_impulse += impulse;
    }

    fn apply_torque(&mut self, torque: Vec3) {
        self.pending_torque += torque;
    }
}

/// Borrowed view of a body that carries a flocking role
#[derive(Debug, Clone, Copy)]
pub struct ParticipantView<'a> {
    body: &'a Body,
    role: FlockRole,
}

impl FlockParticipant for ParticipantView<'_> {
    fn body_id(&self) -> BodyId {
        self.body.id
    }

    fn role(&self) -> FlockRole {
        self.role
    }

    fn position(&self) -> Vec3 {
        self.body.position
    }

    fn velocity(&self) -> Vec3 {
        self.body.velocity
    }
}
