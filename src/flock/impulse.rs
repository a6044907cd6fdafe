//! Turning flocking vectors into impulses on the agent's own body

use serde::Serialize;

use crate::config::FlockTuning;
use crate::flock::constants::flocking::AVOIDANCE_SCALE;
use crate::flock::forces::FlockForces;
use crate::physics::body::RigidBody;
use crate::util::vec3::Vec3;

/// Impulses handed to the body in one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AppliedImpulses {
    pub alignment: Vec3,
    pub cohesion: Vec3,
    pub avoidance: Vec3,
}

impl AppliedImpulses {
    pub fn total(&self) -> Vec3 {
        self.alignment + self.cohesion + self.avoidance
    }
}

/// Steer toward the neighbours' mean velocity, on the ground plane only
#[inline]
pub fn alignment_impulse(mean_velocity: Vec3, own_velocity: Vec3, constant: f32) -> Vec3 {
    (mean_velocity - own_velocity).planar() * constant
}

/// Pull toward the cohesion centre, proportional to the distance to it, on
/// the ground plane only
#[inline]
pub fn cohesion_impulse(own_position: Vec3, center: Vec3, constant: f32) -> Vec3 {
    let (direction, distance) = (center - own_position).normalize_with_length();
    (direction * constant * distance).planar()
}

/// Repulsion keeps its vertical component
#[inline]
pub fn avoidance_impulse(mean_avoidance: Vec3, constant: f32) -> Vec3 {
    mean_avoidance * constant * AVOIDANCE_SCALE
}

/// Apply all three flocking impulses to `body`.
///
/// Returns `None` without touching the body when no neighbour contributed.
/// `scale` is 1.0 for per-frame impulses or `dt` for time-scaled ones.
pub fn apply_flock_impulses<B>(
    body: &mut B,
    forces: &FlockForces,
    tuning: &FlockTuning,
    scale: f32,
) -> Option<AppliedImpulses>
where
    B: RigidBody + ?Sized,
{
    if forces.is_empty() {
        return None;
    }

    let impulses = AppliedImpulses {
        alignment: alignment_impulse(forces.alignment, body.velocity(), tuning.alignment_constant)
            * scale,
        cohesion: cohesion_impulse(body.position(), forces.cohesion, tuning.cohesion_constant)
            * scale,
        avoidance: avoidance_impulse(forces.avoidance, tuning.avoidance_constant) * scale,
    };

    body.apply_impulse(impulses.alignment);
    body.apply_impulse(impulses.cohesion);
    body.apply_impulse(impulses.avoidance);

    Some(impulses)
}
