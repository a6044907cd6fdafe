//! Force accumulation over a neighbour set
//!
//! One pass over the neighbours sums velocities (alignment), positions
//! (cohesion) and inverse-cube repulsion (avoidance); each sum is then averaged.

use serde::Serialize;

use crate::flock::constants::flocking::AVOIDANCE_FALLOFF;
use crate::flock::participant::FlockParticipant;
use crate::util::vec3::Vec3;

/// Mean flocking vectors for one agent and one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlockForces {
    /// Mean neighbour velocity (full 3D)
    pub alignment: Vec3,
    /// Mean neighbour position, the cohesion centre
    pub cohesion: Vec3,
    /// Mean repulsion vector
    pub avoidance: Vec3,
    /// Neighbours that contributed; zero means no impulses this tick
    pub neighbor_count: usize,
}

impl FlockForces {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neighbor_count == 0
    }
}

/// Repulsion from a neighbour at `neighbor` felt at `origin`: unit vector away
/// from the neighbour scaled by K / d³.
///
/// `d` is clamped to `min_distance`; coincident points yield zero.
#[inline]
pub fn avoidance_contribution(origin: Vec3, neighbor: Vec3, min_distance: f32) -> Vec3 {
    let (direction, distance) = (origin - neighbor).normalize_with_length();
    let distance = distance.max(min_distance);
    direction * (AVOIDANCE_FALLOFF / (distance * distance * distance))
}

/// Accumulate and average the three flocking vectors.
///
/// Unresolved neighbours (`None`) are skipped and do not count toward the mean,
/// so the denominator is the resolved count rather than the neighbour set size.
pub fn compute_forces<P, I>(origin: Vec3, neighbors: I, min_avoidance_distance: f32) -> FlockForces
where
    P: FlockParticipant,
    I: IntoIterator<Item = Option<P>>,
{
    let mut forces = FlockForces::default();

    for neighbor in neighbors.into_iter().flatten() {
        let position = neighbor.position();
        forces.alignment += neighbor.velocity();
        forces.cohesion += position;
        forces.avoidance += avoidance_contribution(origin, position, min_avoidance_distance);
        forces.neighbor_count += 1;
    }

    if forces.neighbor_count > 0 {
        let count = forces.neighbor_count as f32;
        forces.alignment /= count;
        forces.cohesion /= count;
        forces.avoidance /= count;
    }

    forces
}
