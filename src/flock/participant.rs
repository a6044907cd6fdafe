use serde::{Deserialize, Serialize};

use crate::physics::body::BodyId;
use crate::util::vec3::Vec3;

/// What part a body plays in flocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlockRole {
    /// Flocks and is flocked with
    Boid,
    /// Attracts and steers boids but does not flock itself
    Target,
}

/// Anything that can appear in a neighbour set
pub trait FlockParticipant {
    fn body_id(&self) -> BodyId;
    fn role(&self) -> FlockRole;
    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
}

impl<T: FlockParticipant + ?Sized> FlockParticipant for &T {
    fn body_id(&self) -> BodyId {
        (**self).body_id()
    }

    fn role(&self) -> FlockRole {
        (**self).role()
    }

    fn position(&self) -> Vec3 {
        (**self).position()
    }

    fn velocity(&self) -> Vec3 {
        (**self).velocity()
    }
}
