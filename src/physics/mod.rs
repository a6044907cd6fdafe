//! Reference host physics
//!
//! Sphere bodies resting on a ground plane, impulse/torque integration and
//! detector spheres that report begin/end overlap transitions. The flocking
//! code only talks to it through [`RigidBody`] and the participant views.

pub mod body;
pub mod spatial;
pub mod world;

pub use body::{Body, BodyDesc, BodyId, ParticipantView, RigidBody};
pub use world::{DetectorId, DetectorSubscription, OverlapEvent, OverlapKind, PhysicsWorld};

/// World-level physics constants (centimetre-scale units)
pub mod constants {
    /// Downward acceleration along -Z
    pub const GRAVITY: f32 = 980.0;
    /// Height of the ground plane
    pub const GROUND_HEIGHT: f32 = 0.0;
    /// Fraction of contact slip removed per step while grounded (0 = ice, 1 = pure rolling)
    pub const ROLLING_GRIP: f32 = 0.5;
    /// Tolerance for considering a body in contact with the ground
    pub const CONTACT_SLOP: f32 = 0.5;
}
