//! Flocking core
//!
//! Neighbour tracking, force accumulation and impulse application. Everything
//! here is engine-agnostic: bodies are reached through [`FlockParticipant`]
//! and [`crate::physics::RigidBody`].

pub mod agent;
pub mod ball;
pub mod constants;
pub mod forces;
pub mod impulse;
pub mod participant;
pub mod tracker;

pub use agent::{Agent, AgentKind, Boid};
pub use ball::{Ball, BallInput};
pub use forces::{compute_forces, FlockForces};
pub use impulse::{apply_flock_impulses, AppliedImpulses};
pub use participant::{FlockParticipant, FlockRole};
pub use tracker::{NeighborFilter, NeighborTracker};
