//! Flockball simulation library
//!
//! Boids flock around a player-controlled rolling ball. Every boid keeps a
//! neighbour set fed by proximity events and steers itself each tick with
//! alignment, cohesion and inverse-cube avoidance impulses.
//!
//! # Features
//!
//! - `parallel` - compute flocking forces and integrate bodies on the rayon pool (enabled by default)

pub mod config;
pub mod flock;
pub mod metrics;
pub mod physics;
pub mod sim;
pub mod util;
