/// Flocking force constants
pub mod flocking {
    /// Numerator of the avoidance fall-off: contribution = K / distance³
    pub const AVOIDANCE_FALLOFF: f32 = 1_000_000.0;
    /// Amplifies the (already small) mean avoidance vector before applying it
    pub const AVOIDANCE_SCALE: f32 = 5_000.0;
    /// Distances below this are clamped before the cube fall-off
    pub const MIN_AVOIDANCE_DISTANCE: f32 = 1.0;
}

/// Default per-boid tuning
pub mod boid {
    pub const ALIGNMENT_CONSTANT: f32 = 15.0;
    pub const COHESION_CONSTANT: f32 = 1.0;
    pub const AVOIDANCE_CONSTANT: f32 = 25.0;
    /// Radius of the neighbour detector sphere (world units)
    pub const DETECTION_RADIUS: f32 = 1000.0;

    pub const RADIUS: f32 = 50.0;
    pub const MASS: f32 = 100.0;
    pub const LINEAR_DAMPING: f32 = 1.0;
    pub const ANGULAR_DAMPING: f32 = 0.5;
    /// Degrees per second
    pub const MAX_ANGULAR_SPEED_DEG: f32 = 800.0;
}

/// Player ball (the flock target)
pub mod ball {
    pub const DETECTION_RADIUS: f32 = 375.0;
    /// Torque applied per unit of movement input
    pub const ROLL_TORQUE: f32 = 50_000_000.0;
    /// Upward impulse of a jump
    pub const JUMP_IMPULSE: f32 = 350_000.0;

    pub const RADIUS: f32 = 50.0;
    /// Boid mass scaled by 3.5
    pub const MASS: f32 = 350.0;
    pub const LINEAR_DAMPING: f32 = 0.1;
    pub const ANGULAR_DAMPING: f32 = 0.1;
    /// Degrees per second
    pub const MAX_ANGULAR_SPEED_DEG: f32 = 800.0;
}
