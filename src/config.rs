use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::flock::constants::{ball, boid, flocking};
use crate::physics::constants::GRAVITY;
use crate::physics::spatial::DEFAULT_CELL_SIZE;

/// Per-agent flocking tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlockTuning {
    /// Multiplier on the planar velocity-matching impulse
    pub alignment_constant: f32,
    /// Multiplier on the pull toward the neighbours' centre
    pub cohesion_constant: f32,
    /// Multiplier on the mean repulsion vector
    pub avoidance_constant: f32,
    /// Radius of the neighbour detector sphere
    pub detection_radius: f32,
}

impl Default for FlockTuning {
    fn default() -> Self {
        Self {
            alignment_constant: boid::ALIGNMENT_CONSTANT,
            cohesion_constant: boid::COHESION_CONSTANT,
            avoidance_constant: boid::AVOIDANCE_CONSTANT,
            detection_radius: boid::DETECTION_RADIUS,
        }
    }
}

/// How flocking impulses relate to frame time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpulseScaling {
    /// One full impulse per tick regardless of `dt` (frame-rate dependent)
    #[default]
    PerFrame,
    /// Impulses multiplied by `dt`
    DeltaTime,
}

impl ImpulseScaling {
    #[inline]
    pub fn factor(self, dt: f32) -> f32 {
        match self {
            ImpulseScaling::PerFrame => 1.0,
            ImpulseScaling::DeltaTime => dt,
        }
    }
}

impl FromStr for ImpulseScaling {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_frame" | "frame" => Ok(ImpulseScaling::PerFrame),
            "delta_time" | "dt" => Ok(ImpulseScaling::DeltaTime),
            other => Err(ConfigError::UnknownImpulseScaling(other.to_string())),
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Tuning shared by every spawned boid
    pub boid: FlockTuning,
    /// Detector radius of the player ball
    pub ball_detection_radius: f32,
    /// Avoidance distances are clamped to at least this value
    pub min_avoidance_distance: f32,
    pub impulse_scaling: ImpulseScaling,
    /// Cell size of the overlap grid
    pub grid_cell_size: f32,
    pub gravity: f32,
    /// Ticks per second of the headless driver
    pub tick_rate: u32,
    /// Boids spawned by the headless driver
    pub boid_count: usize,
    /// Boids spawn uniformly inside this disc around the ball
    pub spawn_radius: f32,
    /// How long the headless driver runs (0 = until Ctrl+C)
    pub run_seconds: u64,
    /// Print the final snapshot as JSON
    pub dump_snapshot: bool,
    /// Fixed RNG seed for reproducible spawns
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            boid: FlockTuning::default(),
            ball_detection_radius: ball::DETECTION_RADIUS,
            min_avoidance_distance: flocking::MIN_AVOIDANCE_DISTANCE,
            impulse_scaling: ImpulseScaling::PerFrame,
            grid_cell_size: DEFAULT_CELL_SIZE,
            gravity: GRAVITY,
            tick_rate: 60,
            boid_count: 40,
            spawn_radius: 2500.0,
            run_seconds: 30,
            dump_snapshot: false,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("FLOCK_ALIGNMENT_CONSTANT") {
            config.boid.alignment_constant = v;
        }
        if let Some(v) = env_parse("FLOCK_COHESION_CONSTANT") {
            config.boid.cohesion_constant = v;
        }
        if let Some(v) = env_parse("FLOCK_AVOIDANCE_CONSTANT") {
            config.boid.avoidance_constant = v;
        }
        if let Some(v) = env_parse::<f32>("FLOCK_DETECTION_RADIUS") {
            if v > 0.0 {
                config.boid.detection_radius = v;
            } else {
                tracing::warn!("FLOCK_DETECTION_RADIUS must be > 0, using default");
            }
        }
        if let Some(v) = env_parse::<f32>("BALL_DETECTION_RADIUS") {
            if v > 0.0 {
                config.ball_detection_radius = v;
            } else {
                tracing::warn!("BALL_DETECTION_RADIUS must be > 0, using default");
            }
        }
        if let Some(v) = env_parse("FLOCK_MIN_AVOIDANCE_DISTANCE") {
            config.min_avoidance_distance = v;
        }
        if let Some(v) = env_parse("FLOCK_IMPULSE_SCALING") {
            config.impulse_scaling = v;
        }
        if let Some(v) = env_parse("GRID_CELL_SIZE") {
            config.grid_cell_size = v;
        }
        if let Some(v) = env_parse("GRAVITY") {
            config.gravity = v;
        }
        if let Some(v) = env_parse::<u32>("TICK_RATE") {
            if (1..=1000).contains(&v) {
                config.tick_rate = v;
            } else {
                tracing::warn!("TICK_RATE must be 1-1000, using default");
            }
        }
        if let Some(v) = env_parse("BOID_COUNT") {
            config.boid_count = v;
        }
        if let Some(v) = env_parse("SPAWN_RADIUS") {
            config.spawn_radius = v;
        }
        if let Some(v) = env_parse("RUN_SECONDS") {
            config.run_seconds = v;
        }
        if let Some(v) = env_parse("DUMP_SNAPSHOT") {
            config.dump_snapshot = v;
        }
        if let Some(v) = env_parse("SIM_SEED") {
            config.seed = Some(v);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tuning = &self.boid;
        for (name, value) in [
            ("alignment_constant", tuning.alignment_constant),
            ("cohesion_constant", tuning.cohesion_constant),
            ("avoidance_constant", tuning.avoidance_constant),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite(name));
            }
        }
        if !(tuning.detection_radius > 0.0) || !tuning.detection_radius.is_finite() {
            return Err(ConfigError::NonPositive("detection_radius"));
        }
        if !(self.ball_detection_radius > 0.0) || !self.ball_detection_radius.is_finite() {
            return Err(ConfigError::NonPositive("ball_detection_radius"));
        }
        if !(self.min_avoidance_distance > 0.0) {
            return Err(ConfigError::NonPositive("min_avoidance_distance"));
        }
        if !(self.grid_cell_size > 0.0) {
            return Err(ConfigError::NonPositive("grid_cell_size"));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::NotFinite("gravity"));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::NonPositive("tick_rate"));
        }
        if self.spawn_radius < 0.0 || !self.spawn_radius.is_finite() {
            return Err(ConfigError::NotFinite("spawn_radius"));
        }
        Ok(())
    }

    /// Seconds per tick of the headless driver
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),
    #[error("unknown impulse scaling '{0}' (expected per_frame or delta_time)")]
    UnknownImpulseScaling(String),
}

/// Read and parse an environment variable, warning on unparsable values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}
