//! Simulation metrics
//!
//! Atomic counters updated by the tick loop, rendered in Prometheus text
//! format or JSON.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Rolling window used for tick time percentiles
const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for the simulation
#[derive(Debug)]
pub struct Metrics {
    // Population
    pub boid_count: AtomicU64,
    pub ball_count: AtomicU64,
    pub body_count: AtomicU64,

    // Flocking activity
    pub neighbor_events_total: AtomicU64,
    pub boids_steered_total: AtomicU64,
    pub agents_removed_total: AtomicU64,
    /// Mean neighbour-set size, stored as value * 100
    pub mean_neighbors_x100: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            boid_count: AtomicU64::new(0),
            ball_count: AtomicU64::new(0),
            body_count: AtomicU64::new(0),
            neighbor_events_total: AtomicU64::new(0),
            boids_steered_total: AtomicU64::new(0),
            agents_removed_total: AtomicU64::new(0),
            mean_neighbors_x100: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn set_mean_neighbors(&self, mean: f32) {
        let scaled = if mean.is_finite() && mean > 0.0 { (mean * 100.0).round() as u64 } else { 0 };
        self.mean_neighbors_x100.store(scaled, Ordering::Relaxed);
    }

    pub fn mean_neighbors(&self) -> f32 {
        self.mean_neighbors_x100.load(Ordering::Relaxed) as f32 / 100.0
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("flockball_boids", "Number of boids", "gauge",
            self.boid_count.load(Ordering::Relaxed));
        metric!("flockball_balls", "Number of player balls", "gauge",
            self.ball_count.load(Ordering::Relaxed));
        metric!("flockball_bodies", "Number of physics bodies", "gauge",
            self.body_count.load(Ordering::Relaxed));

        metric!("flockball_neighbor_events_total", "Neighbour set changes from overlap events", "counter",
            self.neighbor_events_total.load(Ordering::Relaxed));
        metric!("flockball_boids_steered_total", "Boid ticks that applied flocking impulses", "counter",
            self.boids_steered_total.load(Ordering::Relaxed));
        metric!("flockball_agents_removed_total", "Agents removed from the simulation", "counter",
            self.agents_removed_total.load(Ordering::Relaxed));
        metric!("flockball_mean_neighbors", "Mean neighbour-set size", "gauge",
            self.mean_neighbors());

        metric!("flockball_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("flockball_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("flockball_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("flockball_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("flockball_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("flockball_uptime_seconds", "Uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// JSON rendering of the same values
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "population": {
                "boids": self.boid_count.load(Ordering::Relaxed),
                "balls": self.ball_count.load(Ordering::Relaxed),
                "bodies": self.body_count.load(Ordering::Relaxed),
            },
            "flocking": {
                "neighbor_events": self.neighbor_events_total.load(Ordering::Relaxed),
                "boids_steered": self.boids_steered_total.load(Ordering::Relaxed),
                "agents_removed": self.agents_removed_total.load(Ordering::Relaxed),
                "mean_neighbors": self.mean_neighbors(),
            },
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
