//! Simulation driver
//!
//! Owns the physics world and every agent. A tick runs in fixed phases:
//!
//! 1. deliver overlap events queued by the previous step to their trackers
//! 2. apply player ball input
//! 3. compute every boid's flocking forces against a frozen world
//! 4. apply each boid's impulses to its own body
//! 5. integrate physics and refresh overlaps (queuing events for the next tick)
//!
//! Neighbour sets are therefore never mutated while forces are being computed.

use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{ConfigError, SimConfig};
use crate::flock::{Agent, AgentKind, Ball, BallInput, Boid, FlockForces, FlockParticipant};
use crate::metrics::Metrics;
use crate::physics::{BodyDesc, BodyId, OverlapKind, PhysicsWorld, RigidBody};
use crate::sim::snapshot::{AgentSnapshot, SimulationSnapshot};
use crate::util::vec3::Vec3;

/// Simulation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("unknown agent {0}")]
    UnknownAgent(BodyId),
    #[error("agent {0} is not a ball")]
    NotABall(BodyId),
    #[error("invalid time step {0}")]
    InvalidTimeStep(f32),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// Overlap events that changed a neighbour set
    pub neighbor_changes: usize,
    /// Boids that had neighbours and applied impulses
    pub boids_steered: usize,
    pub agents: usize,
}

pub struct Simulation {
    config: SimConfig,
    world: PhysicsWorld,
    agents: HashMap<BodyId, Agent>,
    tick: u64,
    metrics: Option<Arc<Metrics>>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let world = PhysicsWorld::new(config.grid_cell_size).with_gravity(config.gravity);

        Ok(Self {
            config,
            world,
            agents: HashMap::new(),
            tick: 0,
            metrics: None,
        })
    }

    /// Report tick timings and counters into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn agent(&self, id: BodyId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn boid_count(&self) -> usize {
        self.agents.values().filter(|a| a.kind() == AgentKind::Boid).count()
    }

    /// Current neighbour set of an agent
    pub fn neighbors_of(&self, id: BodyId) -> Option<&HashSet<BodyId>> {
        self.agents.get(&id).map(|agent| agent.tracker().current_neighbors())
    }

    pub fn spawn_boid(&mut self, position: Vec3, velocity: Vec3) -> BodyId {
        let boid = Boid::spawn(&mut self.world, position, velocity, self.config.boid);
        let id = boid.body_id();
        self.agents.insert(id, Agent::Boid(boid));
        self.update_population();
        id
    }

    pub fn spawn_ball(&mut self, position: Vec3) -> BodyId {
        let ball = Ball::spawn(&mut self.world, position, self.config.ball_detection_radius);
        let id = ball.body_id();
        info!(%id, x = position.x, y = position.y, "ball spawned");
        self.agents.insert(id, Agent::Ball(ball));
        self.update_population();
        id
    }

    /// Static obstacle: overlaps detectors but never joins a neighbour set
    pub fn spawn_prop(&mut self, position: Vec3, radius: f32) -> BodyId {
        let id = self.world.add_body(BodyDesc::prop(position, radius));
        self.update_population();
        id
    }

    /// Remove an agent and its body, and purge it from every other neighbour set
    pub fn remove_agent(&mut self, id: BodyId) -> Result<AgentKind, SimError> {
        let agent = self.agents.remove(&id).ok_or(SimError::UnknownAgent(id))?;
        let kind = agent.kind();
        // Releases the agent's detector
        drop(agent);
        self.world.remove_body(id);

        let purged = self
            .agents
            .values_mut()
            .map(|other| other.tracker_mut().forget(id))
            .filter(|forgotten| *forgotten)
            .count();

        info!(%id, ?kind, purged, "agent removed");
        if let Some(metrics) = &self.metrics {
            metrics.agents_removed_total.fetch_add(1, Ordering::Relaxed);
        }
        self.update_population();
        Ok(kind)
    }

    pub fn set_ball_input(&mut self, id: BodyId, input: BallInput) -> Result<(), SimError> {
        let agent = self.agents.get_mut(&id).ok_or(SimError::UnknownAgent(id))?;
        let ball = agent.as_ball_mut().ok_or(SimError::NotABall(id))?;
        ball.set_input(input);
        Ok(())
    }

    /// Advance the simulation by `dt` seconds
    pub fn tick(&mut self, dt: f32) -> Result<TickReport, SimError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::InvalidTimeStep(dt));
        }
        let started = Instant::now();

        let neighbor_changes = self.deliver_overlap_events();

        for agent in self.agents.values_mut() {
            if let Some(ball) = agent.as_ball_mut() {
                ball.on_tick(&mut self.world);
            }
        }

        let plans = self.plan_flocking();
        let scale = self.config.impulse_scaling.factor(dt);
        let mut boids_steered = 0;
        for (id, forces) in &plans {
            let Some(boid) = self.agents.get(id).and_then(Agent::as_boid) else {
                continue;
            };
            if boid.apply_forces(&mut self.world, forces, scale).is_some() {
                boids_steered += 1;
            }
        }

        self.world.step(dt);
        self.tick += 1;

        let report = TickReport {
            tick: self.tick,
            neighbor_changes,
            boids_steered,
            agents: self.agents.len(),
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_tick_time(started.elapsed());
            metrics
                .neighbor_events_total
                .fetch_add(neighbor_changes as u64, Ordering::Relaxed);
            metrics
                .boids_steered_total
                .fetch_add(boids_steered as u64, Ordering::Relaxed);
            metrics.set_mean_neighbors(self.mean_neighbor_count());
        }
        trace!(
            tick = report.tick,
            neighbor_changes,
            boids_steered,
            "tick complete"
        );

        Ok(report)
    }

    /// Serializable view of every agent, sorted by id
    pub fn snapshot(&self) -> SimulationSnapshot {
        let mut agents: Vec<AgentSnapshot> = self
            .agents
            .values()
            .filter_map(|agent| {
                let body = self.world.body(agent.body_id())?;
                Some(AgentSnapshot {
                    id: agent.body_id(),
                    kind: agent.kind(),
                    position: body.position(),
                    velocity: body.velocity(),
                    neighbor_count: agent.tracker().len(),
                    grounded: body.is_grounded(),
                })
            })
            .collect();
        agents.sort_by_key(|a| a.id);

        SimulationSnapshot {
            tick: self.tick,
            agents,
        }
    }

    pub fn mean_neighbor_count(&self) -> f32 {
        if self.agents.is_empty() {
            return 0.0;
        }
        let total: usize = self.agents.values().map(|a| a.tracker().len()).sum();
        total as f32 / self.agents.len() as f32
    }

    /// Route queued overlap transitions to the tracker of the detector's owner
    fn deliver_overlap_events(&mut self) -> usize {
        let events = self.world.drain_events();
        let mut changes = 0;

        for event in &events {
            let Some(agent) = self.agents.get_mut(&event.owner) else {
                continue;
            };
            if agent.detector_id() != event.detector {
                continue;
            }

            let changed = match event.kind {
                OverlapKind::Begin => {
                    let other = self.world.participant(event.other);
                    agent
                        .tracker_mut()
                        .on_enter_range(other.as_ref().map(|p| p as &dyn FlockParticipant))
                }
                OverlapKind::End => agent.tracker_mut().on_exit_range(Some(event.other)),
            };
            if changed {
                changes += 1;
            }
        }

        if !events.is_empty() {
            debug!(events = events.len(), changes, "overlap events delivered");
        }
        changes
    }

    /// Read-only flocking phase
    fn plan_flocking(&self) -> Vec<(BodyId, FlockForces)> {
        let world = &self.world;
        let min_distance = self.config.min_avoidance_distance;

        #[cfg(feature = "parallel")]
        let plans = self
            .agents
            .par_iter()
            .filter_map(|(id, agent)| {
                agent
                    .as_boid()
                    .map(|boid| (*id, boid.compute_forces(world, min_distance)))
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let plans = self
            .agents
            .iter()
            .filter_map(|(id, agent)| {
                agent
                    .as_boid()
                    .map(|boid| (*id, boid.compute_forces(world, min_distance)))
            })
            .collect();

        plans
    }

    fn update_population(&self) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let boids = self.boid_count() as u64;
        metrics.boid_count.store(boids, Ordering::Relaxed);
        metrics
            .ball_count
            .store(self.agents.len() as u64 - boids, Ordering::Relaxed);
        metrics
            .body_count
            .store(self.world.body_count() as u64, Ordering::Relaxed);
    }
}
