//! Serializable view of the simulation for logging and inspection

use serde::Serialize;

use crate::flock::agent::AgentKind;
use crate::physics::BodyId;
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: BodyId,
    pub kind: AgentKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub neighbor_count: usize,
    pub grounded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSnapshot {
    pub tick: u64,
    /// Sorted by id
    pub agents: Vec<AgentSnapshot>,
}

impl SimulationSnapshot {
    /// Mean position of all boids
    pub fn flock_center(&self) -> Option<Vec3> {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for agent in self.agents.iter().filter(|a| a.kind == AgentKind::Boid) {
            sum += agent.position;
            count += 1;
        }
        (count > 0).then(|| sum / count as f32)
    }

    pub fn mean_neighbor_count(&self) -> f32 {
        if self.agents.is_empty() {
            return 0.0;
        }
        let total: usize = self.agents.iter().map(|a| a.neighbor_count).sum();
        total as f32 / self.agents.len() as f32
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
