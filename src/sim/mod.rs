pub mod simulation;
pub mod snapshot;

pub use simulation::{SimError, Simulation, TickReport};
pub use snapshot::{AgentSnapshot, SimulationSnapshot};
