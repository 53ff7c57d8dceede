pub mod aircraft;
pub mod airline;
pub mod airspace;
pub mod clock;
pub mod engine;
pub mod rng;
pub mod runway;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod tower;
pub mod weather;
pub mod web;
pub mod world;

pub use engine::{Engine, TickSummary};
pub use scenario::{Scenario, ScenarioError, SimulationConfig};
pub use snapshot::Snapshot;
