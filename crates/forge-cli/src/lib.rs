pub mod simulate;

pub use simulate::{run_simulation, SimulationParams, SimulationReport};
