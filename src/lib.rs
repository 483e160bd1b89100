//! Discrete-event simulation of open-pit haul cycles
//!
//! Trucks travel to their assigned excavator, queue for a loading slot,
//! load, haul to the dump and return, while weather, road wear and random
//! breakdowns stretch cycle times. A run produces an event log that
//! optimizers and viewers reduce to productivity figures.
//!
//! ```ignore
//! use haulsim::config::load_scenario;
//! use haulsim::model::mine_simulation::Simulation;
//!
//! let (scenario, engine) = load_scenario("scenario.json".as_ref())?;
//! let mut sim = Simulation::new(scenario, engine)?;
//! let log = sim.run(8.0);
//! println!("{} events", log.len());
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod model;

pub use error::{ConfigError, Error, Result};
