pub mod ai;
pub mod config;
pub mod ecs;
pub mod error;
pub mod game;
pub mod protocol;
pub mod simulation;

pub use config::SimConfig;
pub use error::{CharacterStateError, ConfigError, EncodeError, LoadoutError};
pub use simulation::{Simulation, TickPhase};
