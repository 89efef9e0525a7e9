//! clustersim-core: shared model for the cluster simulator.
//!
//! Holds the entities every other crate exchanges:
//!
//! - `Request` / `WorkerState`: the data model mutated by the orchestrator
//! - `Task` / `WorkerMessage` / `Event`: typed messages between the
//!   orchestrator and worker units
//! - `SimConfig`: the JSON config document and its conversion into a
//!   runnable `Scenario` (sanitation + arrival synthesis)

pub mod config;
pub mod error;
pub mod types;

pub use config::{RequestConfig, Scenario, ServerConfig, SimConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
