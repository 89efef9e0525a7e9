//! clustersim-orchestrator: the central coordinator of a simulated run.
//!
//! The orchestrator spawns one `WorkerUnit` per configured server, then
//! ticks until every request has arrived and completed:
//!
//! 1. admit requests whose arrival time has passed into `pending`
//! 2. drain `Started` / `Done` events and reconcile worker state
//! 3. stop once all requests are done
//! 4. dispatch while a worker has a free slot
//! 5. wait for the next event or tick
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   ├── Scheduler (request policy + worker selector)
//!   ├── per worker: mpsc::Sender<WorkerMessage> + JoinHandle
//!   ├── shared mpsc::Receiver<Event> (fan-in from all units)
//!   ├── watch::Sender<bool> (global stop signal)
//!   └── MetricsCollector (one sample per Done)
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
mod state;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{Orchestrator, Phase, RunOutcome};
