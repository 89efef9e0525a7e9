//! Orchestrator error types.

use thiserror::Error;

use clustersim_core::ConfigError;
use clustersim_scheduler::SchedulerError;

/// Errors that abort a run.
///
/// Only configuration problems are expected here; they are raised before
/// any worker unit is spawned.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
