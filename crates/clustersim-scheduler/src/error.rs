//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur during scheduling operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Selection was asked to choose from an empty pending list.
    /// Callers must check for pending work first.
    #[error("no pending requests to select from")]
    EmptyPending,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
