//! Scheduler: pairs the next pending request with a worker.
//!
//! The `Scheduler` owns the per-run selection state (request round-robin
//! cursor and worker selector) and is driven by the orchestrator's
//! dispatch sub-loop, one assignment at a time.

use clustersim_core::{Policy, Request, WorkerState};
use tracing::trace;

use crate::error::SchedulerResult;
use crate::policy::{advance_cursor, select_request};
use crate::selector::WorkerSelector;

/// A request removed from `pending` together with the index of the worker
/// that should run it.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub request: Request,
    pub worker_index: usize,
}

/// Per-run scheduling state.
#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: Policy,
    rr_cursor: usize,
    workers: WorkerSelector,
}

impl Scheduler {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            rr_cursor: 0,
            workers: WorkerSelector::for_policy(policy),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Produce the next assignment, or `None` when nothing can be placed
    /// right now (no pending work, or no worker with a free slot).
    ///
    /// The worker is chosen first so a request only leaves `pending` when
    /// it can actually be placed.
    pub fn next_assignment(
        &mut self,
        pending: &mut Vec<Request>,
        workers: &[WorkerState],
    ) -> SchedulerResult<Option<Assignment>> {
        if pending.is_empty() {
            return Ok(None);
        }

        let Some(worker_index) = self.workers.select(workers) else {
            trace!(pending = pending.len(), "no worker with a free slot");
            return Ok(None);
        };

        let idx = select_request(pending, self.policy, self.rr_cursor)?;
        let request = pending.remove(idx);

        if self.policy == Policy::Rr {
            self.rr_cursor = advance_cursor(self.rr_cursor, pending.len());
        }

        Ok(Some(Assignment {
            request,
            worker_index,
        }))
    }
}
