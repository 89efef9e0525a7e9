//! Worker selection strategies.
//!
//! Both strategies only ever return a worker that has a free slot in the
//! orchestrator's view; when every worker is saturated they return `None`
//! and the caller retries on the next tick.

use std::cmp::Ordering;

use clustersim_core::{Policy, WorkerState};

/// Best-fit: among workers with a free slot, pick the minimum
/// `(load / capacity, -capacity, id)`.
///
/// Least loaded by ratio wins; ties go to the larger worker, then to the
/// lower id. Returns the index into `workers`.
pub fn best_fit(workers: &[WorkerState]) -> Option<usize> {
    workers
        .iter()
        .enumerate()
        .filter(|(_, w)| w.has_free_slot())
        .min_by(|(_, a), (_, b)| score_cmp(a, b))
        .map(|(i, _)| i)
}

fn score_cmp(a: &WorkerState, b: &WorkerState) -> Ordering {
    a.load_ratio()
        .total_cmp(&b.load_ratio())
        .then_with(|| b.capacity.cmp(&a.capacity))
        .then_with(|| a.id.cmp(&b.id))
}

/// Round-robin across workers, skipping saturated ones.
///
/// The cursor persists for the whole run. The worker list is expected in
/// a fixed order (sorted by id).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoundRobinSelector {
    cursor: usize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Scan forward from the cursor, wrapping once, and return the first
    /// worker with a free slot. The cursor moves past the chosen worker;
    /// it is left unchanged when nothing is free.
    pub fn select(&mut self, workers: &[WorkerState]) -> Option<usize> {
        let n = workers.len();
        if n == 0 {
            return None;
        }

        for k in 0..n {
            let idx = (self.cursor + k) % n;
            if workers[idx].has_free_slot() {
                self.cursor = (idx + 1) % n;
                return Some(idx);
            }
        }
        None
    }

    /// Current cursor value (for diagnostics).
    pub fn current(&self) -> usize {
        self.cursor
    }
}

/// Worker selection strategy bound to a run's policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerSelector {
    BestFit,
    RoundRobin(RoundRobinSelector),
}

impl WorkerSelector {
    /// RR requests go round-robin over workers; SJF and Priority use best-fit.
    pub fn for_policy(policy: Policy) -> Self {
        match policy {
            Policy::Rr => WorkerSelector::RoundRobin(RoundRobinSelector::new()),
            Policy::Sjf | Policy::Priority => WorkerSelector::BestFit,
        }
    }

    pub fn select(&mut self, workers: &[WorkerState]) -> Option<usize> {
        match self {
            WorkerSelector::BestFit => best_fit(workers),
            WorkerSelector::RoundRobin(rr) => rr.select(workers),
        }
    }
}
