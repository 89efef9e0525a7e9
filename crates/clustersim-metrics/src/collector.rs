//! Metrics collector: per-request samples and the final aggregation.
//!
//! Only the orchestrator's own task writes samples, so no locking is
//! involved here.

use std::time::Duration;

use clustersim_core::{RequestId, WorkerState};
use tracing::debug;

use crate::report::{MetricsReport, WorkerUtilization};

/// Lower bound on the makespan used as a divisor, in seconds.
pub const MAKESPAN_EPSILON: f64 = 1e-9;

/// Timing of one completed request, both already clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub request_id: RequestId,
    /// `end - arrival`
    pub response: Duration,
    /// `start - arrival`
    pub wait: Duration,
}

/// Accumulates samples over a run.
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    samples: Vec<Sample>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request.
    pub fn record(&mut self, request_id: RequestId, response: Duration, wait: Duration) {
        self.samples.push(Sample {
            request_id,
            response,
            wait,
        });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn completed(&self) -> usize {
        self.samples.len()
    }

    /// Aggregate the recorded samples. Does not consume or reset them.
    pub fn report(
        &self,
        workers: &[WorkerState],
        total_requests: usize,
        makespan: Duration,
    ) -> MetricsReport {
        aggregate(workers, &self.samples, total_requests, makespan)
    }
}

/// Fold samples and worker totals into a report.
///
/// - mean response time over completed requests (0 if none)
/// - maximum wait time (0 if none)
/// - throughput = `total_requests / makespan`
/// - per-worker utilization = `effective_work / (makespan * capacity)`,
///   clamped to `[0, 1]`; overall = arithmetic mean over workers
pub fn aggregate(
    workers: &[WorkerState],
    samples: &[Sample],
    total_requests: usize,
    makespan: Duration,
) -> MetricsReport {
    let makespan_secs = makespan.as_secs_f64().max(MAKESPAN_EPSILON);

    let avg_response_secs = if samples.is_empty() {
        0.0
    } else {
        samples
            .iter()
            .map(|s| s.response.as_secs_f64())
            .sum::<f64>()
            / samples.len() as f64
    };

    let max_wait_secs = samples
        .iter()
        .map(|s| s.wait.as_secs_f64())
        .fold(0.0, f64::max);

    let throughput_per_sec = total_requests as f64 / makespan_secs;

    let per_worker: Vec<WorkerUtilization> = workers
        .iter()
        .map(|w| {
            let capacity = f64::from(w.capacity.max(1));
            let utilization = w.effective_work.as_secs_f64() / (makespan_secs * capacity);
            WorkerUtilization {
                worker_id: w.id,
                capacity: w.capacity,
                utilization: utilization.clamp(0.0, 1.0),
            }
        })
        .collect();

    let avg_utilization = if per_worker.is_empty() {
        0.0
    } else {
        per_worker.iter().map(|w| w.utilization).sum::<f64>() / per_worker.len() as f64
    };

    debug!(
        completed = samples.len(),
        total_requests,
        makespan_secs,
        "metrics aggregated"
    );

    MetricsReport {
        avg_response_secs,
        max_wait_secs,
        throughput_per_sec,
        avg_utilization,
        workers: per_worker,
        total_requests,
        completed: samples.len(),
        makespan_secs,
    }
}
