//! Final run report and its text rendering.

use std::fmt::Write;

use clustersim_core::WorkerId;
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub avg_response_secs: f64,
    pub max_wait_secs: f64,
    pub throughput_per_sec: f64,
    /// Mean of per-worker utilizations, `0.0..=1.0`.
    pub avg_utilization: f64,
    pub workers: Vec<WorkerUtilization>,
    pub total_requests: usize,
    pub completed: usize,
    pub makespan_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerUtilization {
    pub worker_id: WorkerId,
    pub capacity: u32,
    /// `0.0..=1.0`
    pub utilization: f64,
}

const RULE: &str = "-----------------------------------------------";

/// Render the report as the human-readable summary block.
pub fn render_text(report: &MetricsReport) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Final summary:");
    let _ = writeln!(out, "Average response time: {:.2}s", report.avg_response_secs);
    let _ = writeln!(out, "Maximum wait time: {:.2}s", report.max_wait_secs);
    let _ = writeln!(out, "Throughput: {:.2} tasks/second", report.throughput_per_sec);
    let _ = writeln!(
        out,
        "Average utilization (simulated): {:.1}%",
        report.avg_utilization * 100.0
    );
    let _ = writeln!(out, "Utilization per server (simulated):");
    for w in &report.workers {
        let _ = writeln!(
            out,
            "  - Server {} (capacity {}): {:.1}%",
            w.worker_id,
            w.capacity,
            w.utilization * 100.0
        );
    }
    let _ = writeln!(
        out,
        "Completed: {}/{} in {:.2}s",
        report.completed, report.total_requests, report.makespan_secs
    );
    let _ = writeln!(out, "{RULE}");

    out
}
