//! Report printing for both output formats.

use std::fmt::Write;

use serde::Serialize;

use clustersim_core::{Policy, RequestId, WorkerId};
use clustersim_metrics::{MetricsReport, render_text};
use clustersim_orchestrator::RunOutcome;

/// Machine-readable form of a finished run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub policy: Policy,
    pub seed: u64,
    pub overload_redirect_threshold: f64,
    pub dispatched: usize,
    pub started: usize,
    pub completed: usize,
    pub lost: usize,
    pub force_stopped: bool,
    pub dispatch_order: Vec<(RequestId, WorkerId)>,
    pub report: MetricsReport,
}

impl RunSummary {
    pub fn from_outcome(outcome: &RunOutcome, seed: u64) -> Self {
        Self {
            policy: outcome.policy,
            seed,
            overload_redirect_threshold: outcome.overload_redirect_threshold,
            dispatched: outcome.dispatch_order.len(),
            started: outcome.started,
            completed: outcome.completed(),
            lost: outcome.lost,
            force_stopped: outcome.force_stopped,
            dispatch_order: outcome.dispatch_order.clone(),
            report: outcome.report(),
        }
    }
}

pub fn format_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Policy: {} | seed {} | overload redirect threshold {:.2} (unused)",
        summary.policy, summary.seed, summary.overload_redirect_threshold
    );
    out.push_str(&render_text(&summary.report));
    let _ = writeln!(
        out,
        "Dispatched: {} | Started: {} | Completed: {} | Lost: {}",
        summary.dispatched, summary.started, summary.completed, summary.lost
    );
    if summary.force_stopped {
        let _ = writeln!(out, "Warning: some workers were force-stopped at shutdown");
    }
    out
}

pub fn format_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustersim_metrics::WorkerUtilization;

    fn summary(force_stopped: bool) -> RunSummary {
        RunSummary {
            policy: Policy::Sjf,
            seed: 7,
            overload_redirect_threshold: 0.35,
            dispatched: 2,
            started: 2,
            completed: 2,
            lost: 0,
            force_stopped,
            dispatch_order: vec![(2, 1), (1, 1)],
            report: MetricsReport {
                avg_response_secs: 4.0,
                max_wait_secs: 2.0,
                throughput_per_sec: 0.33,
                avg_utilization: 1.0,
                workers: vec![WorkerUtilization {
                    worker_id: 1,
                    capacity: 1,
                    utilization: 1.0,
                }],
                total_requests: 2,
                completed: 2,
                makespan_secs: 6.0,
            },
        }
    }

    #[test]
    fn text_includes_counts_and_report() {
        let text = format_text(&summary(false));
        assert!(text.starts_with("Policy: sjf | seed 7"));
        assert!(text.contains("Average response time: 4.00s"));
        assert!(text.contains("Dispatched: 2 | Started: 2 | Completed: 2 | Lost: 0"));
        assert!(!text.contains("force-stopped"));
    }

    #[test]
    fn text_flags_force_stop() {
        assert!(format_text(&summary(true)).contains("force-stopped"));
    }

    #[test]
    fn json_uses_lowercase_policy() {
        let json: serde_json::Value =
            serde_json::from_str(&format_json(&summary(false)).unwrap()).unwrap();
        assert_eq!(json["policy"], "sjf");
        assert_eq!(json["dispatch_order"][0][0], 2);
        assert_eq!(json["report"]["makespan_secs"], 6.0);
    }
}
