//! Orchestrator tuning knobs.

use std::time::Duration;

use clustersim_core::Policy;

/// Configuration for a single orchestrated run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub policy: Policy,
    /// Upper bound between two loop iterations when no event arrives.
    pub tick: Duration,
    /// How long to wait for worker units to exit after the stop signal.
    pub shutdown_timeout: Duration,
    /// Accepted and reported, but does not influence scheduling.
    pub overload_redirect_threshold: f64,
    /// Capacity of the shared event channel.
    pub event_buffer: usize,
    /// Capacity of each worker's task channel.
    pub task_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Rr,
            tick: Duration::from_millis(20),
            shutdown_timeout: Duration::from_secs(2),
            overload_redirect_threshold: 0.35,
            event_buffer: 1024,
            task_buffer: 64,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }
}
