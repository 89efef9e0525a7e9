//! Shared types used across ClusterSim crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub type RequestId = u64;
pub type WorkerId = u64;

/// Lower value = more urgent.
pub type Priority = i64;

pub const DEFAULT_PRIORITY: Priority = 2;

/// Human-readable label for a priority value.
pub fn priority_label(priority: Priority) -> String {
    match priority {
        1 => "high".to_string(),
        2 => "medium".to_string(),
        3 => "low".to_string(),
        other => other.to_string(),
    }
}

/// A unit of work with a known estimated execution cost.
///
/// `assigned_worker`, `start_ts` and `end_ts` are written once each by the
/// orchestrator while it reconciles worker events.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    /// Informational only.
    pub category: String,
    pub priority: Priority,
    /// Estimated cost in seconds (never negative).
    pub estimated_cost: f64,
    /// Seconds since simulation start.
    pub arrival: f64,

    pub assigned_worker: Option<WorkerId>,
    pub start_ts: Option<Instant>,
    pub end_ts: Option<Instant>,
}

impl Request {
    pub fn new(
        id: RequestId,
        category: impl Into<String>,
        priority: Priority,
        estimated_cost: f64,
        arrival: f64,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            priority,
            estimated_cost: estimated_cost.max(0.0),
            arrival: arrival.max(0.0),
            assigned_worker: None,
            start_ts: None,
            end_ts: None,
        }
    }

    /// Absolute arrival instant on the run's clock.
    pub fn arrival_at(&self, origin: Instant) -> Instant {
        origin + sim_duration(self.arrival)
    }

    /// `end_ts - arrival`, clamped to zero. `None` until completed.
    pub fn response_time(&self, origin: Instant) -> Option<Duration> {
        let end = self.end_ts?;
        Some(end.saturating_duration_since(self.arrival_at(origin)))
    }

    /// `start_ts - arrival`, clamped to zero. `None` until started.
    pub fn wait_time(&self, origin: Instant) -> Option<Duration> {
        let start = self.start_ts?;
        Some(start.saturating_duration_since(self.arrival_at(origin)))
    }

    /// Build the message sent to a worker unit at dispatch.
    pub fn to_task(&self, origin: Instant) -> Task {
        Task {
            id: self.id,
            category: self.category.clone(),
            priority: self.priority,
            estimated_cost: self.estimated_cost,
            arrival: self.arrival_at(origin),
        }
    }
}

/// The orchestrator's view of one worker.
///
/// `active` mirrors the count last reported by the worker itself;
/// `pending_starts` counts tasks dispatched but whose START has not yet
/// been observed, so a worker is never handed more tasks than it has slots.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerState {
    pub id: WorkerId,
    /// Concurrent slots and time-acceleration divisor (at least 1).
    pub capacity: u32,
    pub active: u32,
    pub pending_starts: u32,
    /// Sum of effective run times of finished tasks.
    pub effective_work: Duration,
    /// Set when the worker's task channel is gone; never selected again.
    pub closed: bool,
}

impl WorkerState {
    pub fn new(id: WorkerId, capacity: u32) -> Self {
        Self {
            id,
            capacity: capacity.max(1),
            active: 0,
            pending_starts: 0,
            effective_work: Duration::ZERO,
            closed: false,
        }
    }

    /// Occupied slots as seen by the orchestrator.
    pub fn load(&self) -> u32 {
        self.active + self.pending_starts
    }

    pub fn has_free_slot(&self) -> bool {
        !self.closed && self.load() < self.capacity
    }

    /// `load / capacity`, used by best-fit selection.
    pub fn load_ratio(&self) -> f64 {
        f64::from(self.load()) / f64::from(self.capacity.max(1))
    }
}

/// Longest span the simulated clock represents. Larger offsets and run
/// times saturate here.
pub const MAX_SIM_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Convert simulated seconds to a `Duration`, saturating at
/// [`MAX_SIM_DURATION`]. Negative and NaN values map to zero.
pub fn sim_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0))
        .unwrap_or(MAX_SIM_DURATION)
        .min(MAX_SIM_DURATION)
}

/// Effective run time of a task on a worker: `cost / capacity`.
pub fn effective_time(estimated_cost: f64, capacity: u32) -> Duration {
    sim_duration(estimated_cost.max(0.0) / f64::from(capacity.max(1)))
}

/// Task handed from the orchestrator to a worker unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: RequestId,
    pub category: String,
    pub priority: Priority,
    pub estimated_cost: f64,
    /// Absolute arrival instant.
    pub arrival: Instant,
}

/// Inbound message on a worker's task channel.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Run(Task),
    /// No more work will follow.
    Shutdown,
}

/// Event sent from a worker unit back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started {
        worker_id: WorkerId,
        request_id: RequestId,
        start_ts: Instant,
        /// Slots in use right after this task took one.
        active: u32,
    },
    Done {
        worker_id: WorkerId,
        request_id: RequestId,
        estimated_cost: f64,
        effective_time: Duration,
        start_ts: Instant,
        end_ts: Instant,
        /// Slots in use right after this task released its own.
        active: u32,
    },
}

impl Event {
    pub fn worker_id(&self) -> WorkerId {
        match self {
            Event::Started { worker_id, .. } | Event::Done { worker_id, .. } => *worker_id,
        }
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            Event::Started { request_id, .. } | Event::Done { request_id, .. } => *request_id,
        }
    }
}

/// Scheduling policy selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Round-robin over pending requests and over workers.
    #[default]
    Rr,
    /// Shortest job first, best-fit workers.
    Sjf,
    /// Lowest priority value first, best-fit workers.
    Priority,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Rr => "rr",
            Policy::Sjf => "sjf",
            Policy::Priority => "priority",
        }
    }
}

/// Error for an unrecognised policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown policy '{0}' (expected rr, sjf or priority)")]
pub struct ParsePolicyError(pub String);

impl std::str::FromStr for Policy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rr" => Ok(Policy::Rr),
            "sjf" => Ok(Policy::Sjf),
            "priority" => Ok(Policy::Priority),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
