//! clustersim-metrics: post-run performance metrics.
//!
//! The orchestrator records one `(response, wait)` sample per completed
//! request while it drains `Done` events. Once the run has stopped, the
//! samples and the per-worker effective-work totals are folded into a
//! `MetricsReport`.
//!
//! # Architecture
//!
//! ```text
//! MetricsCollector
//!   ├── record() ← called per Done event
//!   └── report() → MetricsReport (pure, repeatable)
//!
//! Rendering
//!   └── render_text() → human-readable summary block
//! ```

pub mod collector;
pub mod report;

pub use collector::{MAKESPAN_EPSILON, MetricsCollector, Sample, aggregate};
pub use report::{MetricsReport, WorkerUtilization, render_text};
