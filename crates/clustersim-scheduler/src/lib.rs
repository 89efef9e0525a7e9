//! clustersim-scheduler: request selection and worker selection.
//!
//! Pure, deterministic functions over the orchestrator's state:
//!
//! - `policy` picks which pending request goes next (RR, SJF, Priority)
//! - `selector` picks which worker receives it (best-fit by load ratio,
//!   or round-robin across workers)
//! - `Scheduler` combines both behind the policy chosen for a run
//!
//! # Architecture
//!
//! ```text
//! Scheduler
//!   ├── Policy + rr cursor  → select_request(pending) → index
//!   └── WorkerSelector
//!       ├── BestFit          (SJF, Priority)
//!       └── RoundRobinSelector (RR, persistent cursor)
//! ```

pub mod error;
pub mod policy;
pub mod scheduler;
pub mod selector;

pub use error::{SchedulerError, SchedulerResult};
pub use policy::{advance_cursor, select_request};
pub use scheduler::{Assignment, Scheduler};
pub use selector::{RoundRobinSelector, WorkerSelector, best_fit};
