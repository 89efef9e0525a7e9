//! clustersim-worker: the worker execution unit.
//!
//! A `WorkerUnit` is an independent task that owns `capacity` execution
//! slots. It consumes `WorkerMessage`s from its own inbound channel, runs
//! each task for `estimated_cost / capacity`, and reports `Started` / `Done`
//! events on the event channel shared by every unit.
//!
//! # Architecture
//!
//! ```text
//! WorkerUnit
//!   ├── inbound mpsc::Receiver<WorkerMessage>   (orchestrator → unit)
//!   ├── watch::Receiver<bool>                   (global stop signal)
//!   ├── Semaphore(capacity)                     (slot admission)
//!   ├── Mutex<u32> active                       (slot bookkeeping + event emission)
//!   └── JoinSet of in-flight tasks              (drained on shutdown)
//! ```

pub mod unit;

pub use unit::WorkerUnit;
