//! Worker unit: runs dispatched tasks on a bounded set of slots.
//!
//! The orchestrator only dispatches to a unit with a free slot, so the
//! semaphore normally admits every task immediately. Tasks that arrive
//! while all slots are busy wait for a permit.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use clustersim_core::{Event, Task, WorkerId, WorkerMessage, effective_time};

/// An independent execution context owning `capacity` slots.
pub struct WorkerUnit {
    id: WorkerId,
    capacity: u32,
    tasks: mpsc::Receiver<WorkerMessage>,
    events: mpsc::Sender<Event>,
    shutdown: watch::Receiver<bool>,
}

/// State shared by the tasks running on one unit.
///
/// `active` is only changed while its lock is held, and the matching
/// event is sent before the lock is released, so events from one unit
/// carry monotonically consistent `active` values in channel order.
#[derive(Clone)]
struct SlotPool {
    worker_id: WorkerId,
    capacity: u32,
    permits: Arc<Semaphore>,
    active: Arc<Mutex<u32>>,
    events: mpsc::Sender<Event>,
}

impl WorkerUnit {
    pub fn new(
        id: WorkerId,
        capacity: u32,
        tasks: mpsc::Receiver<WorkerMessage>,
        events: mpsc::Sender<Event>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            capacity: capacity.max(1),
            tasks,
            events,
            shutdown,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Spawn the unit onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Accept tasks until the stop signal or a `Shutdown` message, then
    /// wait for every in-flight task to finish.
    pub async fn run(mut self) {
        let pool = SlotPool {
            worker_id: self.id,
            capacity: self.capacity,
            permits: Arc::new(Semaphore::new(self.capacity as usize)),
            active: Arc::new(Mutex::new(0)),
            events: self.events.clone(),
        };
        let mut in_flight = JoinSet::new();

        debug!(worker_id = self.id, capacity = self.capacity, "worker unit started");

        loop {
            if *self.shutdown.borrow_and_update() {
                debug!(worker_id = self.id, "stop signal observed");
                break;
            }

            tokio::select! {
                msg = self.tasks.recv() => match msg {
                    Some(WorkerMessage::Run(task)) => {
                        trace!(worker_id = self.id, request_id = task.id, "task received");
                        in_flight.spawn(pool.clone().execute(task));
                    }
                    Some(WorkerMessage::Shutdown) | None => {
                        debug!(worker_id = self.id, "no more work");
                        break;
                    }
                },
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        debug!(worker_id = self.id, "stop signal sender dropped");
                        break;
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    reap(self.id, joined);
                }
            }
        }

        let remaining = in_flight.len();
        if remaining > 0 {
            info!(worker_id = self.id, remaining, "waiting for in-flight tasks");
        }
        while let Some(joined) = in_flight.join_next().await {
            reap(self.id, joined);
        }

        debug!(worker_id = self.id, "worker unit stopped");
    }
}

impl SlotPool {
    /// Take a slot, emit `Started`, run for the effective time, emit `Done`.
    async fn execute(self, task: Task) {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            error!(worker_id = self.worker_id, request_id = task.id, "slot pool closed");
            return;
        };

        let start_ts = {
            let mut active = self.active.lock().await;
            *active += 1;
            let start_ts = Instant::now();
            self.emit(Event::Started {
                worker_id: self.worker_id,
                request_id: task.id,
                start_ts,
                active: *active,
            })
            .await;
            start_ts
        };

        let effective = effective_time(task.estimated_cost, self.capacity);
        tokio::time::sleep(effective).await;

        let mut active = self.active.lock().await;
        *active = active.saturating_sub(1);
        self.emit(Event::Done {
            worker_id: self.worker_id,
            request_id: task.id,
            estimated_cost: task.estimated_cost,
            effective_time: effective,
            start_ts,
            end_ts: Instant::now(),
            active: *active,
        })
        .await;
    }

    async fn emit(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            debug!(worker_id = self.worker_id, "event channel closed, dropping event");
        }
    }
}

fn reap(worker_id: WorkerId, joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(worker_id, error = %e, "task terminated abnormally");
    }
}
