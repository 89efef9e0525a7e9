//! Mutable run state owned by the orchestrator task.
//!
//! Everything here is touched from a single task, so plain fields are
//! enough. Worker units only communicate through events.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use clustersim_core::{
    Event, Request, RequestId, WorkerId, WorkerMessage, WorkerState, priority_label,
};
use clustersim_metrics::MetricsCollector;
use clustersim_scheduler::Scheduler;

use crate::error::OrchestratorResult;

pub(crate) struct RunState {
    pub origin: Instant,
    /// Every request of the run, sorted by `(arrival, id)`.
    pub requests: Vec<Request>,
    request_index: HashMap<RequestId, usize>,
    /// Index of the first request in `requests` not yet admitted.
    next_arrival: usize,
    pub pending: Vec<Request>,
    pub workers: Vec<WorkerState>,
    worker_index: HashMap<WorkerId, usize>,
    pub metrics: MetricsCollector,
    pub dispatch_order: Vec<(RequestId, WorkerId)>,
    pub started: usize,
    pub completed: usize,
    /// Requests whose dispatch failed because the unit was gone.
    pub lost: usize,
}

impl RunState {
    pub fn new(origin: Instant, workers: Vec<WorkerState>, requests: Vec<Request>) -> Self {
        let request_index = requests
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        let worker_index = workers.iter().enumerate().map(|(i, w)| (w.id, i)).collect();
        Self {
            origin,
            requests,
            request_index,
            next_arrival: 0,
            pending: Vec::new(),
            workers,
            worker_index,
            metrics: MetricsCollector::new(),
            dispatch_order: Vec::new(),
            started: 0,
            completed: 0,
            lost: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.requests.len()
    }

    /// Move every request whose arrival offset has passed into `pending`.
    pub fn admit_arrivals(&mut self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.origin).as_secs_f64();
        let mut admitted = 0;
        while let Some(request) = self.requests.get(self.next_arrival) {
            if request.arrival > elapsed {
                break;
            }
            debug!(request_id = request.id, arrival = request.arrival, "request arrived");
            self.pending.push(request.clone());
            self.next_arrival += 1;
            admitted += 1;
        }
        admitted
    }

    pub fn all_arrived(&self) -> bool {
        self.next_arrival >= self.requests.len()
    }

    /// Every request has arrived and is either completed or lost.
    pub fn is_finished(&self) -> bool {
        self.all_arrived() && self.completed + self.lost >= self.total()
    }

    /// No worker can accept work any more.
    pub fn all_workers_closed(&self) -> bool {
        self.workers.iter().all(|w| w.closed)
    }

    /// Reconcile the worker view and request records with one event.
    ///
    /// `active` is taken from the payload as-is. Events for unknown workers
    /// or requests are logged and ignored.
    pub fn apply(&mut self, event: Event) {
        let Some(&wi) = self.worker_index.get(&event.worker_id()) else {
            warn!(
                worker_id = event.worker_id(),
                request_id = event.request_id(),
                "event from unknown worker ignored"
            );
            return;
        };

        match event {
            Event::Started {
                worker_id,
                request_id,
                start_ts,
                active,
            } => {
                let worker = &mut self.workers[wi];
                worker.active = active;
                worker.pending_starts = worker.pending_starts.saturating_sub(1);
                self.started += 1;

                let Some(record) = self.record_mut(request_id) else {
                    warn!(worker_id, request_id, "start for unknown request ignored");
                    return;
                };
                record.start_ts.get_or_insert(start_ts);
                record.assigned_worker.get_or_insert(worker_id);
                debug!(worker_id, request_id, active, "request started");
            }
            Event::Done {
                worker_id,
                request_id,
                estimated_cost,
                effective_time,
                start_ts,
                end_ts,
                active,
            } => {
                let worker = &mut self.workers[wi];
                worker.active = active;
                worker.effective_work = worker.effective_work.saturating_add(effective_time);

                let origin = self.origin;
                let Some(record) = self.record_mut(request_id) else {
                    warn!(worker_id, request_id, "completion for unknown request ignored");
                    return;
                };
                record.start_ts.get_or_insert(start_ts);
                record.end_ts = Some(end_ts);
                let response = record.response_time(origin).unwrap_or_default();
                let wait = record.wait_time(origin).unwrap_or_default();

                self.completed += 1;
                self.metrics.record(request_id, response, wait);

                info!(
                    worker_id,
                    request_id,
                    cost = estimated_cost,
                    effective_secs = effective_time.as_secs_f64(),
                    response_secs = response.as_secs_f64(),
                    "request completed"
                );
            }
        }
    }

    /// Dispatch until no assignment can be made.
    ///
    /// A slot is reserved on the chosen worker before the next selection,
    /// so several dispatches in one tick see each other.
    pub async fn dispatch(
        &mut self,
        scheduler: &mut Scheduler,
        senders: &[mpsc::Sender<WorkerMessage>],
    ) -> OrchestratorResult<usize> {
        let mut dispatched = 0;

        while let Some(assignment) = scheduler.next_assignment(&mut self.pending, &self.workers)? {
            let request = assignment.request;
            let worker = &mut self.workers[assignment.worker_index];
            let worker_id = worker.id;

            let Some(tx) = senders.get(assignment.worker_index) else {
                error!(worker_id, request_id = request.id, "no task channel for worker");
                worker.closed = true;
                self.lost += 1;
                continue;
            };

            worker.pending_starts += 1;
            if tx
                .send(WorkerMessage::Run(request.to_task(self.origin)))
                .await
                .is_err()
            {
                let worker = &mut self.workers[assignment.worker_index];
                worker.pending_starts = worker.pending_starts.saturating_sub(1);
                worker.closed = true;
                self.lost += 1;
                error!(
                    worker_id,
                    request_id = request.id,
                    "worker unit is gone, request lost"
                );
                continue;
            }

            if let Some(record) = self.record_mut(request.id) {
                record.assigned_worker = Some(worker_id);
            }
            self.dispatch_order.push((request.id, worker_id));
            dispatched += 1;

            info!(
                request_id = request.id,
                worker_id,
                category = %request.category,
                priority = %priority_label(request.priority),
                cost = request.estimated_cost,
                policy = %scheduler.policy(),
                "request assigned"
            );
        }

        Ok(dispatched)
    }

    fn record_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        let idx = *self.request_index.get(&id)?;
        self.requests.get_mut(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use clustersim_core::Policy;

    fn state(origin: Instant) -> RunState {
        RunState::new(
            origin,
            vec![WorkerState::new(1, 2), WorkerState::new(2, 1)],
            vec![
                Request::new(10, "a", 1, 2.0, 0.0),
                Request::new(11, "b", 2, 4.0, 1.5),
            ],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn admits_only_arrived_requests() {
        let origin = Instant::now();
        let mut s = state(origin);

        assert_eq!(s.admit_arrivals(origin), 1);
        assert!(!s.all_arrived());
        assert_eq!(s.admit_arrivals(origin + Duration::from_secs(1)), 0);
        assert_eq!(s.admit_arrivals(origin + Duration::from_secs(2)), 1);
        assert!(s.all_arrived());
        assert_eq!(s.pending.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn started_event_trusts_payload_and_releases_reservation() {
        let origin = Instant::now();
        let mut s = state(origin);
        s.workers[0].pending_starts = 1;

        s.apply(Event::Started {
            worker_id: 1,
            request_id: 10,
            start_ts: origin + Duration::from_millis(5),
            active: 1,
        });

        assert_eq!(s.workers[0].active, 1);
        assert_eq!(s.workers[0].pending_starts, 0);
        assert_eq!(s.started, 1);
        assert_eq!(s.requests[0].assigned_worker, Some(1));
        assert!(s.requests[0].start_ts.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn done_event_records_sample_and_work() {
        let origin = Instant::now();
        let mut s = state(origin);
        let start_ts = origin + Duration::from_secs(1);

        s.apply(Event::Started {
            worker_id: 1,
            request_id: 10,
            start_ts,
            active: 1,
        });
        s.apply(Event::Done {
            worker_id: 1,
            request_id: 10,
            estimated_cost: 2.0,
            effective_time: Duration::from_secs(1),
            start_ts,
            end_ts: start_ts + Duration::from_secs(1),
            active: 0,
        });

        assert_eq!(s.completed, 1);
        assert_eq!(s.workers[0].active, 0);
        assert_eq!(s.workers[0].effective_work, Duration::from_secs(1));
        let sample = s.metrics.samples()[0];
        assert_eq!(sample.response, Duration::from_secs(2));
        assert_eq!(sample.wait, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn done_without_observed_start_uses_event_start() {
        let origin = Instant::now();
        let mut s = state(origin);
        let start_ts = origin + Duration::from_secs(3);

        s.apply(Event::Done {
            worker_id: 2,
            request_id: 11,
            estimated_cost: 4.0,
            effective_time: Duration::from_secs(4),
            start_ts,
            end_ts: start_ts + Duration::from_secs(4),
            active: 0,
        });

        let sample = s.metrics.samples()[0];
        // arrival 1.5s, start 3s, end 7s
        assert_eq!(sample.wait, Duration::from_millis(1500));
        assert_eq!(sample.response, Duration::from_millis(5500));
        assert_eq!(s.requests[1].start_ts, Some(start_ts));
    }

    #[tokio::test(start_paused = true)]
    async fn accumulated_work_saturates() {
        let origin = Instant::now();
        let mut s = state(origin);
        s.workers[0].effective_work = Duration::MAX;

        s.apply(Event::Done {
            worker_id: 1,
            request_id: 10,
            estimated_cost: 2.0,
            effective_time: Duration::from_secs(1),
            start_ts: origin,
            end_ts: origin + Duration::from_secs(1),
            active: 0,
        });

        assert_eq!(s.workers[0].effective_work, Duration::MAX);
        assert_eq!(s.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_ids_are_ignored() {
        let origin = Instant::now();
        let mut s = state(origin);

        s.apply(Event::Started {
            worker_id: 99,
            request_id: 10,
            start_ts: origin,
            active: 1,
        });
        s.apply(Event::Started {
            worker_id: 1,
            request_id: 99,
            start_ts: origin,
            active: 1,
        });

        assert!(s.requests.iter().all(|r| r.start_ts.is_none()));
        assert_eq!(s.completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_closes_worker_and_counts_lost() {
        let origin = Instant::now();
        let mut s = RunState::new(
            origin,
            vec![WorkerState::new(1, 1)],
            vec![Request::new(1, "a", 2, 1.0, 0.0)],
        );
        s.admit_arrivals(origin);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut scheduler = Scheduler::new(Policy::Sjf);

        let dispatched = s.dispatch(&mut scheduler, &[tx]).await.unwrap();
        assert_eq!(dispatched, 0);
        assert_eq!(s.lost, 1);
        assert!(s.workers[0].closed);
        assert_eq!(s.workers[0].pending_starts, 0);
        assert!(s.is_finished());
        assert!(s.all_workers_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_reserves_slots_within_one_pass() {
        let origin = Instant::now();
        let mut s = RunState::new(
            origin,
            vec![WorkerState::new(1, 1)],
            vec![
                Request::new(1, "a", 2, 1.0, 0.0),
                Request::new(2, "b", 2, 1.0, 0.0),
            ],
        );
        s.admit_arrivals(origin);

        let (tx, mut rx) = mpsc::channel(4);
        let mut scheduler = Scheduler::new(Policy::Priority);

        assert_eq!(s.dispatch(&mut scheduler, &[tx]).await.unwrap(), 1);
        assert_eq!(s.workers[0].pending_starts, 1);
        assert_eq!(s.pending.len(), 1);
        assert_eq!(s.dispatch_order, vec![(1, 1)]);
        assert!(matches!(rx.recv().await, Some(WorkerMessage::Run(t)) if t.id == 1));
    }
}
