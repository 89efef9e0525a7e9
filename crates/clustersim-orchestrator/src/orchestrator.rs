//! The orchestrator run loop.

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use clustersim_core::{
    ConfigError, Policy, Request, RequestId, Scenario, WorkerId, WorkerMessage, WorkerState,
};
use clustersim_metrics::{MetricsCollector, MetricsReport};
use clustersim_scheduler::Scheduler;
use clustersim_worker::WorkerUnit;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorResult;
use crate::state::RunState;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub policy: Policy,
    /// Time zero of the run's clock.
    pub origin: Instant,
    /// Final worker view, sorted by id.
    pub workers: Vec<WorkerState>,
    /// Request records with their timestamps, sorted by `(arrival, id)`.
    pub requests: Vec<Request>,
    pub metrics: MetricsCollector,
    /// From loop start to the tick where the last completion was seen.
    pub makespan: Duration,
    /// `(request, worker)` in dispatch order.
    pub dispatch_order: Vec<(RequestId, WorkerId)>,
    pub started: usize,
    pub lost: usize,
    /// At least one unit missed the shutdown deadline and was aborted.
    pub force_stopped: bool,
    pub overload_redirect_threshold: f64,
}

impl RunOutcome {
    pub fn total_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn completed(&self) -> usize {
        self.metrics.completed()
    }

    pub fn report(&self) -> MetricsReport {
        self.metrics
            .report(&self.workers, self.total_requests(), self.makespan)
    }
}

struct UnitHandle {
    worker_id: WorkerId,
    tasks: mpsc::Sender<WorkerMessage>,
    handle: JoinHandle<()>,
}

/// Drives one simulated run from arrival to shutdown.
pub struct Orchestrator {
    config: OrchestratorConfig,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = %self.phase, to = %phase, "orchestrator phase change");
        self.phase = phase;
    }

    /// Run the scenario to completion.
    ///
    /// Spawns one worker unit per server, ticks until every request has
    /// arrived and finished, then stops all units. Only an empty server or
    /// request list is an error; it is reported before anything is spawned.
    pub async fn run(&mut self, scenario: Scenario) -> OrchestratorResult<RunOutcome> {
        let Scenario {
            mut workers,
            mut requests,
        } = scenario;
        if workers.is_empty() {
            return Err(ConfigError::NoServers.into());
        }
        if requests.is_empty() {
            return Err(ConfigError::NoRequests.into());
        }
        workers.sort_by_key(|w| w.id);
        requests.sort_by(|a, b| a.arrival.total_cmp(&b.arrival).then(a.id.cmp(&b.id)));

        let policy = self.config.policy;
        info!(
            policy = %policy,
            servers = workers.len(),
            requests = requests.len(),
            overload_redirect_threshold = self.config.overload_redirect_threshold,
            "starting simulation"
        );

        let (event_tx, mut events) = mpsc::channel(self.config.event_buffer.max(1));
        let (stop_tx, stop_rx) = watch::channel(false);

        let units: Vec<UnitHandle> = workers
            .iter()
            .map(|w| {
                let (tx, rx) = mpsc::channel(self.config.task_buffer.max(1));
                let unit = WorkerUnit::new(w.id, w.capacity, rx, event_tx.clone(), stop_rx.clone());
                debug!(worker_id = unit.id(), capacity = unit.capacity(), "spawning worker unit");
                UnitHandle {
                    worker_id: unit.id(),
                    tasks: tx,
                    handle: unit.spawn(),
                }
            })
            .collect();
        // Only the units hold event senders now, so `recv` yields `None`
        // once every unit has exited.
        drop(event_tx);
        drop(stop_rx);

        let senders: Vec<_> = units.iter().map(|u| u.tasks.clone()).collect();
        let mut scheduler = Scheduler::new(policy);
        let mut ticker = tokio::time::interval(self.config.tick.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let origin = Instant::now();
        let mut state = RunState::new(origin, workers, requests);
        self.enter(Phase::Running);

        let makespan = loop {
            state.admit_arrivals(Instant::now());

            while let Ok(event) = events.try_recv() {
                state.apply(event);
            }

            if state.is_finished() {
                break origin.elapsed();
            }
            if state.all_workers_closed() {
                error!(
                    completed = state.completed,
                    lost = state.lost,
                    "every worker unit is gone, abandoning run"
                );
                break origin.elapsed();
            }

            state.dispatch(&mut scheduler, &senders).await?;

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => state.apply(event),
                    None => {
                        warn!("event channel closed before all requests finished");
                        for w in &mut state.workers {
                            w.closed = true;
                        }
                    }
                },
                _ = ticker.tick() => {}
            }
        };

        info!(
            completed = state.completed,
            total = state.total(),
            makespan_secs = makespan.as_secs_f64(),
            "all requests finished"
        );

        self.enter(Phase::Draining);
        drop(senders);
        let force_stopped = self.stop_units(&stop_tx, units).await;
        self.enter(Phase::Stopped);

        Ok(RunOutcome {
            policy,
            origin,
            workers: state.workers,
            requests: state.requests,
            metrics: state.metrics,
            makespan,
            dispatch_order: state.dispatch_order,
            started: state.started,
            lost: state.lost,
            force_stopped,
            overload_redirect_threshold: self.config.overload_redirect_threshold,
        })
    }

    /// Signal every unit to stop and wait for them up to the shutdown
    /// timeout. Returns `true` if any unit had to be aborted.
    async fn stop_units(&self, stop: &watch::Sender<bool>, units: Vec<UnitHandle>) -> bool {
        let _ = stop.send(true);
        for unit in &units {
            // A full or closed channel is fine, the watch signal covers it.
            let _ = unit.tasks.try_send(WorkerMessage::Shutdown);
        }

        let deadline = Instant::now() + self.config.shutdown_timeout;
        let mut force_stopped = false;

        for mut unit in units {
            match tokio::time::timeout_at(deadline, &mut unit.handle).await {
                Ok(Ok(())) => debug!(worker_id = unit.worker_id, "worker unit joined"),
                Ok(Err(e)) => {
                    error!(worker_id = unit.worker_id, error = %e, "worker unit panicked");
                }
                Err(_) => {
                    warn!(
                        worker_id = unit.worker_id,
                        "worker unit missed shutdown deadline, aborting"
                    );
                    unit.handle.abort();
                    force_stopped = true;
                }
            }
        }

        force_stopped
    }
}
