//! End-to-end runs on a paused clock.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use clustersim_core::{Policy, Request, Scenario, SimConfig, WorkerState};
use clustersim_orchestrator::{Orchestrator, OrchestratorConfig, RunOutcome};
use clustersim_scheduler::{SchedulerError, select_request};

async fn run(policy: Policy, scenario: Scenario) -> RunOutcome {
    Orchestrator::new(OrchestratorConfig::default().with_policy(policy))
        .run(scenario)
        .await
        .expect("run should succeed")
}

fn assert_timing_invariants(outcome: &RunOutcome) {
    for r in &outcome.requests {
        let arrival = r.arrival_at(outcome.origin);
        let start = r.start_ts.expect("every request starts");
        let end = r.end_ts.expect("every request completes");
        assert!(start >= arrival, "request {} started before arrival", r.id);
        assert!(end >= start, "request {} ended before start", r.id);
        assert!(r.assigned_worker.is_some());
    }
    for s in outcome.metrics.samples() {
        assert!(s.response >= s.wait);
    }
    for w in &outcome.workers {
        assert_eq!(w.active, 0);
        assert_eq!(w.pending_starts, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn sjf_runs_shortest_first_on_single_slot() {
    let scenario = Scenario {
        workers: vec![WorkerState::new(1, 1)],
        requests: vec![
            Request::new(1, "long", 2, 4.0, 0.0),
            Request::new(2, "short", 2, 2.0, 0.0),
        ],
    };

    let outcome = run(Policy::Sjf, scenario).await;

    let order: Vec<_> = outcome.dispatch_order.iter().map(|(r, _)| *r).collect();
    assert_eq!(order, vec![2, 1]);

    let makespan = outcome.makespan.as_secs_f64();
    assert!((6.0..6.3).contains(&makespan), "makespan was {makespan}");

    let report = outcome.report();
    assert_eq!(report.completed, 2);
    // short: response 2s, long: response 6s
    assert!((report.avg_response_secs - 4.0).abs() < 0.1);
    assert!((report.max_wait_secs - 2.0).abs() < 0.1);
    assert_timing_invariants(&outcome);
}

#[tokio::test(start_paused = true)]
async fn priority_with_best_fit_spreads_the_default_scenario() {
    let mut rng = StdRng::seed_from_u64(7);
    let scenario = SimConfig::default_scenario().build(&mut rng, 0.0).unwrap();

    let outcome = run(Policy::Priority, scenario).await;

    assert_eq!(outcome.dispatch_order, vec![(101, 1), (103, 2), (102, 3)]);
    assert_eq!(outcome.completed(), 3);
    assert!(!outcome.force_stopped);
    assert_timing_invariants(&outcome);

    // Slowest job: cost 3 on the 1-slot worker takes 3s.
    let makespan = outcome.makespan.as_secs_f64();
    assert!((3.0..3.1).contains(&makespan), "makespan was {makespan}");

    let report = outcome.report();
    assert_eq!(report.workers.len(), 3);
    assert!(report.workers.iter().all(|w| w.utilization > 0.0));
}

#[tokio::test(start_paused = true)]
async fn round_robin_alternates_workers() {
    let scenario = Scenario {
        workers: vec![WorkerState::new(1, 1), WorkerState::new(2, 1)],
        requests: (1..=4).map(|id| Request::new(id, "rr", 2, 1.0, 0.0)).collect(),
    };

    let outcome = run(Policy::Rr, scenario).await;

    assert_eq!(outcome.dispatch_order.len(), 4);
    assert_eq!(&outcome.dispatch_order[..2], &[(1, 1), (3, 2)]);

    let on = |wid| {
        outcome
            .dispatch_order
            .iter()
            .filter(|(_, w)| *w == wid)
            .count()
    };
    assert_eq!(on(1), 2);
    assert_eq!(on(2), 2);

    // Two rounds of 1s each.
    let makespan = outcome.makespan.as_secs_f64();
    assert!((2.0..2.2).contains(&makespan), "makespan was {makespan}");
    assert_timing_invariants(&outcome);
}

#[test]
fn selecting_from_empty_pending_is_an_error() {
    for policy in [Policy::Rr, Policy::Sjf, Policy::Priority] {
        assert_eq!(
            select_request(&[], policy, 0),
            Err(SchedulerError::EmptyPending)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn staggered_arrivals_never_overfill_workers() {
    let config = SimConfig::from_json(
        r#"{
            "servers": [{"id": 1, "capacity": 2}, {"id": 2, "capacity": 1}],
            "requests": [
                {"id": 1, "estimated_cost": 3.0},
                {"id": 2, "estimated_cost": 1.0, "priority": 1},
                {"id": 3, "estimated_cost": 2.0},
                {"id": 4, "estimated_cost": 0.5, "priority": 3},
                {"id": 5, "estimated_cost": 4.0},
                {"id": 6, "estimated_cost": 0.0}
            ]
        }"#,
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let scenario = config.build(&mut rng, 0.8).unwrap();

    for policy in [Policy::Rr, Policy::Sjf, Policy::Priority] {
        let outcome = run(policy, scenario.clone()).await;
        assert_eq!(outcome.completed(), 6, "policy {policy}");
        assert_eq!(outcome.started, 6);
        assert_eq!(outcome.lost, 0);
        assert_timing_invariants(&outcome);

        let report = outcome.report();
        for w in &report.workers {
            assert!((0.0..=1.0).contains(&w.utilization));
        }
        assert!(report.throughput_per_sec > 0.0);
    }
}
