//! Request selection policies.
//!
//! Given the pending requests in arrival order, choose the index of the
//! request to dispatch next. All policies are deterministic for identical
//! input.

use std::cmp::Ordering;

use clustersim_core::{Policy, Request};

use crate::error::{SchedulerError, SchedulerResult};

/// Select the index of the next request to dispatch.
///
/// - `Rr`: `rr_cursor % pending.len()`
/// - `Sjf`: minimum `(estimated_cost, arrival, id)`
/// - `Priority`: minimum `(priority, arrival, id)`
///
/// Fails with [`SchedulerError::EmptyPending`] if `pending` is empty.
pub fn select_request(
    pending: &[Request],
    policy: Policy,
    rr_cursor: usize,
) -> SchedulerResult<usize> {
    if pending.is_empty() {
        return Err(SchedulerError::EmptyPending);
    }

    let idx = match policy {
        Policy::Rr => rr_cursor % pending.len(),
        Policy::Sjf => argmin(pending, |a, b| {
            a.estimated_cost
                .total_cmp(&b.estimated_cost)
                .then_with(|| tie_break(a, b))
        }),
        Policy::Priority => argmin(pending, |a, b| {
            a.priority.cmp(&b.priority).then_with(|| tie_break(a, b))
        }),
    };

    Ok(idx)
}

/// Advance the round-robin cursor after a removal, wrapping modulo the
/// remaining pending length.
///
/// The list shrinks after every pop, so this does not visit request
/// identities fairly; it mirrors a cursor over a moving window.
pub fn advance_cursor(rr_cursor: usize, remaining: usize) -> usize {
    (rr_cursor + 1) % remaining.max(1)
}

/// Earlier arrival first, then lower id.
fn tie_break(a: &Request, b: &Request) -> Ordering {
    a.arrival.total_cmp(&b.arrival).then(a.id.cmp(&b.id))
}

fn argmin<F>(pending: &[Request], cmp: F) -> usize
where
    F: Fn(&Request, &Request) -> Ordering,
{
    pending
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| cmp(a, b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
