//! Bounded parallel map
//!
//! Runs a worker over every input with at most `limit` invocations in flight.
//! Inputs are tagged with their position and placed in a shared pending
//! queue; `limit` cooperative lanes repeatedly claim the next item until the
//! queue is empty. Claiming is a single lock-and-pop, so no item is ever
//! processed twice. Outcomes are returned in input order regardless of the
//! order in which they completed.
//!
//! Lanes are futures joined on the calling task rather than spawned tasks,
//! which keeps the inputs and the worker free of `Send`/`'static` bounds.

use std::collections::VecDeque;
use std::future::Future;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::capture::capture;
use crate::error::{AggregateError, Panicked};

/// One input waiting to be claimed by a lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<T> {
    pub index: usize,
    pub input: T,
}

/// Outcome of one [`WorkItem`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkResult<K, E> {
    pub index: usize,
    pub outcome: Result<K, E>,
}

impl<K, E> WorkResult<K, E> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&K> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&E> {
        self.outcome.as_ref().err()
    }

    pub fn into_outcome(self) -> Result<K, E> {
        self.outcome
    }
}

async fn claim<T>(pending: &Mutex<VecDeque<WorkItem<T>>>) -> Option<WorkItem<T>> {
    pending.lock().await.pop_front()
}

/// Run `worker` over `items` with at most `limit` calls in flight
///
/// Never fails as a whole: every item yields a [`WorkResult`], sorted by
/// input position. A `limit` of zero is treated as one.
pub async fn parallel<I, T, W, Fut, K, E>(limit: usize, items: I, worker: W) -> Vec<WorkResult<K, E>>
where
    I: IntoIterator<Item = T>,
    W: Fn(T) -> Fut,
    Fut: Future<Output = Result<K, E>>,
    E: From<Panicked>,
{
    let pending: VecDeque<WorkItem<T>> = items
        .into_iter()
        .enumerate()
        .map(|(index, input)| WorkItem { index, input })
        .collect();
    let total = pending.len();
    let lanes = limit.max(1).min(total);
    debug!(limit, total, lanes, "parallel: called");

    if total == 0 {
        return Vec::new();
    }

    let pending = Mutex::new(pending);
    let pending = &pending;
    let worker = &worker;

    let runs = (0..lanes).map(|lane| async move {
        let mut finished = Vec::new();
        while let Some(WorkItem { index, input }) = claim(pending).await {
            trace!(lane, index, "parallel: item claimed");
            let outcome = capture(async move { worker(input).await }).await;
            finished.push(WorkResult { index, outcome });
        }
        trace!(lane, processed = finished.len(), "parallel: lane drained");
        finished
    });

    let mut results: Vec<WorkResult<K, E>> = join_all(runs).await.into_iter().flatten().collect();
    results.sort_by_key(|r| r.index);

    debug!(
        total,
        failed = results.iter().filter(|r| !r.is_ok()).count(),
        "parallel: finished"
    );
    results
}

/// Like [`parallel`], but fails with every item error when any item failed
pub async fn try_parallel<I, T, W, Fut, K, E>(limit: usize, items: I, worker: W) -> Result<Vec<K>, AggregateError<E>>
where
    I: IntoIterator<Item = T>,
    W: Fn(T) -> Fut,
    Fut: Future<Output = Result<K, E>>,
    E: From<Panicked>,
{
    let results = parallel(limit, items, worker).await;
    AggregateError::from_results(results.into_iter().map(WorkResult::into_outcome))
}
