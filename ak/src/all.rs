//! Joining independent operations
//!
//! [`all`] and [`all_keyed`] await a set of futures together. There is no
//! concurrency ceiling: every future is polled from the start and each one
//! runs to completion even when a sibling has already failed. Failures are
//! only combined at the join, into an [`AggregateError`] ordered by input
//! position (or key iteration order), never by completion order.

use std::future::Future;

use futures::future::join_all;
use tracing::debug;

use crate::capture::capture;
use crate::error::{AggregateError, Panicked};

/// Await every future; return all values in input order or every error
pub async fn all<I, Fut, T, E>(futures: I) -> Result<Vec<T>, AggregateError<E>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
    E: From<Panicked>,
{
    let outcomes = join_all(futures.into_iter().map(|fut| capture(fut))).await;
    debug!(
        total = outcomes.len(),
        failed = outcomes.iter().filter(|o| o.is_err()).count(),
        "all: joined"
    );
    AggregateError::from_results(outcomes)
}

/// Keyed form of [`all`]
///
/// The output collection is built from `(key, value)` pairs, so a
/// `BTreeMap` or `HashMap` of futures can come back as the same kind of map.
/// Errors follow the iteration order of `entries`.
pub async fn all_keyed<I, K, Fut, T, E, C>(entries: I) -> Result<C, AggregateError<E>>
where
    I: IntoIterator<Item = (K, Fut)>,
    Fut: Future<Output = Result<T, E>>,
    E: From<Panicked>,
    C: FromIterator<(K, T)>,
{
    let (keys, futures): (Vec<K>, Vec<Fut>) = entries.into_iter().unzip();
    let outcomes = join_all(futures.into_iter().map(|fut| capture(fut))).await;

    let mut values = Vec::with_capacity(keys.len());
    let mut errors = Vec::new();
    for (key, outcome) in keys.into_iter().zip(outcomes) {
        match outcome {
            Ok(value) => values.push((key, value)),
            Err(err) => errors.push(err),
        }
    }
    debug!(succeeded = values.len(), failed = errors.len(), "all_keyed: joined");

    match AggregateError::new(errors) {
        Some(aggregate) => Err(aggregate),
        None => Ok(values.into_iter().collect()),
    }
}
