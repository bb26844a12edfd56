//! Sequential async map and reduce
//!
//! Each call starts only after the previous one has finished, and the first
//! failure ends the walk. Use [`parallel`](crate::parallel()) when items are
//! independent.

use std::future::Future;

use tracing::debug;

use crate::capture::capture;
use crate::error::Panicked;

/// Map `items` through `f` one at a time, stopping at the first error
pub async fn map<I, T, F, Fut, K, E>(items: I, mut f: F) -> Result<Vec<K>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T, usize) -> Fut,
    Fut: Future<Output = Result<K, E>>,
    E: From<Panicked>,
{
    let items = items.into_iter();
    let mut mapped = Vec::with_capacity(items.size_hint().0);
    for (index, item) in items.enumerate() {
        match capture(async { f(item, index).await }).await {
            Ok(value) => mapped.push(value),
            Err(err) => {
                debug!(index, "map: item failed, stopping");
                return Err(err);
            }
        }
    }
    Ok(mapped)
}

/// Fold `items` into `init` through `f` one at a time, stopping at the first error
pub async fn reduce<I, T, A, F, Fut, E>(items: I, init: A, mut f: F) -> Result<A, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(A, T, usize) -> Fut,
    Fut: Future<Output = Result<A, E>>,
    E: From<Panicked>,
{
    let mut acc = init;
    for (index, item) in items.into_iter().enumerate() {
        acc = match capture(async { f(acc, item, index).await }).await {
            Ok(next) => next,
            Err(err) => {
                debug!(index, "reduce: item failed, stopping");
                return Err(err);
            }
        };
    }
    Ok(acc)
}
