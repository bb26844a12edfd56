//! Retry loop

use std::future::Future;

use tracing::debug;

use crate::capture::catch_panic;
use crate::error::Panicked;
use crate::time::sleep;

use super::config::RetryOptions;

/// Failure of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<E> {
    /// Ordinary failure; retried while attempts remain
    Transient(E),

    /// Terminal failure; returned immediately
    Bail(E),
}

impl<E> Attempt<E> {
    pub fn into_inner(self) -> E {
        match self {
            Attempt::Transient(err) | Attempt::Bail(err) => err,
        }
    }

    pub fn is_bail(&self) -> bool {
        matches!(self, Attempt::Bail(_))
    }
}

impl<E> From<E> for Attempt<E> {
    fn from(err: E) -> Self {
        Attempt::Transient(err)
    }
}

/// Handed to each attempt for early exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bail {
    attempt: u32,
}

impl Bail {
    /// Mark `err` as final; no further attempts are made
    pub fn with<E>(self, err: E) -> Attempt<E> {
        Attempt::Bail(err)
    }

    /// 1-based index of the current attempt
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Run `func` until it succeeds, bails, or the attempt budget is spent
///
/// Between attempts the fixed `delay` is slept first, then `backoff(i)`
/// where `i` is the attempt that just failed. No wait happens before the
/// first attempt or after the last one. On exhaustion the last attempt's
/// error is returned as is. A panicking attempt counts as an ordinary
/// failure.
///
/// ```ignore
/// let body = retry(&RetryOptions::default().with_times(5), |bail| async move {
///     match fetch().await {
///         Err(e) if e.is_fatal() => Err(bail.with(e)),
///         other => Ok(other?),
///     }
/// })
/// .await?;
/// ```
pub async fn retry<F, Fut, T, E>(options: &RetryOptions, mut func: F) -> Result<T, E>
where
    F: FnMut(Bail) -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    E: From<Panicked>,
{
    let times = options.times.max(1);
    debug!(
        times,
        delay = ?options.delay,
        has_backoff = options.backoff.is_some(),
        "retry: called"
    );

    let mut attempt = 1;
    loop {
        let bail = Bail { attempt };
        // Attempt<E> cannot also implement From<Panicked>, so the panic is mapped by hand
        let outcome = match catch_panic(async { func(bail).await }).await {
            Ok(outcome) => outcome,
            Err(panicked) => Err(Attempt::Transient(E::from(panicked))),
        };

        match outcome {
            Ok(value) => {
                debug!(attempt, "retry: attempt succeeded");
                return Ok(value);
            }
            Err(Attempt::Bail(err)) => {
                debug!(attempt, "retry: bailed");
                return Err(err);
            }
            Err(Attempt::Transient(err)) if attempt >= times => {
                debug!(attempt, "retry: attempts exhausted");
                return Err(err);
            }
            Err(Attempt::Transient(_)) => {
                debug!(attempt, remaining = times - attempt, "retry: attempt failed, retrying");
                if let Some(delay) = options.delay {
                    sleep(delay).await;
                }
                if let Some(backoff) = &options.backoff {
                    sleep(backoff.delay(attempt)).await;
                }
                attempt += 1;
            }
        }
    }
}
