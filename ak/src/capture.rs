//! Result capture - turn failing calls into values
//!
//! A call can fail by returning `Err` or by panicking. Both are captured here
//! and surfaced as the caller's error type, so one misbehaving call never
//! unwinds through the code that is coordinating it. The other primitives in
//! this crate run every caller-supplied closure through these functions.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;
use tracing::debug;

use crate::error::Panicked;

/// Await `fut`, returning a panic in any poll as [`Panicked`]
///
/// Building block for [`capture`], and for callers whose error type cannot
/// implement `From<Panicked>` themselves.
pub async fn catch_panic<Fut>(fut: Fut) -> Result<Fut::Output, Panicked>
where
    Fut: Future,
{
    AssertUnwindSafe(fut).catch_unwind().await.map_err(|payload| {
        let panicked = Panicked::from_payload(payload);
        debug!(message = %panicked.message, "catch_panic: caught panic");
        panicked
    })
}

/// Await `fut`, converting a panic in any poll into `E`
pub async fn capture<Fut, T, E>(fut: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<Panicked>,
{
    match catch_panic(fut).await {
        Ok(outcome) => outcome,
        Err(panicked) => Err(E::from(panicked)),
    }
}

/// Run `f`, converting a panic into `E`
pub fn capture_sync<F, T, E>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<Panicked>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let panicked = Panicked::from_payload(payload);
            debug!(message = %panicked.message, "capture_sync: caught panic");
            Err(E::from(panicked))
        }
    }
}

/// Reusable wrapper returned by [`tryit`]
#[derive(Debug, Clone)]
pub struct TryIt<F> {
    func: F,
}

/// Wrap `func` so every call yields a `Result` instead of unwinding
///
/// ```ignore
/// let fetch = tryit(|id: u32| async move { load(id).await });
/// match fetch.call(7).await {
///     Ok(value) => ...,
///     Err(err) => ...,
/// }
/// ```
pub fn tryit<F>(func: F) -> TryIt<F> {
    TryIt { func }
}

impl<F> TryIt<F> {
    /// Invoke the wrapped function with `args`
    ///
    /// The function itself is called inside the captured future, so a panic
    /// raised before it returns its future is captured too.
    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Panicked>,
    {
        capture(async { (self.func)(args).await }).await
    }

    pub fn into_inner(self) -> F {
        self.func
    }
}

/// Await `fut`, swallowing any failure as `Ok(None)`
pub async fn guard<Fut, T, E>(fut: Fut) -> Result<Option<T>, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<Panicked>,
{
    guard_if(fut, |_| true).await
}

/// Await `fut`, swallowing a failure only when `should_guard` accepts it
///
/// Rejected failures are returned unchanged.
pub async fn guard_if<Fut, T, E, P>(fut: Fut, should_guard: P) -> Result<Option<T>, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<Panicked>,
    P: FnOnce(&E) -> bool,
{
    match capture(fut).await {
        Ok(value) => Ok(Some(value)),
        Err(err) if should_guard(&err) => {
            debug!("guard_if: error swallowed");
            Ok(None)
        }
        Err(err) => {
            debug!("guard_if: error rejected by predicate, returning it");
            Err(err)
        }
    }
}
