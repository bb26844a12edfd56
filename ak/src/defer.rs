//! Deferred cleanup scope
//!
//! [`defer`] runs a body that may register cleanup handlers through a
//! [`Deferrals`] handle. Once the body finishes, successfully, with an error
//! or with a panic, the registered handlers are drained exactly once in
//! registration order, each seeing the body's error if there was one.
//!
//! Handler failures are discarded unless the handler was registered with
//! [`DeferOptions::rethrow`]. The first such failure stops the drain and
//! becomes the scope's result, replacing the body's own error.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::capture::{capture, capture_sync};
use crate::error::Panicked;

type SyncHandler<E> = Box<dyn FnOnce(Option<&E>) -> Result<(), E> + Send>;
type AsyncHandler<E> = Box<dyn FnOnce(Option<&E>) -> BoxFuture<'static, Result<(), E>> + Send>;

/// Per-handler registration options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferOptions {
    /// A failure of this handler stops the drain and becomes the scope's error
    pub rethrow: bool,
}

impl DeferOptions {
    pub fn rethrow() -> Self {
        Self { rethrow: true }
    }
}

enum HandlerFn<E> {
    Sync(SyncHandler<E>),
    Async(AsyncHandler<E>),
}

struct Handler<E> {
    func: HandlerFn<E>,
    options: DeferOptions,
}

/// Registration handle passed to the body of [`defer`]
///
/// Cheap to clone. The handler list closes when the body finishes; anything
/// registered after that is dropped without running.
pub struct Deferrals<E> {
    handlers: Arc<Mutex<Option<Vec<Handler<E>>>>>,
}

impl<E> Clone for Deferrals<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<E> std::fmt::Debug for Deferrals<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.lock();
        f.debug_struct("Deferrals")
            .field("registered", &guard.as_ref().map(Vec::len))
            .finish()
    }
}

impl<E: Send + 'static> Deferrals<E> {
    fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Some(Vec::new()))),
        }
    }

    /// Register a cleanup handler with default options
    pub fn defer<F>(&self, f: F)
    where
        F: FnOnce(Option<&E>) -> Result<(), E> + Send + 'static,
    {
        self.defer_with(DeferOptions::default(), f);
    }

    /// Register a synchronous cleanup handler
    pub fn defer_with<F>(&self, options: DeferOptions, f: F)
    where
        F: FnOnce(Option<&E>) -> Result<(), E> + Send + 'static,
    {
        self.push(Handler {
            func: HandlerFn::Sync(Box::new(f)),
            options,
        });
    }

    /// Register an asynchronous cleanup handler
    ///
    /// The handler sees the body error synchronously and returns the future
    /// that performs the cleanup.
    pub fn defer_async<F, Fut>(&self, options: DeferOptions, f: F)
    where
        F: FnOnce(Option<&E>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.push(Handler {
            func: HandlerFn::Async(Box::new(move |err: Option<&E>| f(err).boxed())),
            options,
        });
    }

    /// Number of handlers registered so far, or `None` once closed
    pub fn registered(&self) -> Option<usize> {
        self.lock().as_ref().map(Vec::len)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn push(&self, handler: Handler<E>) {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(list) => {
                let rethrow = handler.options.rethrow;
                list.push(handler);
                debug!(count = list.len(), rethrow, "Deferrals::push: registered");
            }
            None => warn!("Deferrals::push: scope already closed, handler dropped"),
        }
    }

    fn close(&self) -> Vec<Handler<E>> {
        self.lock().take().unwrap_or_default()
    }
}

impl<E> Deferrals<E> {
    fn lock(&self) -> MutexGuard<'_, Option<Vec<Handler<E>>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run `body`, then drain every handler it registered
///
/// Returns the body's value, the body's error, or the error of the first
/// failing `rethrow` handler, in increasing order of precedence.
pub async fn defer<F, Fut, T, E>(body: F) -> Result<T, E>
where
    F: FnOnce(Deferrals<E>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<Panicked> + Send + 'static,
{
    debug!("defer: called");
    let deferrals = Deferrals::new();
    let handle = deferrals.clone();
    let outcome = capture(async move { body(handle).await }).await;

    let handlers = deferrals.close();
    debug!(
        count = handlers.len(),
        body_failed = outcome.is_err(),
        "defer: body finished, draining handlers"
    );

    let body_error = outcome.as_ref().err();
    for (position, handler) in handlers.into_iter().enumerate() {
        let result = match handler.func {
            HandlerFn::Sync(f) => capture_sync(|| f(body_error)),
            HandlerFn::Async(f) => capture(async { f(body_error).await }).await,
        };

        if let Err(err) = result {
            if handler.options.rethrow {
                debug!(position, "defer: rethrow handler failed, stopping drain");
                return Err(err);
            }
            warn!(position, "defer: cleanup handler failed, error discarded");
        }
    }

    outcome
}
