//! asynckit - Async orchestration primitives
//!
//! Small building blocks for coordinating many asynchronous operations:
//! bounded-concurrency mapping, retry with backoff, scoped cleanup, and
//! error capture. Every primitive reports failure through the caller's own
//! error type, and panics inside user code are turned into that error type
//! through `From<Panicked>` rather than unwinding through the orchestration.
//!
//! # Modules
//!
//! - [`parallel`](mod@parallel) - Bounded-concurrency map with per-item outcomes
//! - [`retry`](mod@retry) - Retry loop with fixed delay, backoff and early bail
//! - [`defer`](mod@defer) - Scoped cleanup handlers run after a body settles
//! - [`capture`](mod@capture) - Error capture, `tryit` wrapping and guards
//! - [`all`](mod@all) - Joining independent operations
//! - [`sequence`] - Sequential map and reduce
//! - [`time`] - Awaitable sleep
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface for the `ak` binary
//! - [`sim`] - Simulated workloads used by `ak`

pub mod all;
pub mod capture;
pub mod cli;
pub mod config;
pub mod defer;
pub mod error;
pub mod parallel;
pub mod retry;
pub mod sequence;
pub mod sim;
pub mod time;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use all::{all, all_keyed};
pub use capture::{TryIt, capture, capture_sync, catch_panic, guard, guard_if, tryit};
pub use config::{Config, ConfigError, ParallelConfig};
pub use defer::{DeferOptions, Deferrals, defer};
pub use error::{AggregateError, Panicked};
pub use parallel::{WorkItem, WorkResult, parallel, try_parallel};
pub use retry::{Attempt, Backoff, BackoffStrategy, Bail, RetryConfig, RetryOptions, retry};
pub use sequence::{map, reduce};
pub use time::sleep;
