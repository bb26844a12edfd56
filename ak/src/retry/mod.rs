//! Retry executor
//!
//! Re-invokes a fallible operation under an attempt budget, optionally
//! sleeping a fixed delay and/or a computed backoff between attempts, with
//! an explicit bail path for failures that must not be retried.

mod config;
mod core;

pub use config::{Backoff, BackoffStrategy, RetryConfig, RetryOptions, default_times};
pub use core::{Attempt, Bail, retry};
