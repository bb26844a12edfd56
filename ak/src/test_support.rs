//! Shared fixtures for unit tests

use std::time::Duration;

use thiserror::Error;

use crate::error::Panicked;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    #[error("boom: {0}")]
    Boom(String),

    #[error(transparent)]
    Panicked(#[from] Panicked),
}

pub fn boom(label: impl Into<String>) -> TestError {
    TestError::Boom(label.into())
}

/// Paused-clock timers may land up to a tick late per sleep
pub fn assert_elapsed(start: tokio::time::Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(10),
        "elapsed {:?}, expected about {:?}",
        elapsed,
        expected
    );
}
