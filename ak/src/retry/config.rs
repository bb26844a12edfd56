//! Retry configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default attempt budget
pub fn default_times() -> u32 {
    3
}

/// Computes the extra wait after a failed attempt
///
/// Called with the 1-based index of the attempt that just failed.
#[derive(Clone)]
pub struct Backoff(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl Backoff {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Backoff(..)")
    }
}

/// Options for a single [`retry`](super::retry) call
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Attempt budget; zero is treated as one
    pub times: u32,

    /// Fixed wait between attempts
    pub delay: Option<Duration>,

    /// Additional computed wait between attempts, applied after `delay`
    pub backoff: Option<Backoff>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            times: default_times(),
            delay: None,
            backoff: None,
        }
    }
}

impl RetryOptions {
    pub fn with_times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn with_backoff_fn<F>(self, f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        self.with_backoff(Backoff::from_fn(f))
    }

    /// Total wait incurred if every attempt fails, saturating at `Duration::MAX`
    pub fn total_wait(&self) -> Duration {
        (1..self.times.max(1)).fold(Duration::ZERO, |total, attempt| {
            let backoff = self.backoff.as_ref().map(|b| b.delay(attempt)).unwrap_or_default();
            total.saturating_add(self.delay.unwrap_or_default().saturating_add(backoff))
        })
    }
}

/// Named backoff curves that can be loaded from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    #[default]
    None,

    /// Same extra wait after every failure
    Fixed { ms: u64 },

    /// `step_ms * attempt`
    Linear { step_ms: u64 },

    /// `initial_ms * 2^(attempt - 1)`, capped at `max_ms`
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl BackoffStrategy {
    /// Extra wait after `attempt` failed, `None` for [`BackoffStrategy::None`]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let attempt = u64::from(attempt.max(1));
        let ms = match *self {
            BackoffStrategy::None => return None,
            BackoffStrategy::Fixed { ms } => ms,
            BackoffStrategy::Linear { step_ms } => step_ms.saturating_mul(attempt),
            BackoffStrategy::Exponential { initial_ms, max_ms } => {
                let factor = 1u64.checked_shl((attempt - 1) as u32).unwrap_or(u64::MAX);
                initial_ms.saturating_mul(factor).min(max_ms)
            }
        };
        Some(Duration::from_millis(ms))
    }

    pub fn into_backoff(self) -> Option<Backoff> {
        if self == BackoffStrategy::None {
            return None;
        }
        Some(Backoff::from_fn(move |attempt| self.delay_for(attempt).unwrap_or_default()))
    }
}

/// Retry defaults as stored in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt budget
    #[serde(default = "default_times")]
    pub times: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default)]
    pub delay_ms: Option<u64>,

    /// Backoff curve applied after the fixed delay
    #[serde(default)]
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            times: default_times(),
            delay_ms: None,
            backoff: BackoffStrategy::None,
        }
    }
}

impl RetryConfig {
    pub fn to_options(&self) -> RetryOptions {
        RetryOptions {
            times: self.times,
            delay: self.delay_ms.map(Duration::from_millis),
            backoff: self.backoff.clone().into_backoff(),
        }
    }
}
