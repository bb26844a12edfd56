//! Simulated workloads driven by the `ak` binary
//!
//! Jobs only sleep and then succeed or fail according to a seeded plan, so a
//! given seed always produces the same report.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::all::all;
use crate::capture::capture;
use crate::error::Panicked;
use crate::parallel::parallel;
use crate::retry::{Attempt, RetryOptions, retry};
use crate::time::sleep;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("job {index} failed after {delay_ms}ms")]
    JobFailed { index: usize, delay_ms: u64 },

    #[error("attempt {attempt} failed")]
    AttemptFailed { attempt: u32 },

    #[error("attempt {attempt} bailed")]
    Bailed { attempt: u32 },

    #[error("job {index}: {source}")]
    InJob {
        index: usize,
        #[source]
        source: Box<SimError>,
    },

    #[error(transparent)]
    Panicked(#[from] Panicked),
}

impl SimError {
    /// Tag the error with the job it came from, unless it already names one
    pub fn in_job(self, index: usize) -> Self {
        if self.job_index().is_some() {
            return self;
        }
        SimError::InJob {
            index,
            source: Box::new(self),
        }
    }

    pub fn job_index(&self) -> Option<usize> {
        match self {
            SimError::JobFailed { index, .. } | SimError::InJob { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// A planned unit of simulated work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub index: usize,
    pub delay_ms: u64,
    pub fail: bool,
}

/// Draw `count` jobs with random durations and failures
pub fn plan_jobs<R: Rng>(rng: &mut R, count: usize, max_delay_ms: u64, fail_rate: f64) -> Vec<Job> {
    let fail_rate = if fail_rate.is_nan() { 0.0 } else { fail_rate.clamp(0.0, 1.0) };
    (0..count)
        .map(|index| Job {
            index,
            delay_ms: rng.random_range(0..=max_delay_ms),
            fail: rng.random_bool(fail_rate),
        })
        .collect()
}

/// Sleep for the job's duration, then succeed with the duration or fail
pub async fn run_job(job: Job) -> Result<u64, SimError> {
    sleep(Duration::from_millis(job.delay_ms)).await;
    if job.fail {
        Err(SimError::JobFailed {
            index: job.index,
            delay_ms: job.delay_ms,
        })
    } else {
        Ok(job.delay_ms)
    }
}

/// Outcome line for one job or attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub index: usize,
    pub value: Option<u64>,
    pub error: Option<String>,
}

impl ReportEntry {
    fn from_outcome(index: usize, outcome: &Result<u64, SimError>) -> Self {
        match outcome {
            Ok(value) => Self {
                index,
                value: Some(*value),
                error: None,
            },
            Err(err) => Self {
                index,
                value: None,
                error: Some(err.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub command: String,
    pub elapsed_ms: u128,
    pub succeeded: usize,
    pub failed: usize,
    /// Whether the primitive under test returned success
    pub ok: bool,
    /// Error returned by the primitive, if any
    pub error: Option<String>,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    /// `total` counts every job or attempt, including ones without an entry
    fn new(command: &str, start: Instant, total: usize, entries: Vec<ReportEntry>, ok: bool, error: Option<String>) -> Self {
        let failed = entries.iter().filter(|e| !e.is_ok()).count();
        Self {
            command: command.to_string(),
            elapsed_ms: start.elapsed().as_millis(),
            succeeded: total.saturating_sub(failed),
            failed,
            ok,
            error,
            entries,
        }
    }
}

/// Run `jobs` through [`parallel`] with `limit` in flight
pub async fn simulate_parallel(limit: usize, jobs: Vec<Job>) -> Report {
    debug!(limit, count = jobs.len(), "simulate_parallel: called");
    let start = Instant::now();
    let results = parallel(limit, jobs, run_job).await;
    let entries: Vec<ReportEntry> = results
        .iter()
        .map(|r| ReportEntry::from_outcome(r.index, &r.outcome))
        .collect();
    let ok = entries.iter().all(ReportEntry::is_ok);
    Report::new("parallel", start, entries.len(), entries, ok, None)
}

/// Join `jobs` with [`all`]
///
/// A failed join only lists the failing jobs, since that is all the
/// aggregate error carries. Each job's error is tagged with its index
/// before it reaches the join.
pub async fn simulate_all(jobs: Vec<Job>) -> Report {
    let total = jobs.len();
    debug!(count = total, "simulate_all: called");
    let start = Instant::now();

    let tagged = jobs.into_iter().map(|job| {
        let index = job.index;
        async move { capture(run_job(job)).await.map_err(|err: SimError| err.in_job(index)) }
    });

    match all(tagged).await {
        Ok(values) => {
            let entries = values
                .into_iter()
                .enumerate()
                .map(|(index, value)| ReportEntry::from_outcome(index, &Ok(value)))
                .collect();
            Report::new("all", start, total, entries, true, None)
        }
        Err(aggregate) => {
            let summary = aggregate.to_string();
            let entries = aggregate
                .into_errors()
                .into_iter()
                .filter_map(|err| {
                    let index = err.job_index()?;
                    Some(ReportEntry::from_outcome(index, &Err(err)))
                })
                .collect();
            Report::new("all", start, total, entries, false, Some(summary))
        }
    }
}

/// Retry an operation that fails its first `fail_first` attempts
pub async fn simulate_retry(options: &RetryOptions, fail_first: u32, bail_on: Option<u32>) -> Report {
    debug!(?options, fail_first, ?bail_on, "simulate_retry: called");
    let start = Instant::now();
    let mut entries = Vec::new();

    let result = retry(options, |bail| {
        let attempt = bail.attempt();
        let outcome = if bail_on == Some(attempt) {
            Err(SimError::Bailed { attempt })
        } else if attempt <= fail_first {
            Err(SimError::AttemptFailed { attempt })
        } else {
            Ok(u64::from(attempt))
        };
        entries.push(ReportEntry::from_outcome(attempt as usize, &outcome));

        async move {
            match outcome {
                Ok(value) => Ok(value),
                Err(err @ SimError::Bailed { .. }) => Err(bail.with(err)),
                Err(err) => Err(Attempt::Transient(err)),
            }
        }
    })
    .await;

    let ok = result.is_ok();
    let error = result.err().map(|err| err.to_string());
    Report::new("retry", start, entries.len(), entries, ok, error)
}
