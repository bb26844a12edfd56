//! Integration tests for asynckit
//!
//! These tests combine the primitives the way calling code does and check
//! end-to-end ordering, timing and failure behavior.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asynckit::{
    AggregateError, BackoffStrategy, DeferOptions, Panicked, RetryConfig, RetryOptions, all, all_keyed, defer, guard,
    guard_if, map, parallel, reduce, retry, sleep, try_parallel, tryit,
};
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum JobError {
    #[error("job failed: {0}")]
    Failed(String),

    #[error("task did not finish: {0}")]
    Join(String),

    #[error(transparent)]
    Panicked(#[from] Panicked),
}

fn failed(label: impl Into<String>) -> JobError {
    JobError::Failed(label.into())
}

fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(10),
        "elapsed {:?}, expected about {:?}",
        elapsed,
        expected
    );
}

// =============================================================================
// Parallel Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_parallel_mixed_outcomes_with_cap() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let results = parallel(3, 0..10u64, |n| {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(10 * (10 - n))).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            if n % 4 == 0 {
                Err(failed(format!("item {}", n)))
            } else {
                Ok(n * n)
            }
        }
    })
    .await;

    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(results.len(), 10);
    for (position, result) in results.iter().enumerate() {
        assert_eq!(result.index, position);
        let n = position as u64;
        if n % 4 == 0 {
            assert_eq!(result.error(), Some(&failed(format!("item {}", n))));
        } else {
            assert_eq!(result.result(), Some(&(n * n)));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_parallel_limit_above_count_runs_everything_at_once() {
    let start = Instant::now();
    let results = parallel(100, vec![50u64, 50, 50], |ms| async move {
        sleep(Duration::from_millis(ms)).await;
        Ok::<_, JobError>(ms)
    })
    .await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_elapsed(start, Duration::from_millis(50));
}

#[tokio::test]
async fn test_try_parallel_aggregates_in_input_order() {
    let err: AggregateError<JobError> = try_parallel(2, ["a", "bad-b", "c", "bad-d"], |s| async move {
        if s.starts_with("bad") {
            Err(failed(s))
        } else {
            Ok(s.len())
        }
    })
    .await
    .unwrap_err();

    assert_eq!(err.errors(), &[failed("bad-b"), failed("bad-d")]);
    assert_eq!(err.to_string(), "job failed: bad-b (and 1 more error)");
}

// =============================================================================
// All Tests
// =============================================================================

#[tokio::test]
async fn test_all_over_spawned_tasks() {
    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(u64::from(4 - i))).await;
                if i == 2 {
                    panic!("task {} crashed", i);
                }
                Ok::<u32, JobError>(i * 10)
            })
        })
        .collect();

    let joined = all(handles.into_iter().map(|handle| async move {
        match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(JobError::Join(join_err.to_string())),
        }
    }))
    .await;

    let err = joined.unwrap_err();
    assert_eq!(err.len(), 1);
    assert!(matches!(err.first(), JobError::Join(_)));
}

#[tokio::test(start_paused = true)]
async fn test_all_keyed_collects_into_map() {
    let mut ops = BTreeMap::new();
    for (key, ms) in [("fast", 5u64), ("slow", 40), ("mid", 20)] {
        ops.insert(key, async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, JobError>(ms)
        });
    }

    let start = Instant::now();
    let values: BTreeMap<&str, u64> = all_keyed(ops).await.unwrap();
    assert_eq!(values["fast"], 5);
    assert_eq!(values["slow"], 40);
    assert_elapsed(start, Duration::from_millis(40));
}

// =============================================================================
// Retry Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_with_configured_backoff() {
    let config: RetryConfig = serde_yaml::from_str(
        "times: 4\ndelay_ms: 5\nbackoff:\n  kind: exponential\n  initial_ms: 10\n  max_ms: 25\n",
    )
    .unwrap();
    assert_eq!(
        config.backoff,
        BackoffStrategy::Exponential {
            initial_ms: 10,
            max_ms: 25
        }
    );

    let options = config.to_options();
    let start = Instant::now();
    let mut calls = 0;

    let result: Result<(), JobError> = retry(&options, |_| {
        calls += 1;
        async { Err(failed("always").into()) }
    })
    .await;

    assert_eq!(result, Err(failed("always")));
    assert_eq!(calls, 4);
    // (5 + 10) + (5 + 20) + (5 + 25)
    assert_eq!(options.total_wait(), Duration::from_millis(70));
    assert_elapsed(start, Duration::from_millis(70));
}

// =============================================================================
// Defer Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_defer_around_retry() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let result: Result<u32, JobError> = defer(|deferrals| {
        let log = Arc::clone(&log);
        async move {
            let cleanup_log = Arc::clone(&log);
            deferrals.defer(move |err| {
                cleanup_log.lock().unwrap().push(format!("cleanup saw error: {}", err.is_some()));
                Ok(())
            });

            let mut calls = 0;
            let value: Result<u32, JobError> =
                retry(&RetryOptions::default().with_delay(Duration::from_millis(10)), |_| {
                    calls += 1;
                    let n = calls;
                    let log = Arc::clone(&log);
                    async move {
                        log.lock().unwrap().push(format!("attempt {}", n));
                        if n < 2 { Err(failed("transient").into()) } else { Ok(n * 100) }
                    }
                })
                .await;

            Ok(value?)
        }
    })
    .await;

    assert_eq!(result, Ok(200));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["attempt 1", "attempt 2", "cleanup saw error: false"]
    );
}

#[tokio::test]
async fn test_defer_rethrow_replaces_exhausted_retry_error() {
    let result: Result<(), JobError> = defer(|deferrals| async move {
        deferrals.defer_async(DeferOptions::rethrow(), |err| {
            let seen = err.map(ToString::to_string);
            async move { Err(failed(format!("rollback after {}", seen.unwrap_or_default()))) }
        });

        retry(&RetryOptions::default().with_times(2), |_| async { Err(failed("db").into()) }).await
    })
    .await;

    assert_eq!(result, Err(failed("rollback after job failed: db")));
}

// =============================================================================
// Capture Tests
// =============================================================================

#[tokio::test]
async fn test_tryit_and_guards_compose() {
    let parse = tryit(|s: &'static str| async move { s.parse::<u32>().map_err(|_| failed(s)) });

    assert_eq!(parse.call("12").await, Ok(12));
    assert_eq!(parse.call("x").await, Err(failed("x")));

    let fallback = guard(parse.call("nope")).await.unwrap().unwrap_or(0);
    assert_eq!(fallback, 0);

    let kept = guard_if(parse.call("y"), |err| matches!(err, JobError::Panicked(_))).await;
    assert_eq!(kept, Err(failed("y")));
}

// =============================================================================
// Sequence Tests
// =============================================================================

#[tokio::test]
async fn test_sequence_map_then_reduce() {
    let lengths = map(["alpha", "be", "gamma"], |s, _| async move { Ok::<_, JobError>(s.len()) })
        .await
        .unwrap();
    assert_eq!(lengths, vec![5, 2, 5]);

    let total = reduce(lengths, 0, |acc, n, _| async move { Ok::<_, JobError>(acc + n) }).await;
    assert_eq!(total, Ok(12));
}
