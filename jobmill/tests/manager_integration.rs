//! Integration tests for the job manager.
//!
//! These tests verify the complete scheduling workflow including:
//! - Immediate, delayed, and periodic scheduling
//! - Duplicate-identity rejection across all schedule variants
//! - Filtered waiting (`wait_until_done`, `is_done`) and visiting
//! - Blocking conditions and blocked-state visibility
//! - Cooperative cancellation and interruption
//! - Shutdown semantics

use jobmill::{
    filter, BlockingCondition, JobError, JobFuture, JobInput, JobManager, JobManagerConfig,
    JobState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test Helpers
// =============================================================================

/// Polls until the future reaches the given state, or the timeout elapses.
async fn wait_for_state(future: &JobFuture, state: JobState, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if future.state() == state {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Schedules a job that stays blocked on the given condition until it falls
/// or the job is interrupted.
fn schedule_blocked(
    manager: &JobManager,
    id: &str,
    condition: &Arc<BlockingCondition>,
) -> JobFuture {
    let condition = Arc::clone(condition);
    manager
        .schedule(JobInput::new(id, id), move |ctx| async move {
            ctx.wait_for(&condition).await?;
            Ok(())
        })
        .expect("schedule should succeed")
}

// =============================================================================
// Scheduling and completion
// =============================================================================

#[tokio::test]
async fn test_schedule_runs_job_to_done() {
    let manager = JobManager::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let counter_clone = Arc::clone(&counter);
    let mut future = manager
        .schedule(JobInput::new("one", "One"), move |_ctx| async move {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    future
        .wait_with_timeout(Duration::from_secs(2))
        .await
        .expect("job should complete");

    assert_eq!(future.state(), JobState::Done);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(future.failure().is_none());
}

#[tokio::test]
async fn test_schedule_with_delay_defers_execution() {
    let manager = JobManager::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let counter_clone = Arc::clone(&counter);
    let future = manager
        .schedule_with_delay(
            JobInput::new("delayed", "Delayed"),
            Duration::from_millis(100),
            move |_ctx| async move {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(future.state(), JobState::Pending);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    assert!(wait_for_state(&future, JobState::Done, Duration::from_secs(2)).await);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_execution_failure_is_captured_on_future() {
    let manager = JobManager::new();

    let mut future = manager
        .schedule(JobInput::new("boom", "Boom"), |_ctx| async move {
            Err(JobError::failed("boom"))
        })
        .unwrap();

    future
        .wait_with_timeout(Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(future.state(), JobState::Failed);
    let failure = future.failure().expect("failure should be captured");
    assert!(failure.is_execution_failure());
    assert!(!failure.is_rejection());

    // The identity is free again, and other work is unaffected.
    let mut next = manager
        .schedule(JobInput::new("boom", "Boom"), |_ctx| async move { Ok(()) })
        .expect("identity should be free after failure");
    next.wait_with_timeout(Duration::from_secs(2)).await.unwrap();
    assert_eq!(next.state(), JobState::Done);
}

#[tokio::test]
async fn test_panic_is_captured_as_execution_failure() {
    let manager = JobManager::new();

    let mut future = manager
        .schedule(JobInput::new("panicky", "Panicky"), |_ctx| async move {
            if true {
                panic!("worker panicked");
            }
            Ok(())
        })
        .unwrap();

    future
        .wait_with_timeout(Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(future.state(), JobState::Failed);
    assert!(future.failure().unwrap().is_execution_failure());
}

#[tokio::test]
async fn test_worker_limit_bounds_concurrent_bodies() {
    let manager = JobManager::with_config(JobManagerConfig { worker_limit: 1 });
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    for i in 0..3 {
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        manager
            .schedule(
                JobInput::new(format!("worker-{i}"), "Worker"),
                move |_ctx| async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .unwrap();
    }

    assert!(
        manager
            .wait_until_done(filter::always(), Duration::from_secs(5))
            .await
    );
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Duplicate-identity rejection
// =============================================================================

#[tokio::test]
async fn test_duplicate_identity_rejected_on_all_schedule_variants() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let running = schedule_blocked(&manager, "job-1", &gate);

    let assert_rejected = |result: Result<JobFuture, JobError>| {
        let err = result.expect_err("duplicate identity must be rejected");
        assert!(err.is_rejection());
        assert!(!err.is_cancellation());
        assert!(!err.is_interruption());
        assert!(!err.is_timeout());
    };

    assert_rejected(
        manager.schedule(JobInput::new("job-1", "Job"), |_ctx| async move { Ok(()) }),
    );
    assert_rejected(manager.schedule_with_delay(
        JobInput::new("job-1", "Job"),
        Duration::from_secs(1),
        |_ctx| async move { Ok(()) },
    ));
    assert_rejected(manager.schedule_at_fixed_rate(
        JobInput::new("job-1", "Job"),
        Duration::ZERO,
        Duration::from_secs(1),
        |_ctx| async move { Ok(()) },
    ));
    assert_rejected(manager.schedule_with_fixed_delay(
        JobInput::new("job-1", "Job"),
        Duration::ZERO,
        Duration::from_secs(1),
        |_ctx| async move { Ok(()) },
    ));

    // Release and finish; the identity becomes available again.
    gate.set_blocking(false);
    assert!(wait_for_state(&running, JobState::Done, Duration::from_secs(2)).await);
    manager
        .schedule(JobInput::new("job-1", "Job"), |_ctx| async move { Ok(()) })
        .expect("identity should be free after completion");
}

#[tokio::test]
async fn test_zero_period_is_rejected() {
    let manager = JobManager::new();
    let err = manager
        .schedule_at_fixed_rate(
            JobInput::new("ticker", "Ticker"),
            Duration::ZERO,
            Duration::ZERO,
            |_ctx| async move { Ok(()) },
        )
        .expect_err("zero period must be rejected");

    assert!(err.is_rejection());
    assert_eq!(manager.active_count(), 0);
}

// =============================================================================
// Filtered waiting and visiting
// =============================================================================

#[tokio::test]
async fn test_wait_until_done_always_filter() {
    let manager = JobManager::new();

    for i in 0..3 {
        manager
            .schedule(
                JobInput::new(format!("job-{i}"), "Job"),
                move |_ctx| async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(())
                },
            )
            .unwrap();
    }

    assert!(
        manager
            .wait_until_done(filter::always(), Duration::from_secs(5))
            .await
    );

    // Boundary: zero timeout with an already-done set succeeds immediately.
    assert!(manager.wait_until_done(filter::always(), Duration::ZERO).await);
}

#[tokio::test]
async fn test_wait_until_done_times_out() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let future = schedule_blocked(&manager, "slow", &gate);

    assert!(
        !manager
            .wait_until_done(filter::always(), Duration::from_millis(50))
            .await
    );

    future.cancel(true);
    assert!(wait_for_state(&future, JobState::Cancelled, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_wait_on_future_filter_is_independent_of_other_jobs() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let slow = schedule_blocked(&manager, "slow", &gate);

    let fast = manager
        .schedule(JobInput::new("fast", "Fast"), |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        })
        .unwrap();

    // The wait on `fast` succeeds while `slow` is still blocked.
    assert!(
        manager
            .wait_until_done(filter::future(&fast), Duration::from_secs(5))
            .await
    );
    assert!(!manager.is_done(filter::always()));
    assert!(manager.is_done(filter::future(&fast)));

    gate.set_blocking(false);
    assert!(wait_for_state(&slow, JobState::Done, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_visit_supports_early_termination() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));

    let futures: Vec<_> = (0..3)
        .map(|i| schedule_blocked(&manager, &format!("job-{i}"), &gate))
        .collect();
    for future in &futures {
        assert!(wait_for_state(future, JobState::Blocked, Duration::from_secs(2)).await);
    }

    let mut visited = Vec::new();
    manager.visit(filter::always(), |future| {
        visited.push(future.id().clone());
        false
    });
    assert_eq!(visited.len(), 1);

    let mut all = Vec::new();
    manager.visit(filter::blocked(), |future| {
        all.push(future.id().clone());
        true
    });
    assert_eq!(all.len(), 3);

    gate.set_blocking(false);
    assert!(
        manager
            .wait_until_done(filter::always(), Duration::from_secs(5))
            .await
    );
}

// =============================================================================
// Blocking conditions and cancellation
// =============================================================================

#[tokio::test]
async fn test_blocked_state_is_visible_and_filterable() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let future = schedule_blocked(&manager, "blocked", &gate);

    assert!(wait_for_state(&future, JobState::Blocked, Duration::from_secs(2)).await);
    assert!(future.is_blocked());
    assert_eq!(manager.futures(filter::blocked()).len(), 1);

    gate.set_blocking(false);
    assert!(wait_for_state(&future, JobState::Done, Duration::from_secs(2)).await);
    assert!(manager.futures(filter::blocked()).is_empty());
}

#[tokio::test]
async fn test_blocked_job_yields_its_worker_permit() {
    let manager = JobManager::with_config(JobManagerConfig { worker_limit: 1 });
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let blocked = schedule_blocked(&manager, "waiter", &gate);
    assert!(wait_for_state(&blocked, JobState::Blocked, Duration::from_secs(2)).await);

    // With a single permit, the releaser can only run because the blocked
    // job handed its permit back for the duration of the wait.
    let gate_clone = Arc::clone(&gate);
    manager
        .schedule(JobInput::new("releaser", "Releaser"), move |_ctx| {
            async move {
                gate_clone.set_blocking(false);
                Ok(())
            }
        })
        .unwrap();

    assert!(
        manager
            .wait_until_done(filter::always(), Duration::from_secs(2))
            .await
    );
    assert_eq!(blocked.state(), JobState::Done);
    assert!(blocked.failure().is_none());
}

#[tokio::test]
async fn test_interrupting_cancel_wakes_blocked_job() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let future = schedule_blocked(&manager, "blocked", &gate);

    assert!(wait_for_state(&future, JobState::Blocked, Duration::from_secs(2)).await);
    assert!(future.cancel(true));

    assert!(wait_for_state(&future, JobState::Cancelled, Duration::from_secs(2)).await);
    let failure = future.failure().expect("interruption should be captured");
    assert!(failure.is_interruption());
    // The condition itself stays armed.
    assert!(gate.is_blocking());
}

#[tokio::test]
async fn test_blocking_wait_timeout_is_distinct_from_interruption() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));

    let gate_clone = Arc::clone(&gate);
    let mut future = manager
        .schedule(JobInput::new("timed", "Timed"), move |ctx| async move {
            ctx.wait_for_with_timeout(&gate_clone, Duration::from_millis(30))
                .await?;
            Ok(())
        })
        .unwrap();

    future
        .wait_with_timeout(Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(future.state(), JobState::Failed);
    let failure = future.failure().unwrap();
    assert!(failure.is_timeout());
    assert!(!failure.is_interruption());
}

#[tokio::test]
async fn test_cancel_completed_future_is_noop() {
    let manager = JobManager::new();
    let mut future = manager
        .schedule(JobInput::new("quick", "Quick"), |_ctx| async move { Ok(()) })
        .unwrap();

    future
        .wait_with_timeout(Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(future.state(), JobState::Done);

    assert!(!future.cancel(true));
    assert!(!future.cancel(false));
    assert_eq!(future.state(), JobState::Done);
    assert!(future.failure().is_none());
}

#[tokio::test]
async fn test_cancel_by_filter_reports_acceptance() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let a = schedule_blocked(&manager, "a", &gate);
    let b = schedule_blocked(&manager, "b", &gate);
    assert!(wait_for_state(&a, JobState::Blocked, Duration::from_secs(2)).await);
    assert!(wait_for_state(&b, JobState::Blocked, Duration::from_secs(2)).await);

    assert!(manager.cancel(filter::blocked(), true));
    assert!(wait_for_state(&a, JobState::Cancelled, Duration::from_secs(2)).await);
    assert!(wait_for_state(&b, JobState::Cancelled, Duration::from_secs(2)).await);

    // Nothing matches anymore: vacuously true.
    assert!(manager.cancel(filter::blocked(), true));
}

// =============================================================================
// Periodic scheduling
// =============================================================================

#[tokio::test]
async fn test_fixed_rate_job_ticks_repeatedly() {
    let manager = JobManager::new();
    let ticks = Arc::new(AtomicUsize::new(0));

    let ticks_clone = Arc::clone(&ticks);
    let future = manager
        .schedule_at_fixed_rate(
            JobInput::new("heartbeat", "Heartbeat"),
            Duration::ZERO,
            Duration::from_millis(50),
            move |_ctx| {
                let ticks = Arc::clone(&ticks_clone);
                async move {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(ticks.load(Ordering::SeqCst) >= 3);
    assert!(!future.is_done());

    assert!(future.cancel(true));
    assert!(wait_for_state(&future, JobState::Cancelled, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_fixed_rate_timing_is_not_starved_by_slow_jobs() {
    let manager = JobManager::new();
    let ticks = Arc::new(AtomicUsize::new(0));

    // A long-running job occupying a worker.
    manager
        .schedule(JobInput::new("slow", "Slow"), |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            Ok(())
        })
        .unwrap();

    let ticks_clone = Arc::clone(&ticks);
    let heartbeat = manager
        .schedule_at_fixed_rate(
            JobInput::new("heartbeat", "Heartbeat"),
            Duration::ZERO,
            Duration::from_millis(50),
            move |_ctx| {
                let ticks = Arc::clone(&ticks_clone);
                async move {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(ticks.load(Ordering::SeqCst) >= 3);

    heartbeat.cancel(true);
    assert!(
        manager
            .wait_until_done(filter::always(), Duration::from_secs(5))
            .await
    );
}

#[tokio::test]
async fn test_fixed_delay_executions_never_overlap() {
    let manager = JobManager::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));

    let in_flight_clone = Arc::clone(&in_flight);
    let max_clone = Arc::clone(&max_in_flight);
    let runs_clone = Arc::clone(&runs);
    let future = manager
        .schedule_with_fixed_delay(
            JobInput::new("serial", "Serial"),
            Duration::ZERO,
            Duration::from_millis(30),
            move |_ctx| {
                let in_flight = Arc::clone(&in_flight_clone);
                let max_in_flight = Arc::clone(&max_clone);
                let runs = Arc::clone(&runs_clone);
                async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    future.cancel(true);
    assert!(wait_for_state(&future, JobState::Cancelled, Duration::from_secs(2)).await);

    assert!(runs.load(Ordering::SeqCst) >= 2);
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_periodic_execution_failure_terminates_the_job() {
    let manager = JobManager::new();
    let runs = Arc::new(AtomicUsize::new(0));

    let runs_clone = Arc::clone(&runs);
    let future = manager
        .schedule_at_fixed_rate(
            JobInput::new("flaky", "Flaky"),
            Duration::ZERO,
            Duration::from_millis(20),
            move |_ctx| {
                let runs = Arc::clone(&runs_clone);
                async move {
                    if runs.fetch_add(1, Ordering::SeqCst) == 2 {
                        return Err(JobError::failed("third run failed"));
                    }
                    Ok(())
                }
            },
        )
        .unwrap();

    assert!(wait_for_state(&future, JobState::Failed, Duration::from_secs(5)).await);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert!(future.failure().unwrap().is_execution_failure());
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_rejects_new_work_and_cancels_outstanding() {
    let manager = JobManager::new();
    let gate = Arc::new(BlockingCondition::new("gate", true));
    let blocked = schedule_blocked(&manager, "blocked", &gate);
    assert!(wait_for_state(&blocked, JobState::Blocked, Duration::from_secs(2)).await);

    manager.shutdown();

    let err = manager
        .schedule(JobInput::new("late", "Late"), |_ctx| async move { Ok(()) })
        .expect_err("scheduling after shutdown must be rejected");
    assert!(err.is_rejection());

    assert!(wait_for_state(&blocked, JobState::Cancelled, Duration::from_secs(2)).await);
    assert!(
        manager
            .wait_until_done(filter::always(), Duration::from_secs(2))
            .await
    );
}
