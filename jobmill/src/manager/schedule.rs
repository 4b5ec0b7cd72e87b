//! Scheduling operations and per-job runner tasks.
//!
//! Every schedule call registers a future (rejecting duplicates
//! synchronously) and spawns one dispatcher task for the job. The
//! dispatcher owns all timing - initial delay, fixed-rate ticks, fixed-delay
//! gaps - and spawns each body execution as a separate worker task, awaiting
//! it via its join handle. A body never runs on the dispatcher itself, so
//! long executions cannot skew the timing of other jobs.

use super::core::JobManager;
use super::registry::FutureRegistry;
use crate::context::{JobContext, PermitSlot};
use crate::error::{JobError, RejectReason};
use crate::future::{JobFuture, JobState};
use crate::input::JobInput;
use std::future::Future;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How a periodic job's executions are spaced.
#[derive(Clone, Copy, Debug)]
enum PeriodicMode {
    /// Ticks at a fixed rate, measured start to start.
    FixedRate,
    /// A fixed gap between the end of one execution and the start of the next.
    FixedDelay,
}

impl JobManager {
    /// Schedules a job for immediate execution.
    ///
    /// The body receives a [`JobContext`] and runs as soon as a worker
    /// permit is available.
    ///
    /// # Errors
    ///
    /// [`JobError::Rejected`] if a job with the same identity is still
    /// active, or if the manager is shut down. The rejection is synchronous;
    /// the job never starts.
    pub fn schedule<F, Fut>(&self, input: JobInput, body: F) -> Result<JobFuture, JobError>
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.schedule_with_delay(input, Duration::ZERO, body)
    }

    /// Schedules a job for execution after the given delay.
    ///
    /// Same rejection semantics as [`schedule`](Self::schedule). The future
    /// stays `Pending` during the delay; cancelling it aborts the delay.
    pub fn schedule_with_delay<F, Fut>(
        &self,
        input: JobInput,
        delay: Duration,
        body: F,
    ) -> Result<JobFuture, JobError>
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let future = self.register(input)?;
        let registry = Arc::clone(&self.registry);
        let workers = Arc::clone(&self.workers);
        let notify = Arc::clone(&self.completion_notify);

        let runner = future.clone();
        tokio::spawn(async move {
            let outcome = run_one_shot(&runner, &workers, delay, body).await;
            finish(&registry, &notify, &runner, outcome);
        });

        Ok(future)
    }

    /// Schedules a periodic job with executions spaced at a fixed rate,
    /// measured start to start.
    ///
    /// Executions of one job never overlap; a tick that falls due while the
    /// previous execution is still running is delayed, not dropped or run
    /// concurrently. The future stays non-terminal until the job is
    /// cancelled or an execution fails.
    ///
    /// # Errors
    ///
    /// Same rejection semantics as [`schedule`](Self::schedule), plus
    /// rejection of a zero `period`.
    pub fn schedule_at_fixed_rate<F, Fut>(
        &self,
        input: JobInput,
        initial_delay: Duration,
        period: Duration,
        body: F,
    ) -> Result<JobFuture, JobError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.schedule_periodic(input, initial_delay, period, PeriodicMode::FixedRate, body)
    }

    /// Schedules a periodic job with a fixed delay between the end of one
    /// execution and the start of the next.
    ///
    /// # Errors
    ///
    /// Same rejection semantics as
    /// [`schedule_at_fixed_rate`](Self::schedule_at_fixed_rate).
    pub fn schedule_with_fixed_delay<F, Fut>(
        &self,
        input: JobInput,
        initial_delay: Duration,
        period: Duration,
        body: F,
    ) -> Result<JobFuture, JobError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.schedule_periodic(input, initial_delay, period, PeriodicMode::FixedDelay, body)
    }

    fn schedule_periodic<F, Fut>(
        &self,
        input: JobInput,
        initial_delay: Duration,
        period: Duration,
        mode: PeriodicMode,
        body: F,
    ) -> Result<JobFuture, JobError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        if period.is_zero() {
            return Err(JobError::Rejected {
                id: input.id().clone(),
                reason: RejectReason::InvalidPeriod,
            });
        }

        let future = self.register(input)?;
        let registry = Arc::clone(&self.registry);
        let workers = Arc::clone(&self.workers);
        let notify = Arc::clone(&self.completion_notify);

        let runner = future.clone();
        tokio::spawn(async move {
            let outcome = run_periodic(&runner, &workers, initial_delay, period, mode, body).await;
            finish(&registry, &notify, &runner, outcome);
        });

        Ok(future)
    }

    /// Registers a future for the input, enforcing the rejection policy.
    ///
    /// Shutdown and duplicate checks both happen inside the registry lock,
    /// so a registration racing [`shutdown`](Self::shutdown) is either
    /// cancelled by it or rejected.
    fn register(&self, input: JobInput) -> Result<JobFuture, JobError> {
        let future = JobFuture::new(input);
        self.registry.register(future.clone())?;

        info!(
            job_id = %future.id(),
            job_name = %future.name(),
            "Job scheduled"
        );
        Ok(future)
    }
}

// =============================================================================
// Runner tasks
// =============================================================================

/// Drives a one-shot job: optional delay, then a single body execution.
///
/// Returns the captured failure, or `None` on success.
async fn run_one_shot<F, Fut>(
    future: &JobFuture,
    workers: &Arc<Semaphore>,
    delay: Duration,
    body: F,
) -> Option<JobError>
where
    F: FnOnce(JobContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    let token = future.interrupt_token();

    if !delay.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = token.cancelled() => return Some(JobError::Cancelled),
        }
    }
    if future.is_cancelled() {
        return Some(JobError::Cancelled);
    }

    let permit_slot = PermitSlot::default();
    let ctx = JobContext::new(future.clone(), Arc::clone(workers), Arc::clone(&permit_slot));
    run_body(future, workers, &permit_slot, body(ctx)).await
}

/// Drives a periodic job: initial delay, then serial executions spaced by
/// the mode until cancellation or failure.
async fn run_periodic<F, Fut>(
    future: &JobFuture,
    workers: &Arc<Semaphore>,
    initial_delay: Duration,
    period: Duration,
    mode: PeriodicMode,
    body: F,
) -> Option<JobError>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    let token = future.interrupt_token();

    if !initial_delay.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = token.cancelled() => return Some(JobError::Cancelled),
        }
    }

    // For fixed-rate, the interval owns the tick cadence; the immediate
    // first tick is consumed here so the first execution starts right away.
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        if future.is_cancelled() {
            return Some(JobError::Cancelled);
        }

        let permit_slot = PermitSlot::default();
        let ctx = JobContext::new(future.clone(), Arc::clone(workers), Arc::clone(&permit_slot));
        let outcome = run_body(future, workers, &permit_slot, body(ctx)).await;
        if let Some(err) = outcome {
            return Some(err);
        }

        // Back to pending between executions.
        future.status_cell().set(JobState::Pending);
        debug!(job_id = %future.id(), "Periodic execution complete");

        match mode {
            PeriodicMode::FixedRate => {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = token.cancelled() => return Some(JobError::Cancelled),
                }
            }
            PeriodicMode::FixedDelay => {
                tokio::select! {
                    _ = tokio::time::sleep(period) => {}
                    _ = token.cancelled() => return Some(JobError::Cancelled),
                }
            }
        }
    }
}

/// Runs one body execution on the worker pool.
///
/// Acquires a worker permit (the future stays `Pending` while waiting),
/// deposits it in the shared slot, marks the future `Running`, spawns the
/// body, and awaits its join handle. Blocked waits inside the body release
/// the slotted permit and re-acquire one on resume. A panic in the body is
/// captured as an execution failure.
async fn run_body<Fut>(
    future: &JobFuture,
    workers: &Arc<Semaphore>,
    permit_slot: &PermitSlot,
    body: Fut,
) -> Option<JobError>
where
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    let token = future.interrupt_token();

    let permit = tokio::select! {
        permit = Arc::clone(workers).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return Some(JobError::Cancelled),
        },
        _ = token.cancelled() => return Some(JobError::Cancelled),
    };
    *permit_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(permit);

    future.status_cell().set(JobState::Running);
    debug!(job_id = %future.id(), "Job running");

    let worker = tokio::spawn(body);
    let result = worker.await;
    // The body may have ended without a permit (interrupted mid-wait).
    permit_slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();

    match result {
        Ok(Ok(())) => {
            if future.is_cancelled() {
                Some(JobError::Cancelled)
            } else {
                None
            }
        }
        Ok(Err(err)) => Some(err),
        Err(join_err) => Some(JobError::Panicked {
            message: join_err.to_string(),
        }),
    }
}

/// Terminal bookkeeping: state transition, failure capture, registry
/// pruning, waiter wakeup. Transition happens before removal, removal
/// before notification, so waiters never observe a removed-but-active
/// future.
fn finish(
    registry: &Arc<FutureRegistry>,
    notify: &Arc<Notify>,
    future: &JobFuture,
    outcome: Option<JobError>,
) {
    let state = match &outcome {
        None => JobState::Done,
        Some(err) if err.is_cancellation() || err.is_interruption() => JobState::Cancelled,
        Some(_) => JobState::Failed,
    };

    match &outcome {
        None => {
            info!(job_id = %future.id(), "Job completed");
        }
        Some(err) if state == JobState::Cancelled => {
            warn!(job_id = %future.id(), reason = %err, "Job cancelled");
        }
        Some(err) => {
            error!(job_id = %future.id(), error = %err, "Job failed");
        }
    }

    if let Some(err) = outcome {
        future.set_failure(err);
    }
    future.status_cell().set(state);
    registry.remove(future);
    notify.notify_waiters();
}
