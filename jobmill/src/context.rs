//! Execution context passed to every job body.
//!
//! The [`JobContext`] is how a running job observes cancellation and enters
//! cooperative wait states. Bodies are expected to check
//! [`is_cancelled`](JobContext::is_cancelled) at suitable points and to use
//! the context's waits instead of bare sleeps so that interrupting
//! cancellation can wake them promptly.
//!
//! While a job waits on a blocking condition it gives its worker permit
//! back to the pool, so another job can run (and release the condition);
//! on resume it competes for a permit anew.
//!
//! # Example
//!
//! ```ignore
//! manager.schedule(input, |ctx| async move {
//!     loop {
//!         if ctx.is_cancelled() {
//!             return Err(JobError::Cancelled);
//!         }
//!         ctx.wait_for(&gate).await?;
//!         // ... work ...
//!     }
//! })?;
//! ```

use crate::blocking::BlockingCondition;
use crate::error::JobError;
use crate::future::{JobFuture, JobState};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Shared slot holding the worker permit of the executing body.
///
/// The dispatcher deposits the permit before the body starts; a blocked
/// wait takes it out (releasing it to the pool) and puts a fresh one back
/// on resume.
pub(crate) type PermitSlot = Arc<Mutex<Option<OwnedSemaphorePermit>>>;

/// Context handed to a job body for the duration of one execution.
pub struct JobContext {
    future: JobFuture,
    workers: Arc<Semaphore>,
    permit: PermitSlot,
}

impl JobContext {
    pub(crate) fn new(future: JobFuture, workers: Arc<Semaphore>, permit: PermitSlot) -> Self {
        Self {
            future,
            workers,
            permit,
        }
    }

    /// Returns the future of the job this context belongs to.
    pub fn future(&self) -> &JobFuture {
        &self.future
    }

    /// True if cancellation has been requested for this job.
    pub fn is_cancelled(&self) -> bool {
        self.future.is_cancelled()
    }

    /// Sleeps for the given duration, waking early on interrupting
    /// cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), JobError> {
        let token = self.future.interrupt_token();
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = token.cancelled() => Err(JobError::Interrupted),
        }
    }

    /// Waits for the condition to fall, marking the future `Blocked`.
    ///
    /// Returns immediately if the condition is not blocking. While waiting,
    /// the future's state is `Blocked` (observable via
    /// [`filter::blocked`](crate::filter::blocked)) and the job's worker
    /// permit is handed back to the pool, so another job can run and release
    /// the condition even at `worker_limit: 1`. On resume the job competes
    /// for a permit anew before it continues; it reverts to `Running` when
    /// the wait ends, however it ends.
    ///
    /// # Errors
    ///
    /// [`JobError::Interrupted`] if an interrupting cancellation woke the
    /// wait. The condition may still be blocking in that case; the job
    /// should observe the cancellation and terminate.
    pub async fn wait_for(&self, condition: &BlockingCondition) -> Result<(), JobError> {
        if !condition.is_blocking() {
            return Ok(());
        }

        let token = self.future.interrupt_token();
        let had_permit = self.release_permit();
        self.enter_blocked(condition);
        let mut result = tokio::select! {
            _ = condition.wait() => Ok(()),
            _ = token.cancelled() => Err(JobError::Interrupted),
        };
        // An interrupted job is terminating and no longer needs a permit.
        if had_permit && !matches!(result, Err(JobError::Interrupted)) {
            if let Err(err) = self.reacquire_permit().await {
                result = Err(err);
            }
        }
        self.leave_blocked(condition);
        result
    }

    /// Waits for at most `timeout` for the condition to fall.
    ///
    /// Same permit handoff as [`wait_for`](Self::wait_for); the timeout
    /// bounds the condition wait, not the permit re-acquisition.
    ///
    /// # Errors
    ///
    /// [`JobError::Timeout`] if the deadline elapsed first,
    /// [`JobError::Interrupted`] on interrupting cancellation. Either way
    /// the condition may still be blocking.
    pub async fn wait_for_with_timeout(
        &self,
        condition: &BlockingCondition,
        timeout: Duration,
    ) -> Result<(), JobError> {
        if !condition.is_blocking() {
            return Ok(());
        }

        let token = self.future.interrupt_token();
        let had_permit = self.release_permit();
        self.enter_blocked(condition);
        let mut result = tokio::select! {
            outcome = tokio::time::timeout(timeout, condition.wait()) => match outcome {
                Ok(()) => Ok(()),
                Err(_) => Err(JobError::Timeout),
            },
            _ = token.cancelled() => Err(JobError::Interrupted),
        };
        // A timed-out body resumes running, so it gets its permit back too.
        if had_permit && !matches!(result, Err(JobError::Interrupted)) {
            if let Err(err) = self.reacquire_permit().await {
                result = Err(err);
            }
        }
        self.leave_blocked(condition);
        result
    }

    /// Drops the held worker permit, if any. Returns whether one was held.
    fn release_permit(&self) -> bool {
        self.permit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Competes for a worker permit anew after a blocked wait ended.
    async fn reacquire_permit(&self) -> Result<(), JobError> {
        let token = self.future.interrupt_token();
        let permit = tokio::select! {
            permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return Err(JobError::Cancelled),
            },
            _ = token.cancelled() => return Err(JobError::Interrupted),
        };
        *self.permit.lock().unwrap_or_else(PoisonError::into_inner) = Some(permit);
        Ok(())
    }

    fn enter_blocked(&self, condition: &BlockingCondition) {
        self.future.status_cell().set(JobState::Blocked);
        debug!(
            job_id = %self.future.id(),
            condition = %condition.name(),
            "Job blocked on condition"
        );
    }

    fn leave_blocked(&self, condition: &BlockingCondition) {
        self.future.status_cell().set(JobState::Running);
        debug!(
            job_id = %self.future.id(),
            condition = %condition.name(),
            "Job resumed"
        );
    }
}
