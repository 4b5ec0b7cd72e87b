//! Job future: the per-submission handle for state queries and cancellation.
//!
//! A [`JobFuture`] is returned for every scheduled job. It exposes the job's
//! input, its current [`JobState`], the captured failure once terminal, and
//! cooperative cancellation. Handles are cloneable; all clones refer to the
//! same underlying job.
//!
//! # State machine
//!
//! ```text
//! PENDING → RUNNING → {BLOCKED ⇄ RUNNING} → {DONE | CANCELLED | FAILED}
//! ```
//!
//! Terminal states are final: no transition ever leaves one.
//!
//! # Example
//!
//! ```ignore
//! use jobmill::{JobManager, JobInput};
//!
//! let future = manager.schedule(JobInput::new("sync", "Sync"), |ctx| async move {
//!     // ... work ...
//!     Ok(())
//! })?;
//!
//! if future.cancel(true) {
//!     // cancellation accepted; the job will terminate cooperatively
//! }
//! ```

use crate::error::JobError;
use crate::input::{JobId, JobInput};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Global counter distinguishing future instances (for [`filter::future`]).
///
/// [`filter::future`]: crate::filter::future
static FUTURE_SEQ_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Execution state of a scheduled job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JobState {
    /// Scheduled but not yet executing (waiting for its delay, its next
    /// periodic tick, or a worker permit).
    #[default]
    Pending,

    /// The job body is executing.
    Running,

    /// The job body is waiting on a blocking condition.
    Blocked,

    /// Completed successfully.
    Done,

    /// Cancelled before completion.
    Cancelled,

    /// The job body failed or panicked.
    Failed,
}

impl JobState {
    /// True if this is a terminal state (Done, Cancelled, or Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }

    /// True if the job body is waiting on a blocking condition.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Blocked => write!(f, "Blocked"),
            Self::Done => write!(f, "Done"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Shared state cell enforcing that terminal states are final.
///
/// Wraps the watch channel all handles observe. Every transition goes
/// through [`set`](StatusCell::set), which refuses to leave a terminal state.
pub(crate) struct StatusCell {
    tx: watch::Sender<JobState>,
}

impl StatusCell {
    pub(crate) fn new() -> (Arc<Self>, watch::Receiver<JobState>) {
        let (tx, rx) = watch::channel(JobState::Pending);
        (Arc::new(Self { tx }), rx)
    }

    /// Transitions to `next` unless the current state is terminal.
    ///
    /// Returns whether the transition was applied.
    pub(crate) fn set(&self, next: JobState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                false
            } else {
                *state = next;
                true
            }
        })
    }

    pub(crate) fn get(&self) -> JobState {
        *self.tx.borrow()
    }
}

/// Handle to a scheduled job.
///
/// Cloneable; clones share the same job. The manager owns the job for its
/// lifetime, callers only hold handles.
#[derive(Clone)]
pub struct JobFuture {
    seq: u64,
    input: Arc<JobInput>,
    status: Arc<StatusCell>,
    status_rx: watch::Receiver<JobState>,
    cancelled: Arc<AtomicBool>,
    interrupt: CancellationToken,
    failure: Arc<Mutex<Option<JobError>>>,
}

impl JobFuture {
    pub(crate) fn new(input: JobInput) -> Self {
        let (status, status_rx) = StatusCell::new();
        Self {
            seq: FUTURE_SEQ_COUNTER.fetch_add(1, Ordering::Relaxed),
            input: Arc::new(input),
            status,
            status_rx,
            cancelled: Arc::new(AtomicBool::new(false)),
            interrupt: CancellationToken::new(),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the job's identity.
    pub fn id(&self) -> &JobId {
        self.input.id()
    }

    /// Returns the job's display name.
    pub fn name(&self) -> &str {
        self.input.name()
    }

    /// Returns the job's input.
    pub fn input(&self) -> &JobInput {
        &self.input
    }

    /// Returns the current state. Non-blocking.
    pub fn state(&self) -> JobState {
        self.status.get()
    }

    /// True if the job body is currently waiting on a blocking condition.
    pub fn is_blocked(&self) -> bool {
        self.state().is_blocked()
    }

    /// True if cancellation has been requested or the job ended cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.state() == JobState::Cancelled
    }

    /// True if the job reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// Requests cooperative cancellation.
    ///
    /// Returns `false` without any effect if the job is already terminal.
    /// Otherwise the cancellation flag is set and `true` is returned; the
    /// job terminates once its body observes the flag.
    ///
    /// With `interrupt_if_running` set, a body waiting on a blocking
    /// condition (or a cancellable sleep) is woken immediately and observes
    /// an interruption. A job that has not started yet is always woken out
    /// of its delay or permit wait, since nothing is running that could be
    /// interrupted mid-work.
    pub fn cancel(&self, interrupt_if_running: bool) -> bool {
        let state = self.state();
        if state.is_terminal() {
            return false;
        }
        self.cancelled.store(true, Ordering::SeqCst);
        if interrupt_if_running || state == JobState::Pending {
            self.interrupt.cancel();
        }
        true
    }

    /// Returns the failure captured when the job terminated, if any.
    ///
    /// `None` while the job is active or when it completed successfully.
    pub fn failure(&self) -> Option<JobError> {
        self.failure.lock().ok().and_then(|guard| guard.clone())
    }

    /// Waits until the job reaches a terminal state.
    pub async fn wait(&mut self) {
        loop {
            if self.state().is_terminal() {
                return;
            }
            if self.status_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Waits until the job reaches a terminal state, or the timeout elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), JobError> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(JobError::Timeout),
        }
    }

    pub(crate) fn status_cell(&self) -> &Arc<StatusCell> {
        &self.status
    }

    pub(crate) fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    pub(crate) fn set_failure(&self, error: JobError) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = Some(error);
        }
    }
}

impl PartialEq for JobFuture {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for JobFuture {}

impl fmt::Debug for JobFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobFuture")
            .field("id", self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
