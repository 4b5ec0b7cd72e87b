//! Blocking conditions: cooperative wait points for running jobs.
//!
//! A [`BlockingCondition`] puts waiters into a dormant state until the
//! condition falls. It can be shared across threads and jobs, waited on by
//! multiple waiters at once, and re-armed after it fell.
//!
//! Jobs wait through [`JobContext::wait_for`], which flips the future's
//! state to `Blocked` for the duration of the wait and reacts to
//! interrupting cancellation. Plain [`wait`](BlockingCondition::wait) is
//! also usable outside any job.
//!
//! [`JobContext::wait_for`]: crate::context::JobContext::wait_for

use std::fmt;
use tokio::sync::watch;

/// An externally satisfiable condition a job can block on.
pub struct BlockingCondition {
    name: String,
    state: watch::Sender<bool>,
}

impl BlockingCondition {
    /// Creates a condition with the given name and initial blocking state.
    pub fn new(name: impl Into<String>, blocking: bool) -> Self {
        let (state, _) = watch::channel(blocking);
        Self {
            name: name.into(),
            state,
        }
    }

    /// Returns the condition's name (used in logging).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if waits on this condition currently block.
    pub fn is_blocking(&self) -> bool {
        *self.state.borrow()
    }

    /// Changes the blocking state. Callable from any thread.
    ///
    /// Setting `false` invalidates the condition and releases every waiter.
    /// Setting `true` re-arms it for subsequent waits.
    pub fn set_blocking(&self, blocking: bool) {
        self.state.send_if_modified(|state| {
            if *state == blocking {
                false
            } else {
                *state = blocking;
                true
            }
        });
    }

    /// Waits until the condition is not blocking.
    ///
    /// Returns immediately if the condition is not blocking at the time of
    /// invocation.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl fmt::Debug for BlockingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingCondition")
            .field("name", &self.name)
            .field("blocking", &self.is_blocking())
            .finish()
    }
}
