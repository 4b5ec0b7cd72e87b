//! Registry of active futures.
//!
//! The registry is the only shared mutable structure of the manager. Every
//! mutation (registration, removal, shutdown) and every read goes through
//! one mutex, so concurrent scheduling, visiting, and completion always
//! observe a consistent view.

use crate::error::{JobError, RejectReason};
use crate::future::JobFuture;
use crate::input::JobId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Inner {
    futures: HashMap<JobId, JobFuture>,
    shut_down: bool,
}

pub(crate) struct FutureRegistry {
    inner: Mutex<Inner>,
}

impl FutureRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                futures: HashMap::new(),
                shut_down: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Entries are plain handles; a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a future, rejecting after shutdown and on a duplicate
    /// active identity.
    ///
    /// The shutdown check happens under the same lock as
    /// [`shut_down`](Self::shut_down)'s snapshot, so a registration racing
    /// shutdown either lands in the snapshot (and is cancelled) or is
    /// rejected. A same-identity entry that already reached a terminal
    /// state (but has not been pruned yet) does not reject; it is replaced.
    pub fn register(&self, future: JobFuture) -> Result<(), JobError> {
        let mut inner = self.lock();
        if inner.shut_down {
            return Err(JobError::Rejected {
                id: future.id().clone(),
                reason: RejectReason::ShutDown,
            });
        }
        if let Some(existing) = inner.futures.get(future.id()) {
            if !existing.is_done() {
                return Err(JobError::Rejected {
                    id: future.id().clone(),
                    reason: RejectReason::AlreadyRunning,
                });
            }
        }
        inner.futures.insert(future.id().clone(), future);
        Ok(())
    }

    /// Removes the given future, if it is still the registered one.
    ///
    /// Compares by handle identity so that a terminal entry that was
    /// replaced by a newer same-identity job is never removed by the old
    /// job's cleanup.
    pub fn remove(&self, future: &JobFuture) {
        let mut inner = self.lock();
        if inner.futures.get(future.id()) == Some(future) {
            inner.futures.remove(future.id());
        }
    }

    /// Returns a snapshot of all registered futures.
    pub fn snapshot(&self) -> Vec<JobFuture> {
        self.lock().futures.values().cloned().collect()
    }

    /// Returns the number of registered futures.
    pub fn len(&self) -> usize {
        self.lock().futures.len()
    }

    /// Closes the registry for new registrations.
    ///
    /// Flag flip and snapshot happen atomically. Returns the outstanding
    /// futures the first time, `None` on repeat calls.
    pub fn shut_down(&self) -> Option<Vec<JobFuture>> {
        let mut inner = self.lock();
        if inner.shut_down {
            return None;
        }
        inner.shut_down = true;
        Some(inner.futures.values().cloned().collect())
    }

    /// True once [`shut_down`](Self::shut_down) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }
}
