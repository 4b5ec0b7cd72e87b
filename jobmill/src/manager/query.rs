//! Waiting, visiting, and filter-based cancellation over futures.

use super::core::JobManager;
use crate::future::JobFuture;
use std::time::Duration;
use tracing::debug;

impl JobManager {
    /// Blocks until every future matching the filter is terminal, or the
    /// timeout elapses. Returns whether the wait succeeded.
    ///
    /// A zero timeout with an already-done matching set returns `true`
    /// immediately. Futures outside the filter never influence the result.
    /// Each matching future's terminal state is observed as it completes;
    /// there is no global atomicity across futures.
    pub async fn wait_until_done<F>(&self, filter: F, timeout: Duration) -> bool
    where
        F: Fn(&JobFuture) -> bool,
    {
        let deadline = tokio::time::Instant::now().checked_add(timeout);

        loop {
            // Register interest before checking, so a completion between the
            // check and the wait is never missed.
            let notified = self.completion_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_done(&filter) {
                return true;
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return self.is_done(&filter);
                    }
                }
                None => notified.await,
            }
        }
    }

    /// True if every future matching the filter is terminal. Non-blocking.
    ///
    /// Futures already pruned from the registry are terminal by definition,
    /// so an empty matching set yields `true`.
    pub fn is_done<F>(&self, filter: F) -> bool
    where
        F: Fn(&JobFuture) -> bool,
    {
        self.registry
            .snapshot()
            .iter()
            .filter(|f| filter(f))
            .all(|f| f.is_done())
    }

    /// Applies the visitor to each future matching the filter, over a
    /// consistent snapshot of the registry.
    ///
    /// The visitor returns whether to continue; `false` ends the visit.
    pub fn visit<F, V>(&self, filter: F, mut visitor: V)
    where
        F: Fn(&JobFuture) -> bool,
        V: FnMut(&JobFuture) -> bool,
    {
        for future in self.registry.snapshot().iter().filter(|f| filter(f)) {
            if !visitor(future) {
                break;
            }
        }
    }

    /// Returns the futures matching the filter.
    pub fn futures<F>(&self, filter: F) -> Vec<JobFuture>
    where
        F: Fn(&JobFuture) -> bool,
    {
        let mut snapshot = self.registry.snapshot();
        snapshot.retain(|f| filter(f));
        snapshot
    }

    /// Requests cancellation for every future matching the filter.
    ///
    /// Returns `true` iff every matching future accepted the cancellation
    /// (vacuously `true` when nothing matches). A future that is already
    /// terminal reports `false` without being altered.
    pub fn cancel<F>(&self, filter: F, interrupt_if_running: bool) -> bool
    where
        F: Fn(&JobFuture) -> bool,
    {
        let mut all_cancelled = true;
        for future in self.registry.snapshot().iter().filter(|f| filter(f)) {
            let cancelled = future.cancel(interrupt_if_running);
            debug!(
                job_id = %future.id(),
                interrupt = interrupt_if_running,
                accepted = cancelled,
                "Cancellation requested"
            );
            all_cancelled &= cancelled;
        }
        all_cancelled
    }
}
