//! Job manager core - struct, configuration, and shutdown.
//!
//! Scheduling operations live in `schedule`; waiting, visiting, and
//! filter-based cancellation live in `query`.

use super::registry::FutureRegistry;
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tracing::info;

// =============================================================================
// Configuration
// =============================================================================

/// Default maximum number of concurrently executing job bodies.
pub const DEFAULT_WORKER_LIMIT: usize = 64;

/// Configuration for the job manager.
#[derive(Clone, Debug)]
pub struct JobManagerConfig {
    /// Maximum number of job bodies executing at once.
    ///
    /// Jobs beyond the limit stay `Pending` until a worker permit frees up.
    /// Timing of delayed and periodic jobs is unaffected by the limit.
    pub worker_limit: usize,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            worker_limit: DEFAULT_WORKER_LIMIT,
        }
    }
}

// =============================================================================
// Job Manager
// =============================================================================

/// Schedules jobs, tracks their futures, and provides filtered waiting,
/// visiting, and cancellation over them.
///
/// Job bodies run as spawned tasks gated by a worker permit pool; timing
/// (delays, periodic ticks) is driven by per-job dispatcher tasks that never
/// execute bodies themselves, so a slow job cannot starve the timing of
/// other periodic jobs.
pub struct JobManager {
    pub(crate) config: JobManagerConfig,

    /// All non-terminal futures. The single synchronization boundary.
    pub(crate) registry: Arc<FutureRegistry>,

    /// Worker permit pool bounding concurrently executing bodies.
    pub(crate) workers: Arc<Semaphore>,

    /// Woken whenever a future reaches a terminal state.
    pub(crate) completion_notify: Arc<Notify>,
}

impl JobManager {
    /// Creates a job manager with the default configuration.
    pub fn new() -> Self {
        Self::with_config(JobManagerConfig::default())
    }

    /// Creates a job manager with the given configuration.
    pub fn with_config(config: JobManagerConfig) -> Self {
        let workers = Arc::new(Semaphore::new(config.worker_limit));
        Self {
            config,
            registry: Arc::new(FutureRegistry::new()),
            workers,
            completion_notify: Arc::new(Notify::new()),
        }
    }

    /// Returns the number of active (non-terminal) futures.
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.registry.is_shut_down()
    }

    /// Shuts the manager down.
    ///
    /// Stops accepting new work (subsequent `schedule*` calls are rejected),
    /// requests interrupting cancellation for every outstanding future, and
    /// wakes all waiters. Closing the registry and snapshotting the
    /// outstanding futures is one atomic step, so a racing schedule call is
    /// either cancelled here or rejected. Cooperative: jobs terminate once
    /// they observe the cancellation. Idempotent.
    pub fn shutdown(&self) {
        let Some(outstanding) = self.registry.shut_down() else {
            return;
        };
        info!(outstanding = outstanding.len(), "Job manager shutting down");

        for future in outstanding {
            future.cancel(true);
        }
        self.completion_notify.notify_waiters();
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("active_count", &self.active_count())
            .field("worker_limit", &self.config.worker_limit)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
