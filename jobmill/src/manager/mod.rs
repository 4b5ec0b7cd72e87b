//! Job Manager
//!
//! This module provides the scheduling core: submit jobs (immediate,
//! delayed, fixed-rate, fixed-delay), track their futures, and wait for,
//! visit, or cancel subsets of them selected by filters.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       JobManager                            │
//! │  schedule*, wait_until_done, is_done, visit, cancel         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌───────────────┐  ┌─────────────────┐   │
//! │  │ Future       │  │ Worker permit │  │ Per-job         │   │
//! │  │ registry     │  │ pool          │  │ dispatcher task │   │
//! │  └──────────────┘  └───────────────┘  └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scheduling registers a [`JobFuture`](crate::future::JobFuture) in the
//! registry (rejecting a duplicate active identity synchronously) and
//! spawns a dispatcher task for the job. The dispatcher handles all timing
//! and spawns each body execution onto the worker pool; it never runs a
//! body itself, so one slow job cannot delay another job's ticks.
//!
//! # Example
//!
//! ```ignore
//! use jobmill::{JobManager, JobInput, filter};
//! use std::time::Duration;
//!
//! let manager = JobManager::new();
//!
//! let future = manager.schedule(JobInput::new("sync", "UserSync"), |ctx| async move {
//!     // ... work, checking ctx.is_cancelled() at suitable points ...
//!     Ok(())
//! })?;
//!
//! let all_done = manager
//!     .wait_until_done(filter::always(), Duration::from_secs(5))
//!     .await;
//!
//! manager.shutdown();
//! ```

mod core;
mod query;
mod registry;
mod schedule;

pub use self::core::{JobManager, JobManagerConfig, DEFAULT_WORKER_LIMIT};
