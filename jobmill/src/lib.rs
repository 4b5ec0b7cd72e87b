//! Jobmill - job scheduling with filterable futures
//!
//! This library provides a job manager for background and model work:
//! immediate, delayed, and periodic scheduling with per-submission futures,
//! filter-based waiting/visiting/cancellation, cooperative blocking
//! conditions, and notification coalescing for outbound event traffic.
//!
//! # High-Level API
//!
//! ```ignore
//! use jobmill::{JobManager, JobInput, filter};
//! use std::time::Duration;
//!
//! let manager = JobManager::new();
//!
//! let future = manager.schedule(
//!     JobInput::new("nightly-sync", "NightlySync").with_hint("background"),
//!     |ctx| async move {
//!         // ... work, observing ctx.is_cancelled() ...
//!         Ok(())
//!     },
//! )?;
//!
//! let done = manager
//!     .wait_until_done(filter::hinted("background"), Duration::from_secs(30))
//!     .await;
//! ```

pub mod blocking;
pub mod coalesce;
pub mod context;
pub mod error;
pub mod filter;
pub mod future;
pub mod input;
pub mod logging;
pub mod manager;

pub use blocking::BlockingCondition;
pub use coalesce::{Coalescer, CoalescerChain, CoalescingBuffer};
pub use context::JobContext;
pub use error::{JobError, RejectReason};
pub use future::{JobFuture, JobState};
pub use input::{JobId, JobInput};
pub use manager::{JobManager, JobManagerConfig, DEFAULT_WORKER_LIMIT};

/// Version of the jobmill library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
