//! Error types for job scheduling and execution.
//!
//! [`JobError`] covers every failure condition of the job manager: rejection
//! at scheduling time, cooperative cancellation, interruption of a blocked
//! wait, wait timeouts, and execution failures inside a job body.
//!
//! Callers diagnose failures through the boolean classifiers
//! ([`is_rejection`](JobError::is_rejection),
//! [`is_cancellation`](JobError::is_cancellation), ...) rather than by
//! matching variants directly, so each condition can be tested independently.
//!
//! Scheduling-time errors (rejection) are returned synchronously from the
//! `schedule*` methods because the job never starts. Runtime errors are
//! captured on the future and retrievable via
//! [`JobFuture::failure`](crate::future::JobFuture::failure).

use crate::input::JobId;
use std::fmt;
use thiserror::Error;

/// Why a job was rejected at scheduling time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// A future with the same identity is still active.
    AlreadyRunning,

    /// The manager has been shut down and accepts no new work.
    ShutDown,

    /// A periodic schedule was requested with a zero period.
    InvalidPeriod,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "a job with this identity is already running"),
            Self::ShutDown => write!(f, "the job manager is shut down"),
            Self::InvalidPeriod => write!(f, "the period must be non-zero"),
        }
    }
}

/// Errors raised by the job manager and by job bodies.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum JobError {
    /// The job was not scheduled.
    ///
    /// Reported synchronously to the scheduling caller; the job never ran.
    #[error("job '{id}' rejected: {reason}")]
    Rejected { id: JobId, reason: RejectReason },

    /// Cancellation was requested and the job terminated cooperatively.
    #[error("job was cancelled")]
    Cancelled,

    /// A blocked wait was woken by an interrupting cancellation.
    #[error("blocked wait was interrupted")]
    Interrupted,

    /// A timed wait elapsed before the condition fell.
    #[error("wait timed out")]
    Timeout,

    /// The job body returned an error.
    #[error("job failed: {message}")]
    Failed { message: String },

    /// The job body panicked.
    #[error("job panicked: {message}")]
    Panicked { message: String },
}

impl JobError {
    /// Creates an execution failure from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// True if the job was rejected at scheduling time.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// True if the job terminated due to a cancellation request.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True if a blocked wait was woken by an interrupting cancellation.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// True if a timed wait elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// True if the job body itself failed (error return or panic).
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Panicked { .. })
    }
}
