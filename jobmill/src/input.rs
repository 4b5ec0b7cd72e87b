//! Job identity and descriptive input.
//!
//! A [`JobInput`] describes a unit of work before it is scheduled: its
//! identity (used for duplicate-rejection), a human-readable name for
//! logging, and optional execution hints that filters can select on.
//!
//! # Example
//!
//! ```ignore
//! use jobmill::JobInput;
//!
//! let input = JobInput::new("sync-users", "UserSync").with_hint("session-42");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique job IDs.
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a job.
///
/// Two schedule calls with the same `JobId` refer to the same logical job:
/// while one is active, the other is rejected. IDs can be constructed from
/// meaningful data (like `"nightly-sync"`) or auto-generated.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct JobId(String);

impl JobId {
    /// Creates a job ID with the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a unique auto-generated job ID of the form `job-{counter}`.
    ///
    /// Auto-generated IDs never collide, so jobs using them are effectively
    /// always re-entrant.
    pub fn auto() -> Self {
        let counter = JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("job-{}", counter))
    }

    /// Returns the string value of this job ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Descriptive input of a job: identity, display name, and execution hints.
///
/// Hints are free-form tags associated with the job for its whole lifetime.
/// They carry no meaning to the manager itself but can be selected on via
/// [`filter::hinted`](crate::filter::hinted), e.g. to group all jobs of one
/// session or subsystem.
#[derive(Clone, Debug)]
pub struct JobInput {
    id: JobId,
    name: String,
    hints: Vec<String>,
}

impl JobInput {
    /// Creates a job input with the given identity and display name.
    pub fn new(id: impl Into<JobId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hints: Vec::new(),
        }
    }

    /// Creates a job input with an auto-generated identity.
    ///
    /// Suitable for jobs that do not need duplicate-rejection.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(JobId::auto(), name)
    }

    /// Adds an execution hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Returns the job's identity.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Returns the job's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the execution hints.
    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// True if the given hint is associated with this job.
    pub fn has_hint(&self, hint: &str) -> bool {
        self.hints.iter().any(|h| h == hint)
    }
}
