//! Filter predicates over job futures.
//!
//! Filters are plain closures `Fn(&JobFuture) -> bool` used to select
//! subsets of futures for the manager's wait/visit/cancel operations. They
//! are stateless values with no side effects; composition happens at the
//! call site via [`and`], [`or`], and [`not`].
//!
//! # Example
//!
//! ```ignore
//! use jobmill::filter;
//!
//! // All blocked jobs of session 42:
//! let f = filter::and(filter::blocked(), filter::hinted("session-42"));
//! manager.cancel(f, true);
//! ```

use crate::future::{JobFuture, JobState};

/// Accepts every future.
pub fn always() -> impl Fn(&JobFuture) -> bool {
    |_| true
}

/// Accepts exactly the given future (any clone of the same handle).
pub fn future(target: &JobFuture) -> impl Fn(&JobFuture) -> bool {
    let target = target.clone();
    move |f| *f == target
}

/// Accepts futures currently waiting on a blocking condition.
pub fn blocked() -> impl Fn(&JobFuture) -> bool {
    |f| f.state() == JobState::Blocked
}

/// Accepts futures whose job carries the given display name.
pub fn named(name: impl Into<String>) -> impl Fn(&JobFuture) -> bool {
    let name = name.into();
    move |f| f.name() == name
}

/// Accepts futures whose input carries the given execution hint.
///
/// Hints generalise session- or subsystem-scoped selection: tag all jobs of
/// one session with the same hint and filter on it.
pub fn hinted(hint: impl Into<String>) -> impl Fn(&JobFuture) -> bool {
    let hint = hint.into();
    move |f| f.input().has_hint(&hint)
}

/// Logical conjunction of two filters.
pub fn and<A, B>(a: A, b: B) -> impl Fn(&JobFuture) -> bool
where
    A: Fn(&JobFuture) -> bool,
    B: Fn(&JobFuture) -> bool,
{
    move |f| a(f) && b(f)
}

/// Logical disjunction of two filters.
pub fn or<A, B>(a: A, b: B) -> impl Fn(&JobFuture) -> bool
where
    A: Fn(&JobFuture) -> bool,
    B: Fn(&JobFuture) -> bool,
{
    move |f| a(f) || b(f)
}

/// Logical negation of a filter.
pub fn not<A>(a: A) -> impl Fn(&JobFuture) -> bool
where
    A: Fn(&JobFuture) -> bool,
{
    move |f| !a(f)
}
