//! Notification coalescing: merge redundant pending notifications before
//! dispatch.
//!
//! Notification producers can emit many logically-overlapping notifications
//! within one dispatch window (e.g. "permissions of user X changed" for a
//! growing set of users). Coalescing reduces such a set to a smaller,
//! logically-equivalent one before it is handed to the transport, cutting
//! duplicate client and cluster traffic.
//!
//! A [`Coalescer`] pairs a selector ([`applies`](Coalescer::applies)) with a
//! reducer ([`coalesce`](Coalescer::coalesce)). The selector replaces
//! runtime-type dispatch: with notifications modelled as an enum, it is a
//! pattern match on the variant. A [`CoalescerChain`] runs every registered
//! coalescer over the subset of notifications it applies to; notifications
//! no coalescer claims pass through unchanged.
//!
//! Reducers must be associative and idempotent: coalescing an
//! already-coalesced result again yields the same result, and an empty input
//! yields an empty output.
//!
//! # Example
//!
//! ```ignore
//! enum Notification {
//!     AccessControl { user_ids: BTreeSet<String> },
//!     CacheInvalidated { region: String },
//! }
//!
//! struct AccessControlCoalescer;
//!
//! impl Coalescer<Notification> for AccessControlCoalescer {
//!     fn applies(&self, n: &Notification) -> bool {
//!         matches!(n, Notification::AccessControl { .. })
//!     }
//!
//!     fn coalesce(&self, notifications: Vec<Notification>) -> Vec<Notification> {
//!         // union of all user-id sets into a single notification
//!     }
//! }
//! ```

/// Reduces a set of same-kind notifications into an equivalent smaller set.
pub trait Coalescer<N>: Send + Sync {
    /// True if this coalescer is responsible for the given notification.
    ///
    /// The default claims everything; chains with several coalescers
    /// override this to select a variant.
    fn applies(&self, _notification: &N) -> bool {
        true
    }

    /// Coalesces the given notifications.
    ///
    /// Called only with notifications this coalescer
    /// [`applies`](Coalescer::applies) to, and never with an empty input.
    /// Must be associative and idempotent.
    fn coalesce(&self, notifications: Vec<N>) -> Vec<N>;
}

/// An ordered chain of coalescers, keyed by their selectors.
pub struct CoalescerChain<N> {
    coalescers: Vec<Box<dyn Coalescer<N>>>,
}

impl<N> CoalescerChain<N> {
    /// Creates an empty chain. Without registered coalescers every
    /// notification passes through unchanged.
    pub fn new() -> Self {
        Self {
            coalescers: Vec::new(),
        }
    }

    /// Registers a coalescer. Chainable.
    pub fn with(mut self, coalescer: impl Coalescer<N> + 'static) -> Self {
        self.coalescers.push(Box::new(coalescer));
        self
    }

    /// Registers a coalescer.
    pub fn register(&mut self, coalescer: impl Coalescer<N> + 'static) {
        self.coalescers.push(Box::new(coalescer));
    }

    /// Returns the number of registered coalescers.
    pub fn len(&self) -> usize {
        self.coalescers.len()
    }

    /// True if no coalescer is registered.
    pub fn is_empty(&self) -> bool {
        self.coalescers.is_empty()
    }

    /// Coalesces a set of notifications.
    ///
    /// Each registered coalescer reduces the subset it applies to; the rest
    /// passes through. Arrival order is preserved: the reduced set replaces
    /// the claimed notifications at the position of the first one. An empty
    /// input yields an empty output.
    pub fn coalesce(&self, notifications: Vec<N>) -> Vec<N> {
        let mut remaining = notifications;
        for coalescer in &self.coalescers {
            let Some(first_claimed) = remaining.iter().position(|n| coalescer.applies(n)) else {
                continue;
            };
            let (claimed, mut rest): (Vec<N>, Vec<N>) =
                remaining.into_iter().partition(|n| coalescer.applies(n));
            // Everything before the first claimed notification is unclaimed,
            // so its index is valid in the remainder.
            rest.splice(first_claimed..first_claimed, coalescer.coalesce(claimed));
            remaining = rest;
        }
        remaining
    }
}

impl<N> Default for CoalescerChain<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> std::fmt::Debug for CoalescerChain<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescerChain")
            .field("coalescers", &self.coalescers.len())
            .finish()
    }
}

/// Accumulates notifications for one dispatch window and coalesces them on
/// flush, before handoff to the transport.
pub struct CoalescingBuffer<N> {
    chain: CoalescerChain<N>,
    pending: Vec<N>,
}

impl<N> CoalescingBuffer<N> {
    /// Creates a buffer that flushes through the given chain.
    pub fn new(chain: CoalescerChain<N>) -> Self {
        Self {
            chain,
            pending: Vec::new(),
        }
    }

    /// Adds a notification to the current window.
    pub fn push(&mut self, notification: N) {
        self.pending.push(notification);
    }

    /// Returns the number of pending (uncoalesced) notifications.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if the current window holds no notifications.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Closes the window: drains all pending notifications and returns the
    /// coalesced set. The buffer is empty afterwards.
    pub fn flush(&mut self) -> Vec<N> {
        let pending = std::mem::take(&mut self.pending);
        self.chain.coalesce(pending)
    }
}

impl<N> std::fmt::Debug for CoalescingBuffer<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingBuffer")
            .field("pending", &self.pending.len())
            .field("chain", &self.chain)
            .finish()
    }
}
