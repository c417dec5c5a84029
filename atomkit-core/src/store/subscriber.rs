//! Subscriber types for the atom store.
//!
//! A Subscriber is a callback registered against one atom record. It is
//! invoked synchronously with the new value every time the atom is written.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::record::AtomRecord;
use super::AnyValue;

/// Unique identifier for a subscriber.
///
/// Subscriptions are deduplicated by this ID, not by the callback itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered notification callback.
///
/// Cloning is cheap (the callback sits behind an `Arc`), which lets the
/// store snapshot the subscriber list before running any callback.
#[derive(Clone)]
pub(crate) struct Subscriber {
    id: SubscriberId,
    notify: Arc<dyn Fn(&AnyValue) + Send + Sync>,
}

impl Subscriber {
    pub(crate) fn new<F>(notify: F) -> Self
    where
        F: Fn(&AnyValue) + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Arc::new(notify),
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn notify(&self, value: &AnyValue) {
        (self.notify)(value);
    }
}

/// Handle returned by every subscribe operation.
///
/// The subscription stays registered while this handle is alive; calling
/// [`unsubscribe`](Self::unsubscribe) or dropping the handle removes it.
/// The handle only holds a weak reference to the atom record, so it never
/// keeps a cleared atom alive.
#[must_use = "dropping an Unsubscribe handle removes the subscription"]
pub struct Unsubscribe {
    record: Weak<AtomRecord>,
    id: Option<SubscriberId>,
}

impl Unsubscribe {
    pub(crate) fn new(record: &Arc<AtomRecord>, id: SubscriberId) -> Self {
        Self {
            record: Arc::downgrade(record),
            id: Some(id),
        }
    }

    /// A handle for a subscription that was never registered.
    pub fn inert() -> Self {
        Self {
            record: Weak::new(),
            id: None,
        }
    }

    /// Remove the subscription now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Whether the callback is still registered with a live record.
    pub fn is_active(&self) -> bool {
        match (self.id, self.record.upgrade()) {
            (Some(id), Some(record)) => record.is_subscribed(id),
            _ => false,
        }
    }

    /// The subscriber ID, if this handle was ever registered.
    pub fn id(&self) -> Option<SubscriberId> {
        self.id
    }

    fn release(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(record) = self.record.upgrade() {
            if record.remove_subscriber(id) {
                tracing::trace!(key = record.key(), ?id, "atom subscriber removed");
            }
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
