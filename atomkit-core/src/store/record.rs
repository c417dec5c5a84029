//! Atom records.
//!
//! A record is the store's representation of one atom: the current value,
//! the value it was created with, and the callbacks observing it. Values are
//! stored type-erased and checked against the record's `TypeId` at the typed
//! boundary in [`AtomStore`](super::AtomStore).

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::subscriber::{Subscriber, SubscriberId};
use super::{AnyValue, AtomValue};

/// Subscribers captured for one notification pass.
///
/// Most atoms have a handful of observers, so the common case stays on the
/// stack.
pub(crate) type SubscriberSnapshot = SmallVec<[Subscriber; 4]>;

pub(crate) struct AtomRecord {
    key: Arc<str>,
    type_id: TypeId,
    type_name: &'static str,
    /// Set once, at creation.
    initial: AnyValue,
    state: RwLock<RecordState>,
}

struct RecordState {
    value: AnyValue,
    /// Incremented by every write, including resets.
    version: u64,
    /// Insertion-ordered so notification follows registration order.
    subscribers: IndexMap<SubscriberId, Subscriber>,
}

impl AtomRecord {
    pub(crate) fn new<T: AtomValue>(key: impl Into<Arc<str>>, initial: T) -> Self {
        let initial: AnyValue = Arc::new(initial);
        Self {
            key: key.into(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            initial: Arc::clone(&initial),
            state: RwLock::new(RecordState {
                value: initial,
                version: 0,
                subscribers: IndexMap::new(),
            }),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn holds<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub(crate) fn value(&self) -> AnyValue {
        Arc::clone(&self.state.read().value)
    }

    pub(crate) fn initial(&self) -> AnyValue {
        Arc::clone(&self.initial)
    }

    pub(crate) fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Replace the value and return the subscribers to notify.
    ///
    /// The lock is released before the caller runs any callback.
    pub(crate) fn replace(&self, value: AnyValue) -> SubscriberSnapshot {
        let mut state = self.state.write();
        state.value = value;
        state.version += 1;
        state.subscribers.values().cloned().collect()
    }

    pub(crate) fn add_subscriber(&self, subscriber: Subscriber) -> SubscriberId {
        let id = subscriber.id();
        self.state.write().subscribers.insert(id, subscriber);
        id
    }

    pub(crate) fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.state.write().subscribers.shift_remove(&id).is_some()
    }

    pub(crate) fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.state.read().subscribers.contains_key(&id)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.state.read().subscribers.len()
    }

    pub(crate) fn clear_subscribers(&self) {
        self.state.write().subscribers.clear();
    }
}

impl std::fmt::Debug for AtomRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("AtomRecord")
            .field("key", &self.key)
            .field("type", &self.type_name)
            .field("version", &state.version)
            .field("subscriber_count", &state.subscribers.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
