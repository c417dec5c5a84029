//! Binding Implementation
//!
//! A Binding adapts one atom to one consumer. It keeps a local snapshot of
//! the atom's value that follows every write made through any binding, and
//! writes through to the store.
//!
//! # How Bindings Work
//!
//! 1. On creation the atom is fetched, or created with the given initial
//!    value if this is the first binding for the key.
//!
//! 2. The snapshot is seeded from the atom's current value, and the binding
//!    mounts: it subscribes to the atom through its bridge.
//!
//! 3. Every write to the atom overwrites the snapshot.
//!
//! 4. Unmounting (explicitly or by dropping the binding) removes the
//!    subscription. The snapshot then stops following the atom.
//!
//! # Stale Reads
//!
//! Functional updates are applied to the atom's value in the store, not to
//! the snapshot, so several updates issued back to back compose correctly.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::update::Update;
use crate::bridge::{AtomBridge, Bridge};
use crate::store::{AtomKey, AtomResult, AtomStore, AtomValue, Unsubscribe};

/// Bind to an atom through the ambient bridge.
///
/// Resolves the innermost mounted [`AtomProvider`](crate::bridge::AtomProvider),
/// or the process default store if there is none.
///
/// # Example
///
/// ```rust,ignore
/// let count = use_atom("count", 0)?;
/// count.set_value(Update::with(|n: &i32| n + 1));
/// assert_eq!(count.value(), 1);
/// ```
pub fn use_atom<T: AtomValue>(key: impl Into<AtomKey<T>>, initial: T) -> AtomResult<Binding<T>> {
    use_atom_in(Bridge::current(), key, initial)
}

/// Bind to an atom through an explicit bridge or store.
pub fn use_atom_in<T: AtomValue>(
    bridge: impl Into<Bridge>,
    key: impl Into<AtomKey<T>>,
    initial: T,
) -> AtomResult<Binding<T>> {
    Binding::bind(bridge.into(), key.into(), initial)
}

/// The consumer-local half of a binding.
///
/// Shared with the store subscription through a weak reference only.
struct LocalState<T> {
    value: RwLock<T>,
    /// Notifications received since the binding was created.
    updates: AtomicU64,
}

impl<T> LocalState<T> {
    fn apply(&self, value: T) {
        *self.value.write() = value;
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// A live association between one consumer and one atom.
pub struct Binding<T>
where
    T: AtomValue,
{
    key: AtomKey<T>,
    bridge: Bridge,
    local: Arc<LocalState<T>>,
    /// `Some` while mounted.
    subscription: Mutex<Option<Unsubscribe>>,
}

impl<T> Binding<T>
where
    T: AtomValue,
{
    fn bind(bridge: Bridge, key: AtomKey<T>, initial: T) -> AtomResult<Self> {
        let current = bridge.ensure_atom(&key, initial)?;

        let binding = Self {
            key,
            bridge,
            local: Arc::new(LocalState {
                value: RwLock::new(current),
                updates: AtomicU64::new(0),
            }),
            subscription: Mutex::new(None),
        };
        binding.mount();

        Ok(binding)
    }

    /// Subscribe to the atom. Does nothing if already mounted.
    ///
    /// Remounting resynchronizes the snapshot with the atom first.
    pub fn mount(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.as_ref().is_some_and(Unsubscribe::is_active) {
            return;
        }

        if let Some(current) = self.bridge.read_atom(&self.key) {
            *self.local.value.write() = current;
        }

        let local = Arc::downgrade(&self.local);
        let handle = self.bridge.subscribe_to_atom(&self.key, move |value: &T| {
            if let Some(local) = local.upgrade() {
                local.apply(value.clone());
            }
        });

        if handle.is_active() {
            *subscription = Some(handle);
            trace!(key = %self.key, provided = self.bridge.is_provided(), "atom binding mounted");
        } else {
            *subscription = None;
            debug!(key = %self.key, "atom missing, binding left unmounted");
        }
    }

    /// Remove the subscription. The snapshot keeps its last value.
    pub fn unmount(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            trace!(key = %self.key, "atom binding unmounted");
        }
    }

    /// Whether the binding is subscribed. False once the atom is cleared.
    pub fn is_mounted(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(Unsubscribe::is_active)
    }

    /// The local snapshot of the atom's value.
    pub fn value(&self) -> T {
        self.local.value.read().clone()
    }

    /// Run `f` on the local snapshot. `f` may write to the atom.
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.local.value.read().clone();
        f(&value)
    }

    /// The atom's value in the store, bypassing the snapshot.
    ///
    /// `None` once the atom has been cleared.
    pub fn current(&self) -> Option<T> {
        self.bridge.read_atom(&self.key)
    }

    /// Write a new value, or a function of the current one, to the atom.
    ///
    /// Every mounted binding of the atom sees the result before this returns.
    /// If the atom has been cleared this does nothing.
    pub fn set_value<'a>(&self, update: impl Into<Update<'a, T>>) {
        let update: Update<'a, T> = update.into();
        match update.resolve(|| self.bridge.read_atom(&self.key)) {
            Some(next) => self.bridge.update_atom(&self.key, next),
            None => debug!(key = %self.key, "atom missing, functional update ignored"),
        }
    }

    /// Shorthand for `set_value(Update::with(f))`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.set_value(Update::with(f));
    }

    /// Restore the atom's initial value. Notifies like any other write.
    pub fn reset(&self) {
        self.bridge.reset_atom(&self.key);
    }

    /// Observe writes to the atom, independently of the snapshot.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.bridge.subscribe_to_atom(&self.key, callback)
    }

    pub fn key(&self) -> &AtomKey<T> {
        &self.key
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn store(&self) -> &AtomStore {
        self.bridge.store()
    }

    /// Number of notifications the snapshot has received.
    pub fn update_count(&self) -> u64 {
        self.local.updates.load(Ordering::SeqCst)
    }
}

impl<T> Debug for Binding<T>
where
    T: AtomValue + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key.name())
            .field("value", &*self.local.value.read())
            .field("mounted", &self.is_mounted())
            .field("provided", &self.bridge.is_provided())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::AtomProvider;
    use crate::store::AtomError;

    #[test]
    fn binding_seeds_from_initial_value() {
        let store = AtomStore::new();
        let count = use_atom_in(&store, "count", 0).unwrap();

        assert_eq!(count.value(), 0);
        assert!(count.is_mounted());
        assert_eq!(store.subscriber_count("count"), 1);
    }

    #[test]
    fn second_binding_sees_shared_value() {
        let store = AtomStore::new();
        let a = use_atom_in(&store, "count", 0).unwrap();
        a.set_value(3);

        let b = use_atom_in(&store, "count", 100).unwrap();
        assert_eq!(b.value(), 3);
    }

    #[test]
    fn functional_update_reads_store_not_snapshot() {
        let store = AtomStore::new();
        let count = use_atom_in(&store, "count", 0).unwrap();
        count.unmount();

        // The snapshot is frozen at 0; the store moves on.
        store.write(&AtomKey::new("count"), 10);
        count.update(|n| n + 1);

        assert_eq!(store.get(&AtomKey::<i32>::new("count")), Some(11));
        assert_eq!(count.value(), 0);
    }

    #[test]
    fn unmount_stops_following_and_mount_resyncs() {
        let store = AtomStore::new();
        let a = use_atom_in(&store, "count", 0).unwrap();
        let b = use_atom_in(&store, "count", 0).unwrap();

        a.unmount();
        assert!(!a.is_mounted());
        b.set_value(4);
        assert_eq!(a.value(), 0);
        assert_eq!(b.value(), 4);

        a.mount();
        assert_eq!(a.value(), 4);
        b.set_value(5);
        assert_eq!(a.value(), 5);
    }

    #[test]
    fn dropping_binding_unsubscribes() {
        let store = AtomStore::new();
        let binding = use_atom_in(&store, "flag", false).unwrap();
        assert_eq!(store.subscriber_count("flag"), 1);

        drop(binding);
        assert_eq!(store.subscriber_count("flag"), 0);
    }

    #[test]
    fn update_count_tracks_notifications() {
        let store = AtomStore::new();
        let count = use_atom_in(&store, "count", 0).unwrap();

        count.set_value(1);
        count.set_value(1);
        count.reset();
        assert_eq!(count.update_count(), 3);
    }

    #[test]
    fn mismatched_type_is_rejected() {
        let store = AtomStore::new();
        let _count = use_atom_in(&store, "count", 0_i32).unwrap();

        let err = use_atom_in(&store, "count", String::from("zero")).unwrap_err();
        assert!(matches!(err, AtomError::TypeMismatch { .. }));
    }

    #[test]
    fn use_atom_resolves_mounted_provider() {
        let provider = AtomProvider::new(AtomStore::new());
        let _mounted = provider.mount();

        let binding = use_atom("provided-only", 1_u8).unwrap();
        assert!(binding.bridge().is_provided());
        assert!(binding.store().ptr_eq(provider.store()));
        assert!(!AtomStore::global().contains("provided-only"));
    }

    #[test]
    fn with_value_reads_snapshot() {
        let store = AtomStore::new();
        let names = use_atom_in(&store, "names", vec!["a".to_string()]).unwrap();
        assert_eq!(names.with_value(|v| v.len()), 1);
    }

    #[test]
    fn with_value_closure_may_write() {
        let store = AtomStore::new();
        let count = use_atom_in(&store, "count", 1).unwrap();

        count.with_value(|n| count.set_value(n + 1));
        assert_eq!(count.value(), 2);
        assert_eq!(count.update_count(), 1);
    }

    #[test]
    fn cleared_atom_leaves_binding_unmounted() {
        let store = AtomStore::new();
        let count = use_atom_in(&store, "count", 0).unwrap();

        store.clear_all();
        assert!(!count.is_mounted());

        // Nothing to subscribe to, so mounting again stays unmounted.
        count.mount();
        assert!(!count.is_mounted());
        count.unmount();

        // Once the atom exists again, mount picks it up.
        store.get_or_create(&AtomKey::new("count"), 5).unwrap();
        count.mount();
        assert!(count.is_mounted());
        assert_eq!(count.value(), 5);
    }
}
