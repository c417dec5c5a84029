//! The atom store.

use std::any::type_name;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use super::config::StoreConfig;
use super::error::{AtomError, AtomResult};
use super::key::AtomKey;
use super::record::AtomRecord;
use super::subscriber::{Subscriber, Unsubscribe};
use super::{AnyValue, AtomValue};

/// The process default store, backing bindings that have no provider.
static GLOBAL: OnceLock<AtomStore> = OnceLock::new();

/// A keyed collection of atoms.
///
/// `AtomStore` is a handle: clones share the same atoms. An application
/// normally creates one store at its root and hands it to an
/// [`AtomProvider`](crate::bridge::AtomProvider); bindings below the provider
/// then resolve it automatically.
///
/// # Fail-silent operations
///
/// [`write`](Self::write), [`reset`](Self::reset) and
/// [`subscribe`](Self::subscribe) never fail. Against a key with no record
/// they do nothing: a write to a missing atom is treated as a race with a
/// consumer that has already gone away. [`try_write`](Self::try_write) is
/// the strict counterpart.
///
/// # Notification
///
/// A write replaces the value and then calls every subscriber of that atom,
/// in the order they subscribed, before returning. No lock is held while
/// callbacks run, so a callback may freely use the store.
#[derive(Clone)]
pub struct AtomStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    records: DashMap<String, Arc<AtomRecord>>,
    config: StoreConfig,
}

impl AtomStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with the given configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                records: DashMap::with_capacity(config.initial_capacity),
                config,
            }),
        }
    }

    /// The process default store.
    ///
    /// Only the fallback bridge uses this; prefer an explicit store mounted
    /// through a provider.
    pub fn global() -> &'static AtomStore {
        GLOBAL.get_or_init(|| Self::with_config(StoreConfig::default().with_name("global")))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(&self, other: &AtomStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Return the atom's current value, creating it with `initial` if absent.
    ///
    /// Only the first call for a key decides the initial value; later calls
    /// ignore their `initial` argument.
    pub fn get_or_create<T: AtomValue>(&self, key: &AtomKey<T>, initial: T) -> AtomResult<T> {
        let mut created = false;
        let record = {
            let entry = self
                .inner
                .records
                .entry(key.name().to_owned())
                .or_insert_with(|| {
                    created = true;
                    Arc::new(AtomRecord::new(key.name(), initial))
                });
            Arc::clone(entry.value())
        };

        if created {
            trace!(
                store = %self.inner.config.name,
                key = %key,
                ty = type_name::<T>(),
                "atom created"
            );
        }

        downcast(&record, &record.value())
    }

    /// The atom's current value, without creating it.
    pub fn get<T: AtomValue>(&self, key: &AtomKey<T>) -> Option<T> {
        let record = self.lookup(key).ok()?;
        downcast(&record, &record.value()).ok()
    }

    /// The value the atom was created with.
    pub fn initial<T: AtomValue>(&self, key: &AtomKey<T>) -> Option<T> {
        let record = self.lookup(key).ok()?;
        downcast(&record, &record.initial()).ok()
    }

    /// Set the atom's value and notify its subscribers.
    ///
    /// Does nothing if the atom does not exist or holds another type.
    pub fn write<T: AtomValue>(&self, key: &AtomKey<T>, value: T) {
        if let Err(err) = self.try_write(key, value) {
            self.ignored("write", &err);
        }
    }

    /// Like [`write`](Self::write), but reports a missing or mistyped atom.
    pub fn try_write<T: AtomValue>(&self, key: &AtomKey<T>, value: T) -> AtomResult<()> {
        let record = self.lookup(key)?;
        self.publish(&record, Arc::new(value));
        Ok(())
    }

    /// Restore the atom's initial value. This is a write and notifies.
    pub fn reset<T: AtomValue>(&self, key: &AtomKey<T>) {
        match self.lookup(key) {
            Ok(record) => {
                let initial = record.initial();
                self.publish(&record, initial);
            }
            Err(err) => self.ignored("reset", &err),
        }
    }

    /// Register a callback for every future write to the atom.
    ///
    /// Returns an inert handle if the atom does not exist.
    pub fn subscribe<T, F>(&self, key: &AtomKey<T>, callback: F) -> Unsubscribe
    where
        T: AtomValue,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let record = match self.lookup(key) {
            Ok(record) => record,
            Err(err) => {
                self.ignored("subscribe", &err);
                return Unsubscribe::inert();
            }
        };

        let subscriber = Subscriber::new(move |value: &AnyValue| {
            if let Some(value) = value.downcast_ref::<T>() {
                callback(value);
            }
        });
        let id = record.add_subscriber(subscriber);
        trace!(store = %self.inner.config.name, key = %key, ?id, "atom subscriber added");

        Unsubscribe::new(&record, id)
    }

    /// Drop every atom and every subscription.
    ///
    /// Outstanding bindings keep their last snapshot; their writes become
    /// no-ops and do not recreate the atoms.
    pub fn clear_all(&self) {
        let records: Vec<Arc<AtomRecord>> = self
            .inner
            .records
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.inner.records.clear();

        for record in &records {
            record.clear_subscribers();
        }

        debug!(store = %self.inner.config.name, cleared = records.len(), "atom store cleared");
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    /// Names of all atoms, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .records
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of live subscriptions on the atom (0 if it does not exist).
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.record(name)
            .map(|record| record.subscriber_count())
            .unwrap_or(0)
    }

    /// Number of writes the atom has seen since it was created.
    pub fn version(&self, name: &str) -> Option<u64> {
        self.record(name).map(|record| record.version())
    }

    fn record(&self, name: &str) -> Option<Arc<AtomRecord>> {
        self.inner
            .records
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn lookup<T: AtomValue>(&self, key: &AtomKey<T>) -> AtomResult<Arc<AtomRecord>> {
        let record = self.record(key.name()).ok_or_else(|| AtomError::UnknownKey {
            key: key.name().to_string(),
        })?;

        if !record.holds::<T>() {
            return Err(mismatch::<T>(&record));
        }
        Ok(record)
    }

    fn publish(&self, record: &AtomRecord, value: AnyValue) {
        let subscribers = record.replace(Arc::clone(&value));
        trace!(
            store = %self.inner.config.name,
            key = record.key(),
            version = record.version(),
            subscribers = subscribers.len(),
            "atom written"
        );

        for subscriber in &subscribers {
            // An earlier callback in this pass may have removed this one.
            if record.is_subscribed(subscriber.id()) {
                subscriber.notify(&value);
            }
        }
    }

    fn ignored(&self, op: &'static str, err: &AtomError) {
        let store = &self.inner.config.name;
        match err {
            AtomError::UnknownKey { key } if self.inner.config.warn_on_unknown_key => {
                warn!(store = %store, op, key = %key, "atom not found, ignoring");
            }
            AtomError::UnknownKey { key } => {
                debug!(store = %store, op, key = %key, "atom not found, ignoring");
            }
            other => {
                warn!(store = %store, op, error = %other, "ignoring atom operation");
            }
        }
    }
}

fn downcast<T: AtomValue>(record: &AtomRecord, value: &AnyValue) -> AtomResult<T> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| mismatch::<T>(record))
}

fn mismatch<T: AtomValue>(record: &AtomRecord) -> AtomError {
    AtomError::TypeMismatch {
        key: record.key().to_string(),
        expected: type_name::<T>(),
        found: record.type_name(),
    }
}

impl Default for AtomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AtomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomStore")
            .field("name", &self.inner.config.name)
            .field("atoms", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
