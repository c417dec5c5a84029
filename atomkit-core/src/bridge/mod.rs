//! Context Bridge
//!
//! The bridge is how a binding reaches the store. It exposes the two store
//! operations a consumer needs, `update_atom` and `subscribe_to_atom`, plus
//! the reads a binding performs when it mounts.
//!
//! There are two strategies:
//!
//! - [`ProvidedBridge`]: the store of the innermost mounted [`AtomProvider`].
//! - [`DefaultBridge`]: the process default store, used when no provider is
//!   mounted.
//!
//! [`Bridge::current`] picks one of the two once, when a binding is created.
//! Both delegate to the same [`AtomStore`] operations, so a binding behaves
//! identically whichever strategy it ends up with.

mod fallback;
mod provider;

pub use fallback::DefaultBridge;
pub use provider::{AtomProvider, ProvidedBridge, ProviderGuard, ProviderId};

use crate::store::{AtomKey, AtomResult, AtomStore, AtomValue, Unsubscribe};

/// Strategy through which bindings read and write atoms.
pub trait AtomBridge {
    /// The store this bridge operates on.
    fn store(&self) -> &AtomStore;

    /// Write a new value to the atom and notify its subscribers.
    fn update_atom<T: AtomValue>(&self, key: &AtomKey<T>, value: T) {
        self.store().write(key, value);
    }

    /// Observe writes to the atom.
    fn subscribe_to_atom<T, F>(&self, key: &AtomKey<T>, callback: F) -> Unsubscribe
    where
        T: AtomValue,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.store().subscribe(key, callback)
    }

    /// Get-or-create the atom and return its current value.
    fn ensure_atom<T: AtomValue>(&self, key: &AtomKey<T>, initial: T) -> AtomResult<T> {
        self.store().get_or_create(key, initial)
    }

    fn read_atom<T: AtomValue>(&self, key: &AtomKey<T>) -> Option<T> {
        self.store().get(key)
    }

    fn reset_atom<T: AtomValue>(&self, key: &AtomKey<T>) {
        self.store().reset(key);
    }
}

/// The strategy chosen for one binding.
#[derive(Debug, Clone)]
pub enum Bridge {
    Provided(ProvidedBridge),
    Default(DefaultBridge),
}

impl Bridge {
    /// Resolve the bridge for the current thread: the innermost mounted
    /// provider, or the default bridge if there is none.
    pub fn current() -> Self {
        match AtomProvider::current() {
            Some(provider) => Bridge::Provided(provider.into()),
            None => Bridge::Default(DefaultBridge::new()),
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Bridge::Provided(_))
    }
}

impl AtomBridge for Bridge {
    fn store(&self) -> &AtomStore {
        match self {
            Bridge::Provided(bridge) => bridge.store(),
            Bridge::Default(bridge) => bridge.store(),
        }
    }
}

impl From<AtomStore> for Bridge {
    fn from(store: AtomStore) -> Self {
        Bridge::Provided(ProvidedBridge::new(store))
    }
}

impl From<&AtomStore> for Bridge {
    fn from(store: &AtomStore) -> Self {
        store.clone().into()
    }
}

impl From<AtomProvider> for Bridge {
    fn from(provider: AtomProvider) -> Self {
        Bridge::Provided(provider.into())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
