//! Atom Provider
//!
//! A provider makes one [`AtomStore`] ambient for everything that runs
//! underneath it, so bindings deep in a component tree find the store
//! without it being threaded through every call.
//!
//! # Implementation
//!
//! We use a thread-local stack of mounted providers. Mounting pushes the
//! provider's store; dropping the returned guard pops it. Nested providers
//! shadow outer ones for as long as they are mounted.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use super::AtomBridge;
use crate::store::AtomStore;

thread_local! {
    static PROVIDER_STACK: RefCell<Vec<ProviderEntry>> = RefCell::new(Vec::new());
}

#[derive(Debug, Clone)]
struct ProviderEntry {
    provider_id: ProviderId,
    store: AtomStore,
}

/// Unique identifier for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

impl ProviderId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

/// Supplies an [`AtomStore`] to every binding created while it is mounted.
///
/// # Example
///
/// ```rust,ignore
/// let provider = AtomProvider::new(AtomStore::new());
/// let _mounted = provider.mount();
///
/// // Resolves the provider's store, not the global one.
/// let count = use_atom("count", 0)?;
/// ```
#[derive(Debug, Clone)]
pub struct AtomProvider {
    id: ProviderId,
    store: AtomStore,
}

impl AtomProvider {
    pub fn new(store: AtomStore) -> Self {
        Self {
            id: ProviderId::new(),
            store,
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn store(&self) -> &AtomStore {
        &self.store
    }

    /// Make this provider's store ambient on the current thread.
    ///
    /// The provider stays mounted until the returned guard is dropped.
    pub fn mount(&self) -> ProviderGuard {
        PROVIDER_STACK.with(|stack| {
            stack.borrow_mut().push(ProviderEntry {
                provider_id: self.id,
                store: self.store.clone(),
            });
        });
        tracing::trace!(provider = ?self.id, store = %self.store.config().name, "atom provider mounted");

        ProviderGuard {
            provider_id: self.id,
            _not_send: PhantomData,
        }
    }

    /// Run `f` with this provider mounted.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let _mounted = self.mount();
        f()
    }

    /// Check if any provider is mounted on the current thread.
    pub fn is_active() -> bool {
        PROVIDER_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The innermost mounted provider on the current thread, if any.
    pub fn current() -> Option<AtomProvider> {
        PROVIDER_STACK.with(|stack| {
            stack.borrow().last().map(|entry| AtomProvider {
                id: entry.provider_id,
                store: entry.store.clone(),
            })
        })
    }
}

/// Guard that unmounts its provider when dropped.
///
/// Tied to the thread that mounted it.
pub struct ProviderGuard {
    provider_id: ProviderId,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ProviderGuard {
    fn drop(&mut self) {
        PROVIDER_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let position = stack
                .iter()
                .rposition(|entry| entry.provider_id == self.provider_id);

            debug_assert_eq!(
                position.map(|p| p + 1),
                Some(stack.len()),
                "AtomProvider {:?} unmounted out of order",
                self.provider_id
            );

            if let Some(position) = position {
                stack.remove(position);
            }
        });
    }
}

/// Bridge backed by a mounted provider's store.
#[derive(Debug, Clone)]
pub struct ProvidedBridge {
    provider: AtomProvider,
}

impl ProvidedBridge {
    /// Bridge to an explicit store, without mounting anything.
    pub fn new(store: AtomStore) -> Self {
        Self {
            provider: AtomProvider::new(store),
        }
    }

    pub fn provider(&self) -> &AtomProvider {
        &self.provider
    }
}

impl From<AtomProvider> for ProvidedBridge {
    fn from(provider: AtomProvider) -> Self {
        Self { provider }
    }
}

impl AtomBridge for ProvidedBridge {
    fn store(&self) -> &AtomStore {
        &self.provider.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_is_ambient_while_mounted() {
        let provider = AtomProvider::new(AtomStore::new());

        assert!(!AtomProvider::is_active());
        assert!(AtomProvider::current().is_none());

        {
            let _mounted = provider.mount();

            assert!(AtomProvider::is_active());
            let current = AtomProvider::current().unwrap();
            assert_eq!(current.id(), provider.id());
            assert!(current.store().ptr_eq(provider.store()));
        }

        // Unmounted after drop
        assert!(!AtomProvider::is_active());
        assert!(AtomProvider::current().is_none());
    }

    #[test]
    fn nested_providers() {
        let outer = AtomProvider::new(AtomStore::new());
        let inner = AtomProvider::new(AtomStore::new());

        {
            let _outer = outer.mount();
            assert_eq!(AtomProvider::current().map(|p| p.id()), Some(outer.id()));

            {
                let _inner = inner.mount();
                assert_eq!(AtomProvider::current().map(|p| p.id()), Some(inner.id()));
            }

            // After inner provider drops, outer should be current
            assert_eq!(AtomProvider::current().map(|p| p.id()), Some(outer.id()));
        }

        assert!(AtomProvider::current().is_none());
    }

    #[test]
    fn scope_returns_closure_result() {
        let provider = AtomProvider::new(AtomStore::new());
        let id = provider.scope(|| AtomProvider::current().map(|p| p.id()));
        assert_eq!(id, Some(provider.id()));
        assert!(!AtomProvider::is_active());
    }

    #[test]
    fn provided_bridge_uses_provider_store() {
        let store = AtomStore::new();
        let bridge = ProvidedBridge::new(store.clone());
        assert!(bridge.store().ptr_eq(&store));
        assert!(bridge.provider().store().ptr_eq(&store));
    }
}
