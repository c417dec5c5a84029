//! Bridge used when no provider is mounted.

use super::AtomBridge;
use crate::store::AtomStore;

/// Operates directly on the process default store ([`AtomStore::global`]).
#[derive(Debug, Clone, Copy)]
pub struct DefaultBridge {
    store: &'static AtomStore,
}

impl DefaultBridge {
    pub fn new() -> Self {
        Self {
            store: AtomStore::global(),
        }
    }
}

impl Default for DefaultBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomBridge for DefaultBridge {
    fn store(&self) -> &AtomStore {
        self.store
    }
}
