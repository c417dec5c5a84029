//! Atomkit Core
//!
//! This crate provides the core runtime for Atomkit, a minimal atomic state
//! store for UI trees. It implements:
//!
//! - A keyed store of atoms: named, independently observable values
//! - A bridge that makes the store ambient below a provider
//! - Bindings that keep a consumer's snapshot in sync with an atom
//! - Views that rerender a function of a binding on every change
//!
//! The crate is designed to be used both as a native Rust library and as a
//! Python extension module via PyO3 (feature `python`).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `store`: atom records, typed keys and the [`AtomStore`](store::AtomStore)
//! - `bridge`: providers and the strategy bindings use to reach a store
//! - `atom`: bindings, update expressions and views
//!
//! # Example
//!
//! ```rust,ignore
//! use atomkit_core::prelude::*;
//!
//! let provider = AtomProvider::new(AtomStore::new());
//! let _mounted = provider.mount();
//!
//! let a = use_atom("counter", 0)?;
//! let b = use_atom("counter", 0)?;
//!
//! a.set_value(Update::with(|n: &i32| n + 1));
//! assert_eq!(b.value(), 1);
//!
//! b.reset();
//! assert_eq!(a.value(), 0);
//! ```

pub mod atom;
pub mod bridge;
pub mod store;

#[cfg(feature = "python")]
mod python;

pub mod prelude {
    pub use crate::atom::{use_atom, use_atom_in, AtomView, Binding, Update};
    pub use crate::bridge::{AtomBridge, AtomProvider, Bridge};
    pub use crate::store::{AtomError, AtomKey, AtomResult, AtomStore, StoreConfig, Unsubscribe};
}

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyAtomStore>()?;
    m.add_class::<python::PyAtomBinding>()?;
    m.add_class::<python::PySubscription>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
