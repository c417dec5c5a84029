//! Atom Store
//!
//! The store is the single source of truth for every atom in an application.
//! Each atom is a named record holding a current value, the value it was
//! created with, and the set of callbacks observing it.
//!
//! # Lifecycle
//!
//! Records are created lazily, the first time a key is bound
//! ([`AtomStore::get_or_create`]). They live as long as the store, unless
//! [`AtomStore::clear_all`] drops them all at once (intended for test
//! isolation).
//!
//! # Typing
//!
//! Keys are typed tokens ([`AtomKey<T>`]). Values are stored type-erased and
//! checked against the type the record was created with, so binding the same
//! name with two different types is reported instead of silently confusing
//! the two call sites.
//!
//! # Thread Safety
//!
//! The key map is a `DashMap` and each record guards its state with a
//! `parking_lot` lock. Locks are never held while subscriber callbacks run.

mod config;
mod error;
mod key;
mod record;
mod registry;
mod subscriber;

use std::any::Any;
use std::sync::Arc;

pub use config::StoreConfig;
pub use error::{AtomError, AtomResult};
pub use key::AtomKey;
pub use registry::AtomStore;
pub use subscriber::{SubscriberId, Unsubscribe};

/// Values that can live in an atom.
///
/// Implemented for every `Clone + Send + Sync + 'static` type.
pub trait AtomValue: Clone + Send + Sync + 'static {}

impl<T> AtomValue for T where T: Clone + Send + Sync + 'static {}

/// A type-erased atom value.
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;
