//! Typed atom keys.
//!
//! An [`AtomKey`] pairs the string name of an atom with the type of value it
//! holds. Binding through a key token instead of a bare string means the
//! compiler checks that every call site agrees on the value type; the
//! remaining case (two tokens with the same name and different types) is
//! caught when the second one binds.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// A typed handle naming one atom.
///
/// Keys are cheap to clone. Equality and hashing use the name only.
pub struct AtomKey<T> {
    name: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AtomKey<T> {
    /// Create a key for the atom with the given name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// The atom's name in the store.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for AtomKey<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for AtomKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for AtomKey<T> {}

impl<T> Hash for AtomKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T> fmt::Debug for AtomKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomKey")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> fmt::Display for AtomKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<T> From<&str> for AtomKey<T> {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl<T> From<String> for AtomKey<T> {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_by_name() {
        let a: AtomKey<i32> = AtomKey::new("counter");
        let b: AtomKey<i32> = "counter".into();
        let c: AtomKey<i32> = AtomKey::new("other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.name(), "counter");
        assert_eq!(a.to_string(), "counter");
    }

    #[test]
    fn clone_shares_name() {
        let a: AtomKey<String> = AtomKey::new(String::from("title"));
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(b.name(), "title");
    }
}
