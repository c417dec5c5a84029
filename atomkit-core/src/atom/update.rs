//! Update expressions accepted by [`Binding::set_value`](super::Binding::set_value).

use std::fmt;

/// Either a new value or a function of the previous one.
///
/// Plain values convert with `From`, so `binding.set_value(5)` works; use
/// [`Update::with`] for a functional update:
///
/// ```rust,ignore
/// count.set_value(Update::with(|n: &i32| n + 1));
/// ```
pub enum Update<'a, T> {
    Value(T),
    With(Box<dyn FnOnce(&T) -> T + 'a>),
}

impl<'a, T> Update<'a, T> {
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + 'a,
    {
        Update::With(Box::new(f))
    }

    pub fn is_functional(&self) -> bool {
        matches!(self, Update::With(_))
    }

    /// Compute the value to write.
    ///
    /// `current` is only consulted for functional updates. Returns `None` if
    /// a functional update has no current value to start from.
    pub(crate) fn resolve(self, current: impl FnOnce() -> Option<T>) -> Option<T> {
        match self {
            Update::Value(value) => Some(value),
            Update::With(f) => current().map(|previous| f(&previous)),
        }
    }
}

impl<'a, T> From<T> for Update<'a, T> {
    fn from(value: T) -> Self {
        Update::Value(value)
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for Update<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Update::With(_) => f.write_str("With(..)"),
        }
    }
}
