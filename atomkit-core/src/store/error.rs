//! Error types for the atom store.

use thiserror::Error;

/// Errors reported by the strict parts of the store API.
///
/// The fail-silent operations (`write`, `subscribe`, `set_value`, `reset`)
/// never produce these; they log and return instead.
#[derive(Debug, Error)]
pub enum AtomError {
    /// No record exists for the key.
    #[error("atom not found: {key}")]
    UnknownKey { key: String },

    /// The record exists but holds a value of another type.
    #[error("atom `{key}` holds `{found}`, not `{expected}`")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A store configuration could not be parsed.
    #[error("invalid store config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type AtomResult<T> = Result<T, AtomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_message_names_both_types() {
        let err = AtomError::TypeMismatch {
            key: "counter".to_string(),
            expected: "i32",
            found: "alloc::string::String",
        };
        assert_eq!(
            err.to_string(),
            "atom `counter` holds `alloc::string::String`, not `i32`"
        );
    }
}
