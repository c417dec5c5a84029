//! Store configuration.

use serde::Deserialize;

use super::error::AtomResult;

/// Settings applied when an [`AtomStore`](super::AtomStore) is created.
///
/// ```rust,ignore
/// let config = StoreConfig::from_json(r#"{ "name": "app", "warn_on_unknown_key": true }"#)?;
/// let store = AtomStore::with_config(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Label attached to every log event from this store.
    pub name: String,

    /// Log ignored writes and subscriptions against missing atoms at `warn`
    /// instead of `debug`. Useful for spotting misspelled keys.
    pub warn_on_unknown_key: bool,

    /// Number of atoms to reserve room for.
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            warn_on_unknown_key: false,
            initial_capacity: 0,
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> AtomResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn warn_on_unknown_key(mut self, warn: bool) -> Self {
        self.warn_on_unknown_key = warn;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AtomError;

    #[test]
    fn empty_json_yields_defaults() {
        let config = StoreConfig::from_json("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn json_overrides_fields() {
        let config = StoreConfig::from_json(
            r#"{ "name": "ui", "warn_on_unknown_key": true, "initial_capacity": 64 }"#,
        )
        .unwrap();

        assert_eq!(config.name, "ui");
        assert!(config.warn_on_unknown_key);
        assert_eq!(config.initial_capacity, 64);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = StoreConfig::from_json(r#"{ "nmae": "typo" }"#).unwrap_err();
        assert!(matches!(err, AtomError::Config(_)));
    }

    #[test]
    fn builder_methods_chain() {
        let config = StoreConfig::default()
            .with_name("editor")
            .warn_on_unknown_key(true)
            .with_initial_capacity(8);

        assert_eq!(config.name, "editor");
        assert!(config.warn_on_unknown_key);
        assert_eq!(config.initial_capacity, 8);
    }
}
