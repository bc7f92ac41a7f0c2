//! Configuration scope handed to factories at startup.

use std::collections::HashMap;

/// Configuration interface for factory initialization.
///
/// Keys are scoped to one provider by the host (e.g. the `excludes` key of
/// the `jms` events listener).
pub trait FactoryConfig: Send + Sync {
    /// Gets a string configuration value.
    fn get(&self, key: &str) -> Option<&str>;

    /// Gets a list value, written as comma-separated items.
    ///
    /// Items are trimmed and empty items are skipped. Returns `None` when the
    /// key is absent.
    fn get_array(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

/// A [`FactoryConfig`] backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    /// Creates an empty configuration scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key-value pair.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl FactoryConfig for MapConfig {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
