//! Configuration providers
//!
//! Configuration is a flat key/value space with dotted keys such as
//! `redis.main.host`. Providers answer `get_string`; typed getters with
//! defaults are provided on top of it by the `ConfigSource` trait.
//!
//! # Example
//!
//! ```
//! use kvpool_core::settings::{ConfigSource, TomlConfig};
//!
//! let config = TomlConfig::from_str(r#"
//!     [redis]
//!     names = "main"
//!
//!     [redis.main]
//!     port = 6380
//! "#).unwrap();
//!
//! assert_eq!(config.get_string_or("redis.names", "main"), "main");
//! assert_eq!(config.get_parsed_or("redis.main.port", 6379u16).unwrap(), 6380);
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::{KvError, Result};

#[cfg(test)]
mod tests;

/// A key/value configuration source
pub trait ConfigSource: Send + Sync {
    /// Look up the raw string value of a key
    fn get_string(&self, key: &str) -> Option<String>;

    /// Look up a string value, falling back to `default`
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// Look up a value and parse it, falling back to `default` when missing.
    ///
    /// A present but unparsable value is a configuration error rather than a
    /// silent fallback.
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
        Self: Sized,
    {
        parse_value(self.get_string(key), key, default)
    }

    /// Look up a boolean (`true`/`false`/`1`/`0`/`yes`/`no`)
    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get_string(key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(KvError::Configuration(format!(
                    "invalid boolean for '{}': {}",
                    key, raw
                ))),
            },
        }
    }
}

/// Parse an optional raw value, used by the typed getters
pub fn parse_value<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            KvError::Configuration(format!("invalid value for '{}': {} ({})", key, raw, e))
        }),
    }
}

impl<C: ConfigSource + ?Sized> ConfigSource for Arc<C> {
    fn get_string(&self, key: &str) -> Option<String> {
        (**self).get_string(key)
    }
}

impl<C: ConfigSource + ?Sized> ConfigSource for &C {
    fn get_string(&self, key: &str) -> Option<String> {
        (**self).get_string(key)
    }
}

/// In-memory configuration
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: BTreeMap<String, String>,
}

impl MapConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Set a value in place
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
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

impl ConfigSource for MapConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Configuration read from a TOML document, flattened to dotted keys
#[derive(Debug, Clone, Default)]
pub struct TomlConfig {
    values: MapConfig,
}

impl TomlConfig {
    /// Parse a TOML document
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Self> {
        let table: toml::Table = source
            .parse()
            .map_err(|e: toml::de::Error| KvError::Configuration(e.to_string()))?;

        let mut values = MapConfig::new();
        flatten_table("", &table, &mut values);
        Ok(Self { values })
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading configuration file");
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content).map_err(|e| match e {
            KvError::Configuration(msg) => {
                KvError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Number of flattened keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the document had no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut MapConfig) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            toml::Value::Table(nested) => flatten_table(&full_key, nested, out),
            toml::Value::String(s) => out.set(&full_key, s.clone()),
            // Arrays become comma-separated lists, which is what list-valued
            // keys such as `redis.names` expect.
            toml::Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|item| match item {
                        toml::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                out.set(&full_key, joined);
            }
            other => out.set(&full_key, other.to_string()),
        }
    }
}

impl ConfigSource for TomlConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get_string(key)
    }
}

/// Configuration from environment variables
///
/// A key such as `redis.main.host` is looked up as `<PREFIX>_REDIS_MAIN_HOST`.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    /// Create an environment source with the given variable prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name for a configuration key
    pub fn variable_name(&self, key: &str) -> String {
        let suffix: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();

        if self.prefix.is_empty() {
            suffix
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl ConfigSource for EnvConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// Ordered list of configuration sources; the first source with a value wins
#[derive(Clone, Default)]
pub struct LayeredConfig {
    layers: Vec<Arc<dyn ConfigSource>>,
}

impl LayeredConfig {
    /// Create an empty layered configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lower-priority layer
    pub fn with_layer<C: ConfigSource + 'static>(mut self, layer: C) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layers were added
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Debug for LayeredConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredConfig")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl ConfigSource for LayeredConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get_string(key))
    }
}
