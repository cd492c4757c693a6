//! # Shared configuration for the environment and its applications.
//!
//! [`Conf`] is an ordered key/value map used for the environment configuration,
//! per-application overrides, and fallback layers. Values are [`serde_json::Value`]
//! so a configuration can be loaded from, or serialized to, any serde format.
//!
//! Layering is explicit: [`Conf::with_fallback`] fills in keys missing from `self`,
//! never overriding them. The environment builds an application's effective
//! configuration as:
//!
//! ```text
//! app overrides  >  environment conf  >  storage defaults  >  fallback conf
//! ```
//!
//! [`StorageConfig`] carries RocksDB-flavoured settings for topology persistent
//! stores and flattens into `rocksdb.*` keys applied as per-application defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered, layerable key/value configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conf {
    entries: BTreeMap<String, Value>,
}

impl Conf {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this configuration with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Sets `key` to `value` in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the string value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Returns the boolean value for `key`, if present and a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.entries.get(key).and_then(Value::as_bool)
    }

    /// Returns the unsigned integer value for `key`, if present and numeric.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.entries.get(key).and_then(Value::as_u64)
    }

    /// Returns the float value for `key`, if present and numeric.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Value::as_f64)
    }

    /// True if `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a new configuration where keys missing from `self` are taken
    /// from `fallback`. Keys present in `self` always win.
    pub fn with_fallback(&self, fallback: &Conf) -> Conf {
        let mut merged = fallback.entries.clone();
        merged.extend(self.entries.clone());
        Conf { entries: merged }
    }

    /// Iterates over keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Conf {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Conf {
            entries: iter.into_iter().collect(),
        }
    }
}

/// RocksDB-like settings applied as defaults to every application's
/// persistent stores.
///
/// Only the settings actually set are flattened into configuration keys, so an
/// application override for any individual `rocksdb.*` key still wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Size of a single memtable, in bytes (`rocksdb.write.buffer.size`).
    pub write_buffer_size: Option<u64>,
    /// Maximum number of memtables (`rocksdb.max.write.buffer.number`).
    pub max_write_buffer_number: Option<u32>,
    /// Shared block cache size, in bytes (`rocksdb.block.cache.size`).
    pub block_cache_size: Option<u64>,
    /// Whether statistics collection is enabled (`rocksdb.stats.enable`).
    pub stats_enable: Option<bool>,
    /// Directory for RocksDB info logs (`rocksdb.log.dir`).
    pub log_dir: Option<String>,
}

impl StorageConfig {
    /// Creates an empty storage configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the memtable size.
    pub fn with_write_buffer_size(mut self, bytes: u64) -> Self {
        self.write_buffer_size = Some(bytes);
        self
    }

    /// Sets the maximum number of memtables.
    pub fn with_max_write_buffer_number(mut self, count: u32) -> Self {
        self.max_write_buffer_number = Some(count);
        self
    }

    /// Sets the shared block cache size.
    pub fn with_block_cache_size(mut self, bytes: u64) -> Self {
        self.block_cache_size = Some(bytes);
        self
    }

    /// Enables or disables statistics collection.
    pub fn with_stats(mut self, enable: bool) -> Self {
        self.stats_enable = Some(enable);
        self
    }

    /// Sets the info-log directory.
    pub fn with_log_dir(mut self, dir: impl Into<String>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Flattens the settings into `rocksdb.*` configuration keys.
    pub fn as_conf(&self) -> Conf {
        let mut conf = Conf::new();
        if let Some(v) = self.write_buffer_size {
            conf.set("rocksdb.write.buffer.size", v);
        }
        if let Some(v) = self.max_write_buffer_number {
            conf.set("rocksdb.max.write.buffer.number", v);
        }
        if let Some(v) = self.block_cache_size {
            conf.set("rocksdb.block.cache.size", v);
        }
        if let Some(v) = self.stats_enable {
            conf.set("rocksdb.stats.enable", v);
        }
        if let Some(v) = &self.log_dir {
            conf.set("rocksdb.log.dir", v.clone());
        }
        conf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_fallback_self_wins() {
        let conf = Conf::new()
            .with("bootstrap.servers", "localhost:9092")
            .with("num.threads", 4);
        let fallback = Conf::new()
            .with("num.threads", 1)
            .with("state.dir", "/tmp/state");

        let merged = conf.with_fallback(&fallback);
        assert_eq!(merged.get_u64("num.threads"), Some(4));
        assert_eq!(merged.get_str("state.dir"), Some("/tmp/state"));
        assert_eq!(merged.get_str("bootstrap.servers"), Some("localhost:9092"));
    }

    #[test]
    fn test_fallback_chain_precedence() {
        let app = Conf::new().with("k", "app");
        let env = Conf::new().with("k", "env").with("only.env", true);
        let merged = app.with_fallback(&env);
        assert_eq!(merged.get_str("k"), Some("app"));
        assert_eq!(merged.get_bool("only.env"), Some(true));
    }

    #[test]
    fn test_storage_config_flattens_only_set_fields() {
        let storage = StorageConfig::new()
            .with_write_buffer_size(64 * 1024 * 1024)
            .with_stats(true);
        let conf = storage.as_conf();

        assert_eq!(conf.get_u64("rocksdb.write.buffer.size"), Some(64 * 1024 * 1024));
        assert_eq!(conf.get_bool("rocksdb.stats.enable"), Some(true));
        assert!(!conf.has("rocksdb.block.cache.size"));
        assert!(!conf.has("rocksdb.log.dir"));
    }

    #[test]
    fn test_typed_accessors() {
        let conf = Conf::new().with("a", "text").with("b", 7).with("c", true);
        assert_eq!(conf.get_str("a"), Some("text"));
        assert_eq!(conf.get_u64("b"), Some(7));
        assert_eq!(conf.get_bool("c"), Some(true));
        assert_eq!(conf.get_str("b"), None);
        assert!(conf.get("missing").is_none());
    }
}
