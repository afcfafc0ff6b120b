//! The merged, read-only settings tree and its typed accessors
//!
//! Keys are dot paths into nested maps (`database.pool.size`). Each segment is
//! matched exactly first and case-insensitively second.
//!
//! Every getter has an `*_or_else` counterpart. Under the default
//! [`FallbackPolicy::ZeroValue`] the fallback is returned whenever the stored
//! value equals the type's zero value, not only when the key is absent:
//!
//! ```rust
//! use cfgstack::{FallbackPolicy, Settings};
//! use serde_json::json;
//!
//! let tree = json!({"feature": {"enabled": false}});
//! let settings = Settings::from_value(tree.clone());
//! assert!(settings.get_bool_or_else("feature.enabled", true));
//!
//! let settings = Settings::from_value(tree).with_fallback_policy(FallbackPolicy::Presence);
//! assert!(!settings.get_bool_or_else("feature.enabled", true));
//! ```

pub(crate) mod cast;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;

/// Flat-at-the-top, nested-below settings map produced by every provider
pub type SettingsMap = serde_json::Map<String, Value>;

/// When `*_or_else` accessors use the caller's fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Fall back when the value is absent or equals the type's zero value
    /// (empty string, `0`, `false`, empty collection). An explicit `false`
    /// is indistinguishable from unset.
    #[default]
    ZeroValue,
    /// Fall back only when the key is absent or cannot be coerced
    Presence,
}

/// Merged settings tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    tree: SettingsMap,
    policy: FallbackPolicy,
}

impl Settings {
    /// Wrap an already-merged tree
    #[must_use]
    pub fn new(tree: SettingsMap) -> Self {
        Self {
            tree,
            policy: FallbackPolicy::default(),
        }
    }

    /// Build from a JSON value; non-map values give an empty tree
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    /// Select the `*_or_else` fallback policy
    #[must_use]
    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.policy
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Raw value at a dot path
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = lookup(&self.tree, key) {
            return Some(value);
        }

        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = lookup(&self.tree, first)?;
        for segment in segments {
            current = lookup(current.as_object()?, segment)?;
        }
        Some(current)
    }

    /// Raw value or a fallback (zero-value policy treats `null` as unset)
    #[must_use]
    pub fn get_or_else(&self, key: &str, fallback: Value) -> Value {
        match (self.get(key), self.policy) {
            (Some(Value::Null) | None, _) => fallback,
            (Some(value), FallbackPolicy::Presence) => value.clone(),
            (Some(value), FallbackPolicy::ZeroValue) if is_zero(value) => fallback,
            (Some(value), FallbackPolicy::ZeroValue) => value.clone(),
        }
    }

    /// Whether a key is present (an explicit `null` counts as unset)
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// The whole merged tree
    #[must_use]
    pub fn all_settings(&self) -> &SettingsMap {
        &self.tree
    }

    /// Top-level keys of the merged tree
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tree.keys().map(String::as_str)
    }

    // -------------------------------------------------------------------------
    // Typed getters
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.cast(key, cast::to_string).unwrap_or_default()
    }

    #[must_use]
    pub fn get_string_or_else(&self, key: &str, fallback: impl Into<String>) -> String {
        self.or_else(key, cast::to_string, fallback.into())
    }

    #[must_use]
    pub fn get_int(&self, key: &str) -> i64 {
        self.cast(key, cast::to_i64).unwrap_or_default()
    }

    #[must_use]
    pub fn get_int_or_else(&self, key: &str, fallback: i64) -> i64 {
        self.or_else(key, cast::to_i64, fallback)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.cast(key, cast::to_bool).unwrap_or_default()
    }

    #[must_use]
    pub fn get_bool_or_else(&self, key: &str, fallback: bool) -> bool {
        self.or_else(key, cast::to_bool, fallback)
    }

    #[must_use]
    pub fn get_float64(&self, key: &str) -> f64 {
        self.cast(key, cast::to_f64).unwrap_or_default()
    }

    #[must_use]
    pub fn get_float64_or_else(&self, key: &str, fallback: f64) -> f64 {
        self.or_else(key, cast::to_f64, fallback)
    }

    #[must_use]
    pub fn get_duration(&self, key: &str) -> Duration {
        self.cast(key, cast::to_duration).unwrap_or_default()
    }

    #[must_use]
    pub fn get_duration_or_else(&self, key: &str, fallback: Duration) -> Duration {
        self.or_else(key, cast::to_duration, fallback)
    }

    /// Time value; `None` plays the role of the zero time
    #[must_use]
    pub fn get_time(&self, key: &str) -> Option<OffsetDateTime> {
        self.cast(key, cast::to_time)
    }

    #[must_use]
    pub fn get_time_or_else(&self, key: &str, fallback: OffsetDateTime) -> OffsetDateTime {
        self.get_time(key).unwrap_or(fallback)
    }

    #[must_use]
    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.cast(key, cast::to_string_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn get_string_slice_or_else(&self, key: &str, fallback: Vec<String>) -> Vec<String> {
        self.or_else(key, cast::to_string_slice, fallback)
    }

    #[must_use]
    pub fn get_string_map(&self, key: &str) -> SettingsMap {
        self.cast(key, cast::to_string_map).unwrap_or_default()
    }

    #[must_use]
    pub fn get_string_map_or_else(&self, key: &str, fallback: SettingsMap) -> SettingsMap {
        self.or_else(key, cast::to_string_map, fallback)
    }

    #[must_use]
    pub fn get_string_map_string(&self, key: &str) -> HashMap<String, String> {
        self.cast(key, cast::to_string_map_string).unwrap_or_default()
    }

    #[must_use]
    pub fn get_string_map_string_or_else(
        &self,
        key: &str,
        fallback: HashMap<String, String>,
    ) -> HashMap<String, String> {
        self.or_else(key, cast::to_string_map_string, fallback)
    }

    #[must_use]
    pub fn get_map_array(&self, key: &str) -> Vec<SettingsMap> {
        self.cast(key, cast::to_map_array).unwrap_or_default()
    }

    #[must_use]
    pub fn get_map_array_or_else(&self, key: &str, fallback: Vec<SettingsMap>) -> Vec<SettingsMap> {
        self.or_else(key, cast::to_map_array, fallback)
    }

    // -------------------------------------------------------------------------
    // Deserialization
    // -------------------------------------------------------------------------

    /// Deserialize the whole tree into `T`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unmarshal`](crate::Error::Unmarshal) if the tree doesn't fit `T`.
    pub fn unmarshal_to<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.tree.clone()))?)
    }

    /// Deserialize the subtree at `key` into `T` (`null` when absent)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unmarshal`](crate::Error::Unmarshal) if the subtree doesn't fit `T`.
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get(key).cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn cast<T>(&self, key: &str, cast: impl Fn(&Value) -> Option<T>) -> Option<T> {
        self.get(key).and_then(cast)
    }

    fn or_else<T: PartialEq + Default>(
        &self,
        key: &str,
        cast: impl Fn(&Value) -> Option<T>,
        fallback: T,
    ) -> T {
        let value = self.cast(key, cast);
        match self.policy {
            FallbackPolicy::ZeroValue => value.filter(|v| *v != T::default()).unwrap_or(fallback),
            FallbackPolicy::Presence => value.unwrap_or(fallback),
        }
    }
}

fn lookup<'a>(map: &'a SettingsMap, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

// =============================================================================
// Tests
// =============================================================================
