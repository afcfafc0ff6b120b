//! Environment access and the variable catalogue
//!
//! All environment reads go through [`EnvSource`] so resolution can run
//! against a synthetic environment:
//! - [`ProcessEnv`] - the real process environment
//! - [`MapEnv`] - a fixed map, for tests and embedding
//! - [`LayeredEnv`] - a base source with a lower-priority overlay (dotenv values, defaults)

mod vars;

pub use vars::{ConfigMode, EnvVars, RemoteConnection, keys, pattern_key};

use std::collections::HashMap;
use std::sync::Arc;

/// Key-value lookup standing in for the process environment
pub trait EnvSource: Send + Sync {
    /// Look up a variable; `None` when unset
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from `std::env`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed in-memory environment
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    /// Create an empty environment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable (builder style)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Set a variable
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// A base source whose unset variables fall through to an overlay.
///
/// Mirrors dotenv semantics: values already present in the base are never
/// overridden by the overlay.
#[derive(Clone)]
pub struct LayeredEnv {
    base: Arc<dyn EnvSource>,
    overlay: HashMap<String, String>,
}

impl LayeredEnv {
    /// Wrap a base source with an empty overlay
    pub fn new(base: Arc<dyn EnvSource>) -> Self {
        Self {
            base,
            overlay: HashMap::new(),
        }
    }

    /// Add overlay entries; later calls win over earlier ones
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overlay
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Add an overlay entry only if neither layer has it yet
    pub fn seed(&mut self, key: &str, value: &str) {
        if self.var(key).is_none() {
            self.overlay.insert(key.to_string(), value.to_string());
        }
    }

    /// Number of overlay entries
    #[must_use]
    pub fn overlay_len(&self) -> usize {
        self.overlay.len()
    }
}

impl EnvSource for LayeredEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.base
            .var(key)
            .or_else(|| self.overlay.get(key).cloned())
    }
}

// =============================================================================
// Tests
// =============================================================================
