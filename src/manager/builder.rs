//! Builder for ConfigManager
//!
//! This module contains [`ConfigManagerBuilder`] which provides a fluent API
//! for creating a [`ConfigManager`](super::ConfigManager).

use crate::env::{EnvSource, ProcessEnv};
use crate::providers::{StringVar, Target};
use crate::settings::{FallbackPolicy, Settings};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use super::ConfigManager;

/// Builder for creating a [`ConfigManager`] with a fluent API.
///
/// # Example
///
/// ```rust,no_run
/// use cfgstack::{ConfigManager, FallbackPolicy, StringVar, Target};
///
/// let manager = ConfigManager::builder()
///     .env_file("/etc/my-app/.env")
///     .string_var(Target::Config, StringVar::yaml("defaults", "log_level: info"))
///     .fallback_policy(FallbackPolicy::Presence)
///     .build();
/// manager.init()?;
/// # Ok::<(), cfgstack::Error>(())
/// ```
pub struct ConfigManagerBuilder {
    env: Arc<dyn EnvSource>,
    env_file: Option<PathBuf>,
    string_vars: HashMap<Target, StringVar>,
    policy: FallbackPolicy,
}

impl ConfigManagerBuilder {
    /// Create a builder reading the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            env: Arc::new(ProcessEnv),
            env_file: None,
            string_vars: HashMap::new(),
            policy: FallbackPolicy::default(),
        }
    }

    /// Read variables from this source instead of the process environment.
    #[must_use]
    pub fn env_source(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    /// Set the dotenv file, taking priority over `ENV_FILE`.
    #[must_use]
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Supply the `local_string_var` document for a target.
    ///
    /// Used only when the recipe selects `local_string_var`; it replaces
    /// anything the environment wires for that target.
    #[must_use]
    pub fn string_var(mut self, target: Target, var: StringVar) -> Self {
        self.string_vars.insert(target, var);
        self
    }

    /// How the `*_or_else` accessors decide a value is missing.
    #[must_use]
    pub fn fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the [`ConfigManager`]. Nothing is loaded until `init`.
    #[must_use]
    pub fn build(self) -> ConfigManager {
        ConfigManager {
            env: self.env,
            env_file: self.env_file,
            string_vars: self.string_vars,
            policy: self.policy,
            settings: RwLock::new(Arc::new(Settings::default().with_fallback_policy(self.policy))),
        }
    }
}

impl Default for ConfigManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
