//! # cfgstack - layered configuration bootstrap
//!
//! Assembles one read-only settings tree at process start from an ordered mix
//! of providers, driven by environment variables.
//!
//! ## Features
//!
//! - **Providers**: local files, in-process string literals, a Secret Manager
//!   REST endpoint, Consul / etcd3 key-value stores and a relational settings table
//! - **Recipes**: `USE_CONFIG_DYNAMIC_VALUES="local_file,remote_kv:3"` picks
//!   providers and their precedence at deploy time
//! - **Two targets**: configuration and secrets resolve separately; secrets are
//!   merged last and never read from the database
//! - **Integrity**: Secret Manager payloads are CRC32C-checked, mismatches fail the load
//! - **Typed access**: dot-path getters with permissive coercion
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cfgstack::ConfigManager;
//!
//! # fn example() -> cfgstack::Result<()> {
//! // Reads .env (or $ENV_FILE), then the providers it names. With nothing
//! // configured this loads ./config.yaml and ./secrets.yaml.
//! let manager = ConfigManager::new();
//! let summary = manager.init()?;
//! println!("loaded in {} mode", summary.mode);
//!
//! let settings = manager.settings();
//! let url = settings.get_string("database.url");
//! let timeout = settings.get_duration_or_else("http.timeout", std::time::Duration::from_secs(5));
//! # Ok(())
//! # }
//! ```
//!
//! ## Mode selection
//!
//! 1. `CONFIG_REMOTE_ADDRESS` and `SECRET_REMOTE_ADDRESS` both set: the legacy
//!    remote pair, with kinds chosen by `REMOTE_PROVIDER` (default `consul`).
//! 2. `USE_CONFIG_DYNAMIC_VALUES` set: the recipe, wired through
//!    `{CONFIG|SECRET}_{LOCAL|GSM|KV|DB}_*` or `{KIND}_{TARGET}_*` variables.
//! 3. Otherwise the two local files.
//!
//! `USE_CONFIG=local|remote|dynamic` forces one of these.
//!
//! ## Zero-value fallback
//!
//! By default `get_bool_or_else("flag", true)` returns `true` when `flag` is
//! stored as `false`. Use [`FallbackPolicy::Presence`] to fall back only on
//! absent keys.

// Core modules
mod error;
mod format;
mod manager;
mod merge;
mod recipe;
mod resolver;
mod sync;

// Grouped modules
pub mod env;
pub mod providers;
pub mod settings;

// Re-exports from core
pub use error::{Error, Result};
pub use format::ConfigType;
pub use manager::{
    ConfigManager, ConfigManagerBuilder, DEFAULT_ENV_FILE, LoadMode, LoadSummary, LoadedProvider,
};
pub use merge::MergeEngine;
pub use recipe::{Recipe, RecipeEntry};
pub use resolver::{DEFAULT_CONFIG_NAME, DEFAULT_SECRET_NAME, ResolvedProviders, Resolver};

// Re-exports from grouped modules
pub use env::{ConfigMode, EnvSource, EnvVars, LayeredEnv, MapEnv, ProcessEnv};
pub use providers::{
    ConfigSource, Provider, ProviderDescriptor, ProviderKind, SecretKind, SecretSource, StringVar,
    Target,
};
pub use settings::{FallbackPolicy, Settings, SettingsMap};
