//! Bootstrap orchestrator
//!
//! This module contains [`ConfigManager`], the entry point that loads the
//! dotenv file, decides how to resolve providers and holds the merged
//! [`Settings`].

mod builder;

pub use builder::ConfigManagerBuilder;

use crate::env::{ConfigMode, EnvSource, EnvVars, LayeredEnv, keys};
use crate::error::{Error, Result};
use crate::merge::MergeEngine;
use crate::providers::{Provider, ProviderKind, StringVar, Target};
use crate::recipe::Recipe;
use crate::resolver::{DEFAULT_CONFIG_NAME, DEFAULT_SECRET_NAME, ResolvedProviders, Resolver};
use crate::settings::{FallbackPolicy, Settings};
use crate::sync::RwLockExt;

use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Dotenv file read when neither the builder nor `ENV_FILE` names one
pub const DEFAULT_ENV_FILE: &str = ".env";

/// How the last load picked its providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// The two local files (`config` / `secrets` by default)
    LocalFiles,
    /// The legacy `*_REMOTE_*` pair
    LegacyRemote,
    /// The `USE_CONFIG_DYNAMIC_VALUES` recipe
    Dynamic,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadMode::LocalFiles => "local files",
            LoadMode::LegacyRemote => "legacy remote",
            LoadMode::Dynamic => "dynamic",
        })
    }
}

/// One provider that took part in a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProvider {
    pub target: Target,
    pub kind: ProviderKind,
    pub name: String,
}

/// What [`ConfigManager::init`] did
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub mode: LoadMode,
    /// Providers in merge order (configs, then secrets)
    pub providers: Vec<LoadedProvider>,
    /// Recipe tokens that were not understood
    pub ignored_tokens: Vec<String>,
    /// Whether the dotenv file was read
    pub env_file_loaded: bool,
}

impl LoadSummary {
    /// Providers that fed one target
    pub fn for_target(&self, target: Target) -> impl Iterator<Item = &LoadedProvider> {
        self.providers.iter().filter(move |p| p.target == target)
    }
}

/// Loads settings from the configured providers and holds the result.
///
/// Reads go through [`settings`](Self::settings), which hands out the current
/// tree behind an `Arc`; a repeated [`init`](Self::init) replaces it
/// atomically and never exposes a partial merge.
///
/// # Example
///
/// ```rust,no_run
/// use cfgstack::ConfigManager;
///
/// let manager = ConfigManager::builder().env_file("deploy/.env").build();
/// manager.init()?;
///
/// let settings = manager.settings();
/// let port = settings.get_int_or_else("server.port", 8080);
/// # Ok::<(), cfgstack::Error>(())
/// ```
pub struct ConfigManager {
    env: Arc<dyn EnvSource>,
    env_file: Option<PathBuf>,
    string_vars: HashMap<Target, StringVar>,
    policy: FallbackPolicy,
    settings: RwLock<Arc<Settings>>,
}

impl ConfigManager {
    /// Start building a manager
    #[must_use]
    pub fn builder() -> ConfigManagerBuilder {
        ConfigManagerBuilder::new()
    }

    /// A manager reading the process environment with default options
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Load everything and replace the held settings.
    ///
    /// Remote reads run on their own threads, so this may be called from an
    /// async runtime; it blocks the calling task until loading finishes.
    ///
    /// # Errors
    ///
    /// Returns the first provider failure; the previously held settings stay
    /// in place. Dotenv problems are never surfaced.
    pub fn init(&self) -> Result<LoadSummary> {
        let (env, env_file_loaded) = self.load_env();
        let vars = EnvVars::from_source(&env);
        let (mode, resolved, ignored_tokens) = self.plan(&vars)?;

        let providers = describe(&resolved);
        info!(
            "Resolving configuration in {mode} mode with {} providers",
            providers.len()
        );

        let tree = MergeEngine::new(resolved.configs, resolved.secrets).load()?;
        let settings = Settings::new(tree).with_fallback_policy(self.policy);
        *self.settings.write_recovered() = Arc::new(settings);

        Ok(LoadSummary {
            mode,
            providers,
            ignored_tokens,
            env_file_loaded,
        })
    }

    /// The current settings tree (empty before the first successful `init`)
    #[must_use]
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.read_recovered())
    }

    /// Real environment layered over the dotenv file.
    ///
    /// A missing or malformed dotenv file seeds the local-file defaults instead.
    fn load_env(&self) -> (LayeredEnv, bool) {
        let mut env = LayeredEnv::new(Arc::clone(&self.env));
        let path = self
            .env_file
            .clone()
            .or_else(|| self.env.var(keys::ENV_FILE).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));

        match read_dotenv(&path) {
            Ok(entries) => {
                debug!("Loaded {} variables from {}", entries.len(), path.display());
                env.extend(entries);
                (env, true)
            }
            Err(e) => {
                debug!("No usable env file at {}: {e}; seeding defaults", path.display());
                env.seed(keys::CONFIG_LOCAL_NAME, DEFAULT_CONFIG_NAME);
                env.seed(keys::SECRET_LOCAL_NAME, DEFAULT_SECRET_NAME);
                env.seed(keys::CONFIG_LOCAL_TYPE, "yaml");
                env.seed(keys::SECRET_LOCAL_TYPE, "yaml");
                (env, false)
            }
        }
    }

    /// Decide the mode and build the provider lists for it
    fn plan(&self, vars: &EnvVars) -> Result<(LoadMode, ResolvedProviders, Vec<String>)> {
        let mut resolver = Resolver::new(vars);
        for (target, var) in &self.string_vars {
            resolver = resolver.with_string_var(*target, var.clone());
        }

        let mode = match vars.mode {
            ConfigMode::Local => LoadMode::LocalFiles,
            ConfigMode::Remote => {
                if !vars.has_legacy_remote() {
                    return Err(Error::Config(format!(
                        "{}=remote needs both {} and {}",
                        keys::USE_CONFIG,
                        keys::CONFIG_REMOTE_ADDRESS,
                        keys::SECRET_REMOTE_ADDRESS
                    )));
                }
                LoadMode::LegacyRemote
            }
            ConfigMode::Dynamic => LoadMode::Dynamic,
            ConfigMode::Auto if vars.has_legacy_remote() => LoadMode::LegacyRemote,
            ConfigMode::Auto if vars.has_dynamic_values() => LoadMode::Dynamic,
            ConfigMode::Auto => LoadMode::LocalFiles,
        };

        match mode {
            LoadMode::LocalFiles => Ok((mode, resolver.local_fallback()?, Vec::new())),
            LoadMode::LegacyRemote => {
                info!("Using legacy remote pair via '{}'", vars.remote_provider);
                Ok((mode, resolver.legacy_remote()?, Vec::new()))
            }
            LoadMode::Dynamic => {
                let recipe = Recipe::parse(&vars.dynamic_values);
                let ignored = recipe.ignored().to_vec();
                if recipe.is_empty() {
                    info!("Dynamic recipe is empty, falling back to local files");
                    return Ok((LoadMode::LocalFiles, resolver.local_fallback()?, ignored));
                }
                Ok((mode, resolver.resolve(&recipe)?, ignored))
            }
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// All entries of a dotenv file, or nothing
fn read_dotenv(path: &Path) -> std::result::Result<Vec<(String, String)>, dotenvy::Error> {
    dotenvy::from_path_iter(path)?.collect()
}

fn describe(resolved: &ResolvedProviders) -> Vec<LoadedProvider> {
    let configs = resolved.configs.iter().map(|p| LoadedProvider {
        target: Target::Config,
        kind: p.kind(),
        name: p.name().to_string(),
    });
    let secrets = resolved.secrets.iter().map(|p| LoadedProvider {
        target: Target::Secret,
        kind: p.kind(),
        name: p.name().to_string(),
    });
    configs.chain(secrets).collect()
}

// =============================================================================
// Tests
// =============================================================================
