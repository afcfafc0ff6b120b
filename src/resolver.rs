//! Turns a recipe plus bound environment into concrete provider lists

use crate::env::{EnvVars, keys};
use crate::error::{Error, Result};
use crate::providers::{
    ConfigSource, DatabaseProvider, Driver, FileProvider, ProviderDescriptor, ProviderKind,
    SecretKind, SecretSource, StringVar, Target,
};
use crate::recipe::Recipe;
use log::debug;
use std::collections::HashMap;

/// Default local file names used when nothing else is configured
pub const DEFAULT_CONFIG_NAME: &str = "config";
pub const DEFAULT_SECRET_NAME: &str = "secrets";

/// Ordered provider lists for both targets
#[derive(Default)]
pub struct ResolvedProviders {
    pub configs: Vec<ConfigSource>,
    pub secrets: Vec<SecretSource>,
}

impl ResolvedProviders {
    /// Total number of providers across both targets
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len() + self.secrets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds providers for each `(kind, target)` the recipe selects.
///
/// A kind whose descriptor is not wired (missing name/address/type) is skipped
/// silently; the database kind is never built for the secret target.
pub struct Resolver<'a> {
    env: &'a EnvVars,
    string_vars: HashMap<Target, StringVar>,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a EnvVars) -> Self {
        Self {
            env,
            string_vars: HashMap::new(),
        }
    }

    /// Use an in-process literal for `local_string_var` on `target`,
    /// taking priority over the environment
    #[must_use]
    pub fn with_string_var(mut self, target: Target, var: StringVar) -> Self {
        self.string_vars.insert(target, var);
        self
    }

    /// Resolve a recipe into provider lists
    ///
    /// # Errors
    ///
    /// Returns an error if a wired descriptor declares an unsupported type.
    pub fn resolve(&self, recipe: &Recipe) -> Result<ResolvedProviders> {
        let mut resolved = ResolvedProviders::default();

        for kind in recipe.kinds() {
            let descriptor = self.descriptor(kind, Target::Config);
            if descriptor.is_wired(kind) {
                resolved
                    .configs
                    .push(ConfigSource::from_descriptor(kind, &descriptor, self.env)?);
            } else {
                debug!("Skipping {kind} for config: incomplete wiring");
            }

            let Ok(secret_kind) = SecretKind::try_from(kind) else {
                debug!("Skipping {kind} for secrets: config-only provider");
                continue;
            };
            let descriptor = self.descriptor(kind, Target::Secret);
            if descriptor.is_wired(kind) {
                resolved
                    .secrets
                    .push(SecretSource::from_descriptor(secret_kind, &descriptor, self.env)?);
            } else {
                debug!("Skipping {kind} for secrets: incomplete wiring");
            }
        }

        Ok(resolved)
    }

    fn descriptor(&self, kind: ProviderKind, target: Target) -> ProviderDescriptor {
        let mut descriptor = self.env.descriptor(kind, target);
        if kind == ProviderKind::LocalStringVar {
            if let Some(var) = self.string_vars.get(&target) {
                descriptor = ProviderDescriptor {
                    name: var.name.clone(),
                    config_type: var.value_type.to_string(),
                    value: var.value.clone(),
                    ..Default::default()
                };
            }
        }
        descriptor
    }

    /// Exactly two local files: `CONFIG_LOCAL_*` (default `config`) and
    /// `SECRET_LOCAL_*` (default `secrets`), YAML unless overridden
    ///
    /// # Errors
    ///
    /// Returns an error if a declared type is unsupported.
    pub fn local_fallback(&self) -> Result<ResolvedProviders> {
        let file = |target: Target, default_name: &str| -> Result<FileProvider> {
            let mut d = self.env.descriptor(ProviderKind::LocalFile, target);
            if d.name.is_empty() {
                d.name = default_name.to_string();
            }
            Ok(FileProvider::new(d.name.clone(), d.parsed_type()?).search_paths(d.paths))
        };

        Ok(ResolvedProviders {
            configs: vec![ConfigSource::File(file(Target::Config, DEFAULT_CONFIG_NAME)?)],
            secrets: vec![SecretSource::File(file(Target::Secret, DEFAULT_SECRET_NAME)?)],
        })
    }

    /// Exactly two remote providers from the legacy `*_REMOTE_*` pair.
    ///
    /// `REMOTE_PROVIDER` picks the kinds: a database driver name gives a
    /// database config provider and a secret-manager secret provider, `gsm`
    /// gives two secret-manager providers, anything else two KV providers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first empty `*_REMOTE_ADDRESS` or
    /// `*_REMOTE_NAME` variable, or an error if a declared type is unsupported.
    pub fn legacy_remote(&self) -> Result<ResolvedProviders> {
        let env = self.env;
        let config = &env.legacy_config;
        let secret = &env.legacy_secret;

        for (key, value) in [
            (keys::CONFIG_REMOTE_ADDRESS, &config.address),
            (keys::CONFIG_REMOTE_NAME, &config.name),
            (keys::SECRET_REMOTE_ADDRESS, &secret.address),
            (keys::SECRET_REMOTE_NAME, &secret.name),
        ] {
            if value.is_empty() {
                return Err(Error::Config(format!("{key} is required for the legacy remote pair")));
            }
        }

        let provider = env.remote_provider.as_str();

        let resolved = if Driver::from_name(provider).is_ok() {
            let value_type = if config.config_type.is_empty() {
                None
            } else {
                Some(config.parsed_type()?)
            };
            ResolvedProviders {
                configs: vec![ConfigSource::Database(
                    DatabaseProvider::new(config.address.clone(), config.name.clone())
                        .prefixes(config.prefixes.clone())
                        .value_type(value_type),
                )],
                secrets: vec![SecretSource::from_descriptor(
                    SecretKind::RemoteSecretManager,
                    secret,
                    env,
                )?],
            }
        } else if matches!(provider, "gsm" | "secretmanager" | "secret_manager") {
            ResolvedProviders {
                configs: vec![ConfigSource::from_descriptor(
                    ProviderKind::RemoteSecretManager,
                    config,
                    env,
                )?],
                secrets: vec![SecretSource::from_descriptor(
                    SecretKind::RemoteSecretManager,
                    secret,
                    env,
                )?],
            }
        } else {
            ResolvedProviders {
                configs: vec![ConfigSource::from_descriptor(ProviderKind::RemoteKv, config, env)?],
                secrets: vec![SecretSource::from_descriptor(SecretKind::RemoteKv, secret, env)?],
            }
        };

        Ok(resolved)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use crate::providers::Provider;

    fn kinds_of(resolved: &ResolvedProviders) -> (Vec<ProviderKind>, Vec<ProviderKind>) {
        (
            resolved.configs.iter().map(Provider::kind).collect(),
            resolved.secrets.iter().map(Provider::kind).collect(),
        )
    }

    #[test]
    fn test_unwired_kinds_are_skipped() {
        let env = EnvVars::from_source(
            &MapEnv::new()
                .with("CONFIG_LOCAL_NAME", "app")
                .with("CONFIG_LOCAL_TYPE", "yaml")
                // KV selected but no address
                .with("CONFIG_KV_NAME", "app/config"),
        );
        let resolved = Resolver::new(&env)
            .resolve(&Recipe::parse("remote_kv,local_file"))
            .unwrap();

        let (configs, secrets) = kinds_of(&resolved);
        assert_eq!(configs, vec![ProviderKind::LocalFile]);
        assert!(secrets.is_empty());
    }

    #[test]
    fn test_database_never_resolves_for_secrets() {
        let env = EnvVars::from_source(
            &MapEnv::new()
                .with("CONFIG_DB_ADDRESS", "sqlite::memory:")
                .with("CONFIG_DB_NAME", "settings")
                .with("SECRET_DB_ADDRESS", "sqlite::memory:")
                .with("SECRET_DB_NAME", "secrets"),
        );
        let resolved = Resolver::new(&env)
            .resolve(&Recipe::parse("remote_db"))
            .unwrap();

        let (configs, secrets) = kinds_of(&resolved);
        assert_eq!(configs, vec![ProviderKind::RemoteDb]);
        assert!(secrets.is_empty());
    }

    #[test]
    fn test_recipe_order_is_preserved_per_target() {
        let env = EnvVars::from_source(
            &MapEnv::new()
                .with("CONFIG_LOCAL_NAME", "config")
                .with("CONFIG_LOCAL_TYPE", "yaml")
                .with("SECRET_LOCAL_NAME", "secrets")
                .with("SECRET_LOCAL_TYPE", "yaml")
                .with("CONFIG_KV_ADDRESS", "consul:8500")
                .with("CONFIG_KV_NAME", "app/config")
                .with("SECRET_GSM_ADDRESS", "proj")
                .with("SECRET_GSM_NAME", "app-secrets"),
        );
        let resolved = Resolver::new(&env)
            .resolve(&Recipe::parse("remote_kv,remote_secret_manager,local_file"))
            .unwrap();

        let (configs, secrets) = kinds_of(&resolved);
        assert_eq!(configs, vec![ProviderKind::RemoteKv, ProviderKind::LocalFile]);
        assert_eq!(
            secrets,
            vec![ProviderKind::RemoteSecretManager, ProviderKind::LocalFile]
        );
    }

    #[test]
    fn test_in_process_string_var_wins_over_env() {
        let env = EnvVars::from_source(
            &MapEnv::new()
                .with("LOCAL_STRING_VAR_CONFIG_NAME", "from-env")
                .with("LOCAL_STRING_VAR_CONFIG_TYPE", "json")
                .with("LOCAL_STRING_VAR_CONFIG_VALUE", r#"{"source": "env"}"#),
        );
        let mut resolved = Resolver::new(&env)
            .with_string_var(Target::Config, StringVar::json("inline", r#"{"source": "code"}"#))
            .resolve(&Recipe::parse("local_string_var"))
            .unwrap();

        assert_eq!(resolved.configs.len(), 1);
        let provider = &mut resolved.configs[0];
        assert_eq!(provider.name(), "inline");
        provider.init().unwrap();
        assert_eq!(provider.data()["source"], serde_json::json!("code"));
    }

    #[test]
    fn test_local_fallback_defaults() {
        let env = EnvVars::from_source(&MapEnv::new());
        let resolved = Resolver::new(&env).local_fallback().unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.configs[0].name(), DEFAULT_CONFIG_NAME);
        assert_eq!(resolved.secrets[0].name(), DEFAULT_SECRET_NAME);
    }

    #[test]
    fn test_legacy_remote_kinds() {
        let base = MapEnv::new()
            .with("CONFIG_REMOTE_ADDRESS", "http://consul:8500")
            .with("CONFIG_REMOTE_NAME", "app/config")
            .with("SECRET_REMOTE_ADDRESS", "my-project")
            .with("SECRET_REMOTE_NAME", "app-secrets");

        let env = EnvVars::from_source(&base);
        let (configs, secrets) = kinds_of(&Resolver::new(&env).legacy_remote().unwrap());
        assert_eq!(configs, vec![ProviderKind::RemoteKv]);
        assert_eq!(secrets, vec![ProviderKind::RemoteKv]);

        let env = EnvVars::from_source(&base.clone().with("REMOTE_PROVIDER", "postgres"));
        let (configs, secrets) = kinds_of(&Resolver::new(&env).legacy_remote().unwrap());
        assert_eq!(configs, vec![ProviderKind::RemoteDb]);
        assert_eq!(secrets, vec![ProviderKind::RemoteSecretManager]);

        let env = EnvVars::from_source(&base.with("REMOTE_PROVIDER", "gsm"));
        let (configs, secrets) = kinds_of(&Resolver::new(&env).legacy_remote().unwrap());
        assert_eq!(configs, vec![ProviderKind::RemoteSecretManager]);
        assert_eq!(secrets, vec![ProviderKind::RemoteSecretManager]);
    }

    #[test]
    fn test_legacy_remote_requires_names() {
        let env = EnvVars::from_source(
            &MapEnv::new()
                .with("CONFIG_REMOTE_ADDRESS", "http://consul:8500")
                .with("SECRET_REMOTE_ADDRESS", "http://consul:8500")
                .with("SECRET_REMOTE_NAME", "app/secrets"),
        );
        let err = Resolver::new(&env).legacy_remote().err().unwrap();

        assert!(matches!(&err, Error::Config(msg) if msg.contains("CONFIG_REMOTE_NAME")));
    }
}
