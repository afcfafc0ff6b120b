//! Configuration providers
//!
//! Every source implements [`Provider`]: `init()` performs exactly one
//! synchronous read, `data()` hands back the parsed map. Available sources:
//! - **Local string var**: an in-process literal document
//! - **Local file**: a YAML/JSON file found on a search path
//! - **Secret manager**: a versioned secret, integrity-checked with CRC32C - requires `remote` feature
//! - **KV store**: a document at a consul/etcd3 key - requires `remote` feature
//! - **Database**: rows of a settings table, config target only - requires `database` feature
//!
//! Instances are built through [`ConfigSource`] and [`SecretSource`]. The
//! latter has no database variant, so database rows can never reach the
//! secret layer.

mod database;
mod file;
mod kind;
mod kv;
mod secret_manager;
mod string_var;

pub use database::{DatabaseProvider, Driver};
pub use file::FileProvider;
pub use kind::{ProviderKind, Target};
pub use kv::{KvProtocol, KvProvider};
pub use secret_manager::SecretManagerProvider;
pub use string_var::{StringVar, StringVarProvider};

use crate::env::EnvVars;
use crate::error::Result;
use crate::format::ConfigType;
use crate::settings::SettingsMap;
use std::path::PathBuf;

/// A single configuration source with a uniform load contract
pub trait Provider: Send {
    /// Fetch and parse the source. Called exactly once.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole resolution.
    fn init(&mut self) -> Result<()>;

    /// Parsed settings; empty until [`Provider::init`] succeeded
    fn data(&self) -> &SettingsMap;

    /// Human-readable source name for logging
    fn name(&self) -> &str;

    /// Which kind of source this is
    fn kind(&self) -> ProviderKind;
}

/// Run a blocking fetch on a dedicated thread.
///
/// Blocking HTTP clients and the private database runtime panic when used
/// from an async runtime worker, so every remote read goes through here.
#[cfg(any(feature = "remote", feature = "database"))]
pub(crate) fn run_blocking<T, F>(source: &str, fetch: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    std::thread::scope(|scope| {
        scope.spawn(fetch).join().map_err(|_| {
            crate::error::Error::Config(format!("Fetch thread for '{source}' panicked"))
        })?
    })
}

/// Resolved parameters for one provider instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// File name, secret id, key path or table, depending on the kind
    pub name: String,
    /// Declared document type (`yaml`/`json`), empty for the default
    pub config_type: String,
    /// Remote address: project, base URL or DSN
    pub address: String,
    /// Search paths for local files
    pub paths: Vec<PathBuf>,
    /// Row scopes for the database provider
    pub prefixes: Vec<String>,
    /// Literal document for string vars
    pub value: String,
}

impl ProviderDescriptor {
    /// Activation predicate: remote kinds need name + address, local kinds name + type
    #[must_use]
    pub fn is_wired(&self, kind: ProviderKind) -> bool {
        if self.name.is_empty() {
            return false;
        }
        if kind.is_remote() {
            !self.address.is_empty()
        } else {
            !self.config_type.is_empty()
        }
    }

    /// Copy every field that is empty here from `other`
    pub fn fill_from(&mut self, other: &ProviderDescriptor) {
        fn fill(dst: &mut String, src: &str) {
            if dst.is_empty() {
                *dst = src.to_string();
            }
        }
        fill(&mut self.name, &other.name);
        fill(&mut self.config_type, &other.config_type);
        fill(&mut self.address, &other.address);
        fill(&mut self.value, &other.value);
        if self.paths.is_empty() {
            self.paths = other.paths.clone();
        }
        if self.prefixes.is_empty() {
            self.prefixes = other.prefixes.clone();
        }
    }

    /// Declared type, YAML when empty
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`](crate::Error::UnsupportedFormat) for anything but yaml/json.
    pub fn parsed_type(&self) -> Result<ConfigType> {
        if self.config_type.is_empty() {
            Ok(ConfigType::default())
        } else {
            self.config_type.parse()
        }
    }
}

// =============================================================================
// Factories
// =============================================================================

/// Provider instances allowed on the configuration path
pub enum ConfigSource {
    StringVar(StringVarProvider),
    File(FileProvider),
    Database(DatabaseProvider),
    SecretManager(SecretManagerProvider),
    Kv(KvProvider),
}

impl ConfigSource {
    /// Build the provider for `kind` from its descriptor
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor declares an unsupported type.
    pub fn from_descriptor(
        kind: ProviderKind,
        descriptor: &ProviderDescriptor,
        env: &EnvVars,
    ) -> Result<Self> {
        Ok(match kind {
            ProviderKind::LocalStringVar => {
                ConfigSource::StringVar(string_var_from(descriptor)?)
            }
            ProviderKind::LocalFile => ConfigSource::File(file_from(descriptor)?),
            ProviderKind::RemoteDb => ConfigSource::Database(database_from(descriptor)?),
            ProviderKind::RemoteSecretManager => {
                ConfigSource::SecretManager(secret_manager_from(descriptor, env)?)
            }
            ProviderKind::RemoteKv => ConfigSource::Kv(kv_from(descriptor, env)?),
        })
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            ConfigSource::StringVar(p) => p,
            ConfigSource::File(p) => p,
            ConfigSource::Database(p) => p,
            ConfigSource::SecretManager(p) => p,
            ConfigSource::Kv(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Provider {
        match self {
            ConfigSource::StringVar(p) => p,
            ConfigSource::File(p) => p,
            ConfigSource::Database(p) => p,
            ConfigSource::SecretManager(p) => p,
            ConfigSource::Kv(p) => p,
        }
    }
}

impl Provider for ConfigSource {
    fn init(&mut self) -> Result<()> {
        self.inner_mut().init()
    }

    fn data(&self) -> &SettingsMap {
        self.inner().data()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn kind(&self) -> ProviderKind {
        self.inner().kind()
    }
}

/// Kinds that may carry secrets: every kind except the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    LocalStringVar,
    LocalFile,
    RemoteSecretManager,
    RemoteKv,
}

impl TryFrom<ProviderKind> for SecretKind {
    type Error = ProviderKind;

    fn try_from(kind: ProviderKind) -> std::result::Result<Self, ProviderKind> {
        match kind {
            ProviderKind::LocalStringVar => Ok(SecretKind::LocalStringVar),
            ProviderKind::LocalFile => Ok(SecretKind::LocalFile),
            ProviderKind::RemoteSecretManager => Ok(SecretKind::RemoteSecretManager),
            ProviderKind::RemoteKv => Ok(SecretKind::RemoteKv),
            ProviderKind::RemoteDb => Err(kind),
        }
    }
}

impl From<SecretKind> for ProviderKind {
    fn from(kind: SecretKind) -> Self {
        match kind {
            SecretKind::LocalStringVar => ProviderKind::LocalStringVar,
            SecretKind::LocalFile => ProviderKind::LocalFile,
            SecretKind::RemoteSecretManager => ProviderKind::RemoteSecretManager,
            SecretKind::RemoteKv => ProviderKind::RemoteKv,
        }
    }
}

/// Provider instances allowed on the secret path
pub enum SecretSource {
    StringVar(StringVarProvider),
    File(FileProvider),
    SecretManager(SecretManagerProvider),
    Kv(KvProvider),
}

impl SecretSource {
    /// Build the provider for `kind` from its descriptor
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor declares an unsupported type.
    pub fn from_descriptor(
        kind: SecretKind,
        descriptor: &ProviderDescriptor,
        env: &EnvVars,
    ) -> Result<Self> {
        Ok(match kind {
            SecretKind::LocalStringVar => SecretSource::StringVar(string_var_from(descriptor)?),
            SecretKind::LocalFile => SecretSource::File(file_from(descriptor)?),
            SecretKind::RemoteSecretManager => {
                SecretSource::SecretManager(secret_manager_from(descriptor, env)?)
            }
            SecretKind::RemoteKv => SecretSource::Kv(kv_from(descriptor, env)?),
        })
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            SecretSource::StringVar(p) => p,
            SecretSource::File(p) => p,
            SecretSource::SecretManager(p) => p,
            SecretSource::Kv(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Provider {
        match self {
            SecretSource::StringVar(p) => p,
            SecretSource::File(p) => p,
            SecretSource::SecretManager(p) => p,
            SecretSource::Kv(p) => p,
        }
    }
}

impl Provider for SecretSource {
    fn init(&mut self) -> Result<()> {
        self.inner_mut().init()
    }

    fn data(&self) -> &SettingsMap {
        self.inner().data()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn kind(&self) -> ProviderKind {
        self.inner().kind()
    }
}

// Per-variant constructors shared by both factories

fn string_var_from(d: &ProviderDescriptor) -> Result<StringVarProvider> {
    Ok(StringVarProvider::new(StringVar::new(
        d.name.clone(),
        d.value.clone(),
        d.parsed_type()?,
    )))
}

fn file_from(d: &ProviderDescriptor) -> Result<FileProvider> {
    Ok(FileProvider::new(d.name.clone(), d.parsed_type()?).search_paths(d.paths.clone()))
}

fn database_from(d: &ProviderDescriptor) -> Result<DatabaseProvider> {
    let value_type = if d.config_type.is_empty() {
        None
    } else {
        Some(d.parsed_type()?)
    };
    Ok(DatabaseProvider::new(d.address.clone(), d.name.clone())
        .prefixes(d.prefixes.clone())
        .value_type(value_type))
}

fn secret_manager_from(d: &ProviderDescriptor, env: &EnvVars) -> Result<SecretManagerProvider> {
    let mut provider =
        SecretManagerProvider::new(d.address.clone(), d.name.clone(), d.parsed_type()?);
    if let Some(endpoint) = &env.connection.gsm_endpoint {
        provider = provider.endpoint(endpoint.clone());
    }
    if let Some(token) = &env.connection.gsm_access_token {
        provider = provider.access_token(token.clone());
    }
    Ok(provider)
}

fn kv_from(d: &ProviderDescriptor, env: &EnvVars) -> Result<KvProvider> {
    let mut provider = KvProvider::new(
        env.remote_provider.clone(),
        d.address.clone(),
        d.name.clone(),
        d.parsed_type()?,
    );
    if let Some(token) = &env.connection.consul_token {
        provider = provider.token(token.clone());
    }
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_activation_predicate() {
        let local = ProviderDescriptor {
            name: "config".into(),
            config_type: "yaml".into(),
            ..Default::default()
        };
        assert!(local.is_wired(ProviderKind::LocalFile));
        // remote kinds need an address regardless of type
        assert!(!local.is_wired(ProviderKind::RemoteKv));

        let remote = ProviderDescriptor {
            name: "app/config".into(),
            address: "http://consul:8500".into(),
            ..Default::default()
        };
        assert!(remote.is_wired(ProviderKind::RemoteKv));
        assert!(!remote.is_wired(ProviderKind::LocalFile));
        assert!(!ProviderDescriptor::default().is_wired(ProviderKind::LocalStringVar));
    }

    #[test]
    fn test_database_never_converts_to_secret_kind() {
        assert!(SecretKind::try_from(ProviderKind::RemoteDb).is_err());
        for kind in ProviderKind::ALL {
            if let Ok(secret) = SecretKind::try_from(kind) {
                assert_eq!(ProviderKind::from(secret), kind);
            }
        }
    }

    #[test]
    fn test_factory_rejects_unknown_type() {
        let descriptor = ProviderDescriptor {
            name: "config".into(),
            config_type: "ini".into(),
            ..Default::default()
        };
        let result = ConfigSource::from_descriptor(
            ProviderKind::LocalFile,
            &descriptor,
            &EnvVars::default(),
        );
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_factory_builds_matching_variant() {
        let descriptor = ProviderDescriptor {
            name: "inline".into(),
            config_type: "json".into(),
            value: r#"{"a": 1}"#.into(),
            ..Default::default()
        };
        let mut source = SecretSource::from_descriptor(
            SecretKind::LocalStringVar,
            &descriptor,
            &EnvVars::default(),
        )
        .unwrap();
        assert_eq!(source.kind(), ProviderKind::LocalStringVar);
        source.init().unwrap();
        assert_eq!(source.data()["a"], serde_json::json!(1));
    }
}
