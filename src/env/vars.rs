//! Binding of the environment variable catalogue into [`EnvVars`]

use super::EnvSource;
use crate::providers::{ProviderDescriptor, ProviderKind, Target};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Names of every variable the binder reads
pub mod keys {
    /// Path of the dotenv file (default `.env`)
    pub const ENV_FILE: &str = "ENV_FILE";
    /// Mode selector: `auto`, `local`, `remote` or `dynamic`
    pub const USE_CONFIG: &str = "USE_CONFIG";
    /// Combination expression, e.g. `local_file,remote_kv`
    pub const USE_CONFIG_DYNAMIC_VALUES: &str = "USE_CONFIG_DYNAMIC_VALUES";
    /// Protocol for the KV provider and the legacy remote pair
    pub const REMOTE_PROVIDER: &str = "REMOTE_PROVIDER";

    pub const CONFIG_LOCAL_NAME: &str = "CONFIG_LOCAL_NAME";
    pub const CONFIG_LOCAL_TYPE: &str = "CONFIG_LOCAL_TYPE";
    pub const SECRET_LOCAL_NAME: &str = "SECRET_LOCAL_NAME";
    pub const SECRET_LOCAL_TYPE: &str = "SECRET_LOCAL_TYPE";

    pub const CONFIG_REMOTE_ADDRESS: &str = "CONFIG_REMOTE_ADDRESS";
    pub const CONFIG_REMOTE_NAME: &str = "CONFIG_REMOTE_NAME";
    pub const CONFIG_REMOTE_TYPE: &str = "CONFIG_REMOTE_TYPE";
    pub const CONFIG_REMOTE_PREFIX: &str = "CONFIG_REMOTE_PREFIX";
    pub const SECRET_REMOTE_ADDRESS: &str = "SECRET_REMOTE_ADDRESS";
    pub const SECRET_REMOTE_NAME: &str = "SECRET_REMOTE_NAME";
    pub const SECRET_REMOTE_TYPE: &str = "SECRET_REMOTE_TYPE";

    /// Secret Manager API base URL
    pub const GSM_ENDPOINT: &str = "GSM_ENDPOINT";
    /// Bearer token for the Secret Manager API
    pub const GSM_ACCESS_TOKEN: &str = "GSM_ACCESS_TOKEN";
    /// ACL token sent to consul
    pub const CONSUL_HTTP_TOKEN: &str = "CONSUL_HTTP_TOKEN";

    /// Template for per-kind variables, e.g. `REMOTE_KV_CONFIG_ADDRESS`
    pub const KEY_PATTERN: &str = "{kind}_{target}_{context}";
}

/// Resolution mode requested through `USE_CONFIG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigMode {
    /// Legacy remote pair, then dynamic recipe, then local files
    #[default]
    Auto,
    /// Always the two local files
    Local,
    /// Always the legacy remote pair
    Remote,
    /// Always the dynamic recipe
    Dynamic,
}

impl ConfigMode {
    fn from_env(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "file" | "files" => ConfigMode::Local,
            "remote" => ConfigMode::Remote,
            "dynamic" => ConfigMode::Dynamic,
            _ => ConfigMode::Auto,
        }
    }
}

/// Connection settings shared by every remote provider of a protocol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConnection {
    pub gsm_endpoint: Option<String>,
    pub gsm_access_token: Option<String>,
    pub consul_token: Option<String>,
}

/// Typed description of what to load and from where.
///
/// Built by [`EnvVars::from_source`] without interpreting the combination
/// expression; that is the recipe parser's job.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    pub env_file: Option<String>,
    pub mode: ConfigMode,
    pub dynamic_values: String,
    pub remote_provider: String,
    pub legacy_config: ProviderDescriptor,
    pub legacy_secret: ProviderDescriptor,
    pub connection: RemoteConnection,
    descriptors: BTreeMap<(ProviderKind, Target), ProviderDescriptor>,
}

impl EnvVars {
    /// Bind the catalogue from an environment source
    pub fn from_source(env: &dyn EnvSource) -> Self {
        let mut descriptors = BTreeMap::new();
        for kind in ProviderKind::ALL {
            for target in Target::ALL {
                let mut descriptor = canonical_descriptor(env, kind, target);
                descriptor.fill_from(&pattern_descriptor(env, kind, target));
                descriptors.insert((kind, target), descriptor);
            }
        }

        let remote_provider = read(env, keys::REMOTE_PROVIDER);

        Self {
            env_file: non_empty(read(env, keys::ENV_FILE)),
            mode: ConfigMode::from_env(&read(env, keys::USE_CONFIG)),
            dynamic_values: read(env, keys::USE_CONFIG_DYNAMIC_VALUES),
            remote_provider: if remote_provider.is_empty() {
                "consul".to_string()
            } else {
                remote_provider.to_ascii_lowercase()
            },
            legacy_config: ProviderDescriptor {
                address: read(env, keys::CONFIG_REMOTE_ADDRESS),
                name: read(env, keys::CONFIG_REMOTE_NAME),
                config_type: read(env, keys::CONFIG_REMOTE_TYPE),
                prefixes: split_list(&read(env, keys::CONFIG_REMOTE_PREFIX)),
                ..Default::default()
            },
            legacy_secret: ProviderDescriptor {
                address: read(env, keys::SECRET_REMOTE_ADDRESS),
                name: read(env, keys::SECRET_REMOTE_NAME),
                config_type: read(env, keys::SECRET_REMOTE_TYPE),
                ..Default::default()
            },
            connection: RemoteConnection {
                gsm_endpoint: non_empty(read(env, keys::GSM_ENDPOINT)),
                gsm_access_token: non_empty(read(env, keys::GSM_ACCESS_TOKEN)),
                consul_token: non_empty(read(env, keys::CONSUL_HTTP_TOKEN)),
            },
            descriptors,
        }
    }

    /// Parameters for one kind on one target
    #[must_use]
    pub fn descriptor(&self, kind: ProviderKind, target: Target) -> ProviderDescriptor {
        self.descriptors
            .get(&(kind, target))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether both halves of the legacy remote address pair are set
    #[must_use]
    pub fn has_legacy_remote(&self) -> bool {
        !self.legacy_config.address.is_empty() && !self.legacy_secret.address.is_empty()
    }

    /// Whether a combination expression is configured
    #[must_use]
    pub fn has_dynamic_values(&self) -> bool {
        !self.dynamic_values.trim().is_empty()
    }
}

/// Expand [`keys::KEY_PATTERN`] for a kind, target and context
#[must_use]
pub fn pattern_key(kind: ProviderKind, target: Target, context: &str) -> String {
    keys::KEY_PATTERN
        .replace("{kind}", &kind.as_str().to_ascii_uppercase())
        .replace("{target}", target.env_token())
        .replace("{context}", context)
}

/// Slot name of the kinds that have fixed, documented variables
fn canonical_slot(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::LocalFile => Some("LOCAL"),
        ProviderKind::RemoteSecretManager => Some("GSM"),
        ProviderKind::RemoteKv => Some("KV"),
        ProviderKind::RemoteDb => Some("DB"),
        ProviderKind::LocalStringVar => None,
    }
}

fn canonical_descriptor(env: &dyn EnvSource, kind: ProviderKind, target: Target) -> ProviderDescriptor {
    let Some(slot) = canonical_slot(kind) else {
        return ProviderDescriptor::default();
    };
    let key = |context: &str| format!("{}_{}_{}", target.env_token(), slot, context);
    ProviderDescriptor {
        address: read(env, &key("ADDRESS")),
        name: read(env, &key("NAME")),
        config_type: read(env, &key("TYPE")),
        paths: split_paths(&read(env, &key("PATH"))),
        prefixes: split_list(&read(env, &key("PREFIX"))),
        value: String::new(),
    }
}

fn pattern_descriptor(env: &dyn EnvSource, kind: ProviderKind, target: Target) -> ProviderDescriptor {
    let key = |context: &str| pattern_key(kind, target, context);
    ProviderDescriptor {
        address: read(env, &key("ADDRESS")),
        name: read(env, &key("NAME")),
        config_type: read(env, &key("TYPE")),
        paths: split_paths(&read(env, &key("PATH"))),
        prefixes: split_list(&read(env, &key("PREFIX"))),
        value: env.var(&key("VALUE")).unwrap_or_default(),
    }
}

fn read(env: &dyn EnvSource, key: &str) -> String {
    env.var(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn split_paths(value: &str) -> Vec<PathBuf> {
    split_list(value).into_iter().map(PathBuf::from).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;

    #[test]
    fn test_pattern_key() {
        assert_eq!(
            pattern_key(ProviderKind::RemoteKv, Target::Secret, "ADDRESS"),
            "REMOTE_KV_SECRET_ADDRESS"
        );
        assert_eq!(
            pattern_key(ProviderKind::LocalStringVar, Target::Config, "VALUE"),
            "LOCAL_STRING_VAR_CONFIG_VALUE"
        );
    }

    #[test]
    fn test_empty_environment() {
        let vars = EnvVars::from_source(&MapEnv::new());

        assert_eq!(vars.mode, ConfigMode::Auto);
        assert_eq!(vars.remote_provider, "consul");
        assert!(!vars.has_legacy_remote());
        assert!(!vars.has_dynamic_values());
        assert_eq!(
            vars.descriptor(ProviderKind::LocalFile, Target::Config),
            ProviderDescriptor::default()
        );
    }

    #[test]
    fn test_canonical_slots_per_target() {
        let env = MapEnv::new()
            .with("CONFIG_LOCAL_NAME", "app")
            .with("CONFIG_LOCAL_TYPE", "json")
            .with("CONFIG_LOCAL_PATH", "/etc/app, ./conf")
            .with("SECRET_KV_ADDRESS", "http://consul:8500")
            .with("SECRET_KV_NAME", "app/secrets")
            .with("CONFIG_DB_PREFIX", "base,prod");
        let vars = EnvVars::from_source(&env);

        let local = vars.descriptor(ProviderKind::LocalFile, Target::Config);
        assert_eq!(local.name, "app");
        assert_eq!(local.config_type, "json");
        assert_eq!(
            local.paths,
            vec![PathBuf::from("/etc/app"), PathBuf::from("./conf")]
        );

        let kv = vars.descriptor(ProviderKind::RemoteKv, Target::Secret);
        assert_eq!(kv.address, "http://consul:8500");
        assert!(vars.descriptor(ProviderKind::RemoteKv, Target::Config).address.is_empty());

        let db = vars.descriptor(ProviderKind::RemoteDb, Target::Config);
        assert_eq!(db.prefixes, vec!["base", "prod"]);
    }

    #[test]
    fn test_pattern_fills_gaps_but_canonical_wins() {
        let env = MapEnv::new()
            .with("CONFIG_KV_NAME", "canonical/path")
            .with("REMOTE_KV_CONFIG_NAME", "pattern/path")
            .with("REMOTE_KV_CONFIG_ADDRESS", "http://kv:8500")
            .with("LOCAL_STRING_VAR_SECRET_NAME", "inline")
            .with("LOCAL_STRING_VAR_SECRET_TYPE", "yaml")
            .with("LOCAL_STRING_VAR_SECRET_VALUE", "token: abc\n");
        let vars = EnvVars::from_source(&env);

        let kv = vars.descriptor(ProviderKind::RemoteKv, Target::Config);
        assert_eq!(kv.name, "canonical/path");
        assert_eq!(kv.address, "http://kv:8500");

        let inline = vars.descriptor(ProviderKind::LocalStringVar, Target::Secret);
        assert_eq!(inline.name, "inline");
        assert_eq!(inline.value, "token: abc\n");
    }

    #[test]
    fn test_mode_and_legacy_pair() {
        let env = MapEnv::new()
            .with("USE_CONFIG", "Remote")
            .with("REMOTE_PROVIDER", "ETCD3")
            .with("CONFIG_REMOTE_ADDRESS", "http://etcd:2379")
            .with("CONFIG_REMOTE_PREFIX", "svc")
            .with("SECRET_REMOTE_ADDRESS", "http://etcd:2379");
        let vars = EnvVars::from_source(&env);

        assert_eq!(vars.mode, ConfigMode::Remote);
        assert_eq!(vars.remote_provider, "etcd3");
        assert!(vars.has_legacy_remote());
        assert_eq!(vars.legacy_config.prefixes, vec!["svc"]);
    }
}
