//! Provider kinds and resolution targets

use std::fmt;
use std::str::FromStr;

/// Closed set of provider kinds a recipe can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {
    /// In-process literal document
    LocalStringVar,
    /// File on the local filesystem
    LocalFile,
    /// Settings table in a relational database
    RemoteDb,
    /// Versioned secret in a secret manager
    RemoteSecretManager,
    /// Document stored in a key-value store (consul, etcd3)
    RemoteKv,
}

impl ProviderKind {
    /// Every kind, in default recipe order
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::LocalStringVar,
        ProviderKind::LocalFile,
        ProviderKind::RemoteDb,
        ProviderKind::RemoteSecretManager,
        ProviderKind::RemoteKv,
    ];

    /// Recipe token for this kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::LocalStringVar => "local_string_var",
            ProviderKind::LocalFile => "local_file",
            ProviderKind::RemoteDb => "remote_db",
            ProviderKind::RemoteSecretManager => "remote_secret_manager",
            ProviderKind::RemoteKv => "remote_kv",
        }
    }

    /// Position in the default order (1-based), used to break ties
    #[must_use]
    pub fn default_rank(&self) -> usize {
        match self {
            ProviderKind::LocalStringVar => 1,
            ProviderKind::LocalFile => 2,
            ProviderKind::RemoteDb => 3,
            ProviderKind::RemoteSecretManager => 4,
            ProviderKind::RemoteKv => 5,
        }
    }

    /// Remote kinds are activated by name + address, local ones by name + type
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ProviderKind::RemoteDb | ProviderKind::RemoteSecretManager | ProviderKind::RemoteKv
        )
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase().replace('-', "_");
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == token)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which resolution pipeline a provider feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    /// Regular configuration, merged first
    Config,
    /// Secret material, merged last
    Secret,
}

impl Target {
    /// Both targets, in merge order
    pub const ALL: [Target; 2] = [Target::Config, Target::Secret];

    /// Upper-case token used in environment variable names
    #[must_use]
    pub fn env_token(&self) -> &'static str {
        match self {
            Target::Config => "CONFIG",
            Target::Secret => "SECRET",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Config => f.write_str("config"),
            Target::Secret => f.write_str("secret"),
        }
    }
}
