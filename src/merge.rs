//! Merge engine: initialize providers, fold their data with fixed precedence

use crate::error::Result;
use crate::providers::{ConfigSource, Provider, SecretSource, Target};
use crate::settings::SettingsMap;
use log::{debug, info};

/// Owns the provider lists for a single load.
///
/// Every config provider is initialized, then every secret provider, in list
/// order; the first failure aborts and nothing is merged. Data is folded with
/// top-level-key overwrite in the same order, so later providers win and
/// secrets form the final layer.
pub struct MergeEngine<C: Provider = ConfigSource, S: Provider = SecretSource> {
    configs: Vec<C>,
    secrets: Vec<S>,
}

impl<C: Provider, S: Provider> MergeEngine<C, S> {
    pub fn new(configs: Vec<C>, secrets: Vec<S>) -> Self {
        Self { configs, secrets }
    }

    /// Initialize everything and return the merged tree
    ///
    /// # Errors
    ///
    /// Returns the first provider initialization error.
    pub fn load(mut self) -> Result<SettingsMap> {
        for provider in &mut self.configs {
            init_one(provider, Target::Config)?;
        }
        for provider in &mut self.secrets {
            init_one(provider, Target::Secret)?;
        }

        let mut tree = SettingsMap::new();
        for provider in &self.configs {
            fold(&mut tree, provider.data());
        }
        for provider in &self.secrets {
            fold(&mut tree, provider.data());
        }

        info!(
            "Loaded {} top-level settings from {} config and {} secret providers",
            tree.len(),
            self.configs.len(),
            self.secrets.len()
        );
        Ok(tree)
    }
}

fn init_one<P: Provider>(provider: &mut P, target: Target) -> Result<()> {
    debug!(
        "Initializing {} provider '{}' for {target}",
        provider.kind(),
        provider.name()
    );
    provider.init().inspect_err(|e| {
        log::error!(
            "{} provider '{}' failed for {target}: {e}",
            provider.kind(),
            provider.name()
        );
    })
}

/// Last writer wins on top-level keys
fn fold(tree: &mut SettingsMap, data: &SettingsMap) {
    for (key, value) in data {
        tree.insert(key.clone(), value.clone());
    }
}

// =============================================================================
// Tests
// =============================================================================
