//! In-process literal provider, mostly for tests and overrides

use super::{Provider, ProviderKind};
use crate::error::Result;
use crate::format::ConfigType;
use crate::settings::SettingsMap;

/// A literal configuration fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringVar {
    pub name: String,
    pub value: String,
    pub value_type: ConfigType,
}

impl StringVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>, value_type: ConfigType) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            value_type,
        }
    }

    /// Shorthand for a YAML fragment
    pub fn yaml(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, ConfigType::Yaml)
    }

    /// Shorthand for a JSON fragment
    pub fn json(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, ConfigType::Json)
    }
}

/// Parses a [`StringVar`] as if it were a file of its declared type
pub struct StringVarProvider {
    var: StringVar,
    data: SettingsMap,
}

impl StringVarProvider {
    #[must_use]
    pub fn new(var: StringVar) -> Self {
        Self {
            var,
            data: SettingsMap::new(),
        }
    }
}

impl Provider for StringVarProvider {
    fn init(&mut self) -> Result<()> {
        let source = format!("string var '{}'", self.var.name);
        self.data = self.var.value_type.parse(&self.var.value, &source)?;
        Ok(())
    }

    fn data(&self) -> &SettingsMap {
        &self.data
    }

    fn name(&self) -> &str {
        &self.var.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalStringVar
    }
}

// =============================================================================
// Tests
// =============================================================================
