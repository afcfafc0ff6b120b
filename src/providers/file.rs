//! Local file provider

use super::{Provider, ProviderKind};
use crate::error::{Error, Result};
use crate::format::ConfigType;
use crate::settings::SettingsMap;
use log::debug;
use std::path::{Path, PathBuf};

/// Reads `<name>.<ext>` of the declared type from the first search path that has it
pub struct FileProvider {
    name: String,
    config_type: ConfigType,
    paths: Vec<PathBuf>,
    loaded_from: Option<PathBuf>,
    data: SettingsMap,
}

impl FileProvider {
    /// Create a provider searching the current directory
    pub fn new(name: impl Into<String>, config_type: ConfigType) -> Self {
        Self {
            name: name.into(),
            config_type,
            paths: Vec::new(),
            loaded_from: None,
            data: SettingsMap::new(),
        }
    }

    /// Replace the search paths (empty means the current directory).
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths.into_iter().map(expand_home).collect();
        self
    }

    /// Add one search path after the existing ones
    #[must_use]
    pub fn add_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(expand_home(path.into()));
        self
    }

    /// File the data was read from, once loaded
    #[must_use]
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    fn effective_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }

    /// Candidate file names in preference order
    fn candidates(&self) -> Vec<String> {
        let has_own_extension = Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.config_type
                    .extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            });

        if has_own_extension {
            return vec![self.name.clone()];
        }

        let mut names: Vec<String> = self
            .config_type
            .extensions()
            .iter()
            .map(|ext| format!("{}.{}", self.name, ext))
            .collect();
        names.push(self.name.clone());
        names
    }

    fn locate(&self) -> Result<PathBuf> {
        let paths = self.effective_paths();
        let candidates = self.candidates();

        for dir in &paths {
            for candidate in &candidates {
                let path = dir.join(candidate);
                if path.is_file() {
                    return Ok(path);
                }
            }
        }

        Err(Error::ConfigNotFound {
            name: self.name.clone(),
            paths,
        })
    }
}

impl Provider for FileProvider {
    fn init(&mut self) -> Result<()> {
        let path = self.locate()?;
        debug!("Loading {} config file {}", self.config_type, path.display());
        self.data = self.config_type.read(&path)?;
        self.loaded_from = Some(path);
        Ok(())
    }

    fn data(&self) -> &SettingsMap {
        &self.data
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalFile
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(&path));
        }
    }
    path
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_loads_from_first_matching_path() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        std::fs::write(second.path().join("app.json"), r#"{"from": "second"}"#).unwrap();

        let mut provider = FileProvider::new("app", ConfigType::Json)
            .search_paths(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        provider.init().unwrap();

        assert_eq!(provider.data()["from"], json!("second"));
        assert_eq!(
            provider.loaded_from().unwrap(),
            second.path().join("app.json")
        );

        // an earlier path takes priority once it has the file
        std::fs::write(first.path().join("app.json"), r#"{"from": "first"}"#).unwrap();
        let mut provider = FileProvider::new("app", ConfigType::Json)
            .search_paths(vec![first.path().to_path_buf()])
            .add_search_path(second.path());
        provider.init().unwrap();
        assert_eq!(provider.data()["from"], json!("first"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yml_extension_and_explicit_name() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("secrets.yml"), "token: abc\n").unwrap();

        let mut provider = FileProvider::new("secrets", ConfigType::Yaml)
            .search_paths(vec![dir.path().to_path_buf()]);
        provider.init().unwrap();
        assert_eq!(provider.data()["token"], json!("abc"));

        let mut provider = FileProvider::new("secrets.yml", ConfigType::Yaml)
            .search_paths(vec![dir.path().to_path_buf()]);
        provider.init().unwrap();
        assert_eq!(provider.data()["token"], json!("abc"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let mut provider = FileProvider::new("config", ConfigType::Json)
            .search_paths(vec![dir.path().to_path_buf()]);

        let err = provider.init().unwrap_err();
        assert!(err.is_not_found());
        assert!(provider.data().is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{\"a\": [1,").unwrap();
        let mut provider = FileProvider::new("config", ConfigType::Json)
            .search_paths(vec![dir.path().to_path_buf()]);

        assert!(matches!(provider.init().unwrap_err(), Error::Parse { .. }));
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home(PathBuf::from("~/conf"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("conf"));
        }
        assert_eq!(expand_home(PathBuf::from("/etc")), PathBuf::from("/etc"));
    }
}
