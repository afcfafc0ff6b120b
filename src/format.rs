//! Document formats understood by the providers

use crate::error::{Error, Result};
use crate::settings::SettingsMap;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Declared type of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigType {
    /// YAML document (default)
    #[default]
    Yaml,
    /// JSON document
    Json,
}

impl ConfigType {
    /// File extensions tried for this type, preferred first
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ConfigType::Yaml => &["yaml", "yml"],
            ConfigType::Json => &["json"],
        }
    }

    /// Parse a document into a top-level settings map.
    ///
    /// An empty document yields an empty map; a document whose root is not a
    /// map is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the content is malformed, or
    /// [`Error::FeatureDisabled`] for YAML without the `yaml` feature.
    pub fn parse(&self, content: &str, source_name: &str) -> Result<SettingsMap> {
        let value = self.parse_value(content, source_name)?;
        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(SettingsMap::new()),
            other => Err(Error::parse(
                source_name,
                format!("expected a map at the document root, found {}", kind_of(&other)),
            )),
        }
    }

    /// Parse a document into a single value of any shape
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the content is malformed.
    pub fn parse_value(&self, content: &str, source_name: &str) -> Result<Value> {
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        match self {
            ConfigType::Json => {
                serde_json::from_str(content).map_err(|e| Error::parse(source_name, e))
            }
            #[cfg(feature = "yaml")]
            ConfigType::Yaml => {
                serde_yaml::from_str(content).map_err(|e| Error::parse(source_name, e))
            }
            #[cfg(not(feature = "yaml"))]
            ConfigType::Yaml => Err(Error::FeatureDisabled("yaml")),
        }
    }

    /// Read and parse a file of this type
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileRead`] if the file can't be read, or a parse error.
    pub fn read(&self, path: &Path) -> Result<SettingsMap> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse(&content, &path.display().to_string())
    }
}

impl FromStr for ConfigType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigType::Yaml),
            "json" => Ok(ConfigType::Json),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigType::Yaml => f.write_str("yaml"),
            ConfigType::Json => f.write_str("json"),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
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
    fn test_config_type_from_str() {
        assert_eq!("YAML".parse::<ConfigType>().unwrap(), ConfigType::Yaml);
        assert_eq!("yml".parse::<ConfigType>().unwrap(), ConfigType::Yaml);
        assert_eq!(" json ".parse::<ConfigType>().unwrap(), ConfigType::Json);
        assert!(matches!(
            "toml".parse::<ConfigType>(),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_json_nested() {
        let map = ConfigType::Json
            .parse(r#"{"db": {"host": "localhost", "port": 5432}, "debug": true}"#, "inline")
            .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["db"]["port"], json!(5432));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_parse_yaml_nested() {
        let map = ConfigType::Yaml
            .parse("db:\n  host: localhost\n  ports: [1, 2]\nname: app\n", "inline")
            .unwrap();

        assert_eq!(map["db"]["ports"], json!([1, 2]));
        assert_eq!(map["name"], json!("app"));
    }

    #[test]
    fn test_parse_empty_document() {
        let map = ConfigType::Json.parse("  \n", "inline").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_map_root() {
        let err = ConfigType::Json.parse("[1, 2, 3]", "inline").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("a list"));
    }

    #[test]
    fn test_parse_malformed() {
        let err = ConfigType::Json.parse("{\"a\": ", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_read_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"name": "hello"}"#).unwrap();

        let map = ConfigType::Json.read(&path).unwrap();
        assert_eq!(map["name"], json!("hello"));
    }

    #[test]
    fn test_read_nonexistent_file() {
        let result = ConfigType::Json.read(Path::new("/nonexistent/file.json"));
        assert!(matches!(result.unwrap_err(), Error::FileRead { .. }));
    }
}
