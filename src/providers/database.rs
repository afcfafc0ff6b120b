//! Relational database provider (configuration target only)
//!
//! Reads a pre-existing settings table:
//!
//! ```sql
//! CREATE TABLE app_settings (
//!     prefix        VARCHAR(255) NOT NULL,
//!     setting_key   VARCHAR(255) NOT NULL,
//!     setting_value TEXT
//! );
//! ```
//!
//! Rows are scoped by one or more prefixes, read in order so later prefixes
//! override earlier ones. Dotted keys become nested maps.

use super::{Provider, ProviderKind};
use crate::error::{Error, Result};
use crate::format::ConfigType;
use crate::settings::{SettingsMap, cast};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid identifier regex")
});

/// Database engines the provider can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    MySql,
    Sqlite,
}

impl Driver {
    /// Detect the driver from a DSN scheme
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDriver`] for any other scheme.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let scheme = dsn.split(':').next().unwrap_or_default().to_ascii_lowercase();
        Self::from_name(&scheme)
    }

    /// Detect the driver from a name such as `postgres` or `sqlite`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDriver`] for unknown names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "postgres" | "postgresql" => Ok(Driver::Postgres),
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "sqlite" => Ok(Driver::Sqlite),
            other => Err(Error::UnsupportedDriver(other.to_string())),
        }
    }

    /// Bind placeholder for the first query parameter
    #[must_use]
    pub fn placeholder(&self) -> &'static str {
        match self {
            Driver::Postgres => "$1",
            Driver::MySql | Driver::Sqlite => "?",
        }
    }
}

/// Loads settings rows from a database table
pub struct DatabaseProvider {
    dsn: String,
    table: String,
    prefixes: Vec<String>,
    value_type: Option<ConfigType>,
    data: SettingsMap,
}

impl DatabaseProvider {
    pub fn new(dsn: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            table: table.into(),
            prefixes: Vec::new(),
            value_type: None,
            data: SettingsMap::new(),
        }
    }

    /// Restrict to rows with these prefixes, in override order
    #[must_use]
    pub fn prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Decode each value as a document of this type instead of inferring scalars
    #[must_use]
    pub fn value_type(mut self, value_type: Option<ConfigType>) -> Self {
        self.value_type = value_type;
        self
    }

    #[cfg_attr(not(feature = "database"), allow(dead_code))]
    fn select_sql(&self, driver: Driver) -> String {
        if self.prefixes.is_empty() {
            format!(
                "SELECT setting_key, setting_value FROM {} ORDER BY prefix, setting_key",
                self.table
            )
        } else {
            format!(
                "SELECT setting_key, setting_value FROM {} WHERE prefix = {} ORDER BY setting_key",
                self.table,
                driver.placeholder()
            )
        }
    }

    #[cfg(feature = "database")]
    fn fetch_rows(&self) -> Result<Vec<(String, Option<String>)>> {
        let driver = Driver::from_dsn(&self.dsn)?;
        validate_identifier(&self.table)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("Failed to start database runtime: {e}")))?;
        runtime.block_on(self.query(driver))
    }

    #[cfg(feature = "database")]
    async fn query(&self, driver: Driver) -> Result<Vec<(String, Option<String>)>> {
        use sqlx::Row;
        use sqlx::any::{AnyPoolOptions, AnyRow};

        fn read_row(row: &AnyRow) -> Result<(String, Option<String>)> {
            Ok((row.try_get("setting_key")?, row.try_get("setting_value")?))
        }

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(&self.dsn)
            .await?;
        let sql = self.select_sql(driver);

        let mut rows = Vec::new();
        if self.prefixes.is_empty() {
            for row in sqlx::query(&sql).fetch_all(&pool).await? {
                rows.push(read_row(&row)?);
            }
        } else {
            for prefix in &self.prefixes {
                log::debug!("Reading settings table '{}' prefix '{prefix}'", self.table);
                for row in sqlx::query(&sql).bind(prefix.clone()).fetch_all(&pool).await? {
                    rows.push(read_row(&row)?);
                }
            }
        }

        pool.close().await;
        Ok(rows)
    }
}

impl Provider for DatabaseProvider {
    #[cfg(feature = "database")]
    fn init(&mut self) -> Result<()> {
        let rows = super::run_blocking(&self.table, || self.fetch_rows())?;
        self.data = rows_to_tree(rows, self.value_type, &self.table)?;
        Ok(())
    }

    #[cfg(not(feature = "database"))]
    fn init(&mut self) -> Result<()> {
        Err(Error::FeatureDisabled("database"))
    }

    fn data(&self) -> &SettingsMap {
        &self.data
    }

    fn name(&self) -> &str {
        &self.table
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::RemoteDb
    }
}

/// Reject table names that are not plain (optionally schema-qualified) identifiers
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] when the name could alter the query.
pub fn validate_identifier(name: &str) -> Result<()> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Fold `(key, value)` rows into a nested map; later rows win
#[cfg_attr(not(feature = "database"), allow(dead_code))]
pub(crate) fn rows_to_tree(
    rows: Vec<(String, Option<String>)>,
    value_type: Option<ConfigType>,
    table: &str,
) -> Result<SettingsMap> {
    let mut tree = SettingsMap::new();
    for (key, raw) in rows {
        let value = match (raw, value_type) {
            (None, _) => Value::Null,
            (Some(raw), Some(ty)) => ty.parse_value(&raw, &format!("{table}.{key}"))?,
            (Some(raw), None) => cast::infer_scalar(&raw),
        };
        insert_path(&mut tree, &key, value);
    }
    Ok(tree)
}

#[cfg_attr(not(feature = "database"), allow(dead_code))]
fn insert_path(tree: &mut SettingsMap, key: &str, value: Value) {
    let mut segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = tree;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(SettingsMap::new()));
        if !entry.is_object() {
            *entry = Value::Object(SettingsMap::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_driver_detection() {
        assert_eq!(Driver::from_dsn("postgres://u@h/db").unwrap(), Driver::Postgres);
        assert_eq!(Driver::from_dsn("mysql://u@h/db").unwrap(), Driver::MySql);
        assert_eq!(Driver::from_dsn("sqlite::memory:").unwrap(), Driver::Sqlite);
        assert!(matches!(
            Driver::from_dsn("mssql://h/db"),
            Err(Error::UnsupportedDriver(d)) if d == "mssql"
        ));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("app_settings").is_ok());
        assert!(validate_identifier("config.app_settings").is_ok());
        assert!(validate_identifier("settings; DROP TABLE users").is_err());
        assert!(validate_identifier("1table").is_err());
    }

    #[test]
    fn test_select_sql_placeholders() {
        let p = DatabaseProvider::new("postgres://h/db", "settings").prefixes(vec!["a".into()]);
        assert!(p.select_sql(Driver::Postgres).ends_with("prefix = $1 ORDER BY setting_key"));
        assert!(p.select_sql(Driver::Sqlite).contains("prefix = ?"));

        let p = DatabaseProvider::new("sqlite::memory:", "settings");
        assert!(!p.select_sql(Driver::Sqlite).contains("WHERE"));
    }

    #[test]
    fn test_rows_to_tree_nests_and_overrides() {
        let rows = vec![
            ("db.host".to_string(), Some("base-host".to_string())),
            ("db.port".to_string(), Some("5432".to_string())),
            ("debug".to_string(), Some("false".to_string())),
            ("db.host".to_string(), Some("prod-host".to_string())),
            ("note".to_string(), None),
        ];
        let tree = rows_to_tree(rows, None, "settings").unwrap();

        assert_eq!(tree["db"], json!({"host": "prod-host", "port": 5432}));
        assert_eq!(tree["debug"], json!(false));
        assert_eq!(tree["note"], Value::Null);
    }

    #[test]
    fn test_rows_to_tree_with_declared_type() {
        let rows = vec![("limits".to_string(), Some(r#"{"max": 3}"#.to_string()))];
        let tree = rows_to_tree(rows, Some(ConfigType::Json), "settings").unwrap();
        assert_eq!(tree["limits"]["max"], json!(3));

        let rows = vec![("broken".to_string(), Some("{".to_string()))];
        assert!(rows_to_tree(rows, Some(ConfigType::Json), "settings").is_err());
    }

    #[test]
    fn test_scalar_then_nested_key_replaces_scalar() {
        let rows = vec![
            ("cache".to_string(), Some("off".to_string())),
            ("cache.ttl".to_string(), Some("30".to_string())),
        ];
        let tree = rows_to_tree(rows, None, "settings").unwrap();
        assert_eq!(tree["cache"], json!({"ttl": 30}));
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_unsupported_driver_fails_init() {
        let mut p = DatabaseProvider::new("oracle://host/db", "settings");
        assert!(matches!(p.init(), Err(Error::UnsupportedDriver(_))));
    }
}
