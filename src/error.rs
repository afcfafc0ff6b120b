//! Error types for cfgstack

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cfgstack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cfgstack
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file '{name}' not found in {paths:?}")]
    ConfigNotFound { name: String, paths: Vec<PathBuf> },

    // -------------------------------------------------------------------------
    // Parsing Errors
    // -------------------------------------------------------------------------
    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Unsupported config type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to unmarshal settings: {0}")]
    Unmarshal(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Remote Errors
    // -------------------------------------------------------------------------
    #[cfg(feature = "remote")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status} for '{resource}'")]
    RemoteStatus {
        provider: String,
        resource: String,
        status: u16,
    },

    #[error("Data corruption detected in '{resource}': {reason}")]
    DataCorruption { resource: String, reason: String },

    #[error("Failed to decode remote payload: {0}")]
    Decode(String),

    #[error("Unsupported remote provider: {0}")]
    UnsupportedRemoteProvider(String),

    // -------------------------------------------------------------------------
    // Database Errors
    // -------------------------------------------------------------------------
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unsupported database driver: {0}")]
    UnsupportedDriver(String),

    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feature '{0}' is not enabled")]
    FeatureDisabled(&'static str),
}

impl Error {
    /// Check if this is a "not found" type error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ConfigNotFound { .. } => true,
            Error::RemoteStatus { status, .. } => *status == 404,
            Error::FileRead { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Check if this is an integrity failure on fetched data
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::DataCorruption { .. })
    }

    /// Build a parse error for a named source
    pub(crate) fn parse(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Parse {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
