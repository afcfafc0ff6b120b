//! Common test utilities for cfgstack integration tests
//!
//! Provides a scratch directory with an in-memory environment and helpers to
//! write provider fixtures into it.

#![allow(dead_code)]

use cfgstack::{ConfigManager, ConfigManagerBuilder, MapEnv};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Install a test logger once; `RUST_LOG=debug` shows resolution steps
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scratch directory plus the environment a manager will see
pub struct TestEnv {
    pub dir: TempDir,
    pub env: MapEnv,
}

impl TestEnv {
    /// Empty environment whose local files resolve inside the scratch directory
    pub fn new() -> Self {
        init_logger();
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_string_lossy().to_string();
        let env = MapEnv::new()
            .with("CONFIG_LOCAL_PATH", path.clone())
            .with("SECRET_LOCAL_PATH", path);
        Self { dir, env }
    }

    /// Add a variable to the environment
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.set(key, value);
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the scratch directory
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    /// Path of the scratch `.env` (which may not exist)
    pub fn env_file(&self) -> PathBuf {
        self.dir.path().join(".env")
    }

    /// Builder reading this environment and the scratch `.env`
    pub fn builder(&self) -> ConfigManagerBuilder {
        ConfigManager::builder()
            .env_source(Arc::new(self.env.clone()))
            .env_file(self.env_file())
    }

    pub fn manager(&self) -> ConfigManager {
        self.builder().build()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard configuration document with nested structures
pub const CONFIG_YAML: &str = r#"
server:
  host: 0.0.0.0
  port: 8080
  timeout: 1m30s
features:
  - search
  - export
database:
  url: postgres://localhost/app
  password: from-config
"#;

/// Secrets overriding part of [`CONFIG_YAML`]
pub const SECRETS_YAML: &str = r#"
database:
  password: s3cret
api_token: tok-123
"#;
