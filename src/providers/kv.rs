//! Key-value store provider
//!
//! Reads one document stored under a key and parses it with the declared
//! type. Supported protocols:
//! - `consul`: `GET {address}/v1/kv/{key}?raw`
//! - `etcd3`: `POST {address}/v3/kv/range` on the JSON gateway

use super::{Provider, ProviderKind};
use crate::error::{Error, Result};
use crate::format::ConfigType;
use crate::settings::SettingsMap;

/// Wire protocol of the KV store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvProtocol {
    Consul,
    Etcd3,
}

impl KvProtocol {
    /// Map a `REMOTE_PROVIDER` value to a protocol
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedRemoteProvider`] for unknown names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "consul" => Ok(KvProtocol::Consul),
            "etcd3" | "etcd" => Ok(KvProtocol::Etcd3),
            other => Err(Error::UnsupportedRemoteProvider(other.to_string())),
        }
    }
}

/// Loads a settings document from consul or etcd3
pub struct KvProvider {
    protocol: String,
    address: String,
    path: String,
    config_type: ConfigType,
    token: Option<String>,
    data: SettingsMap,
}

impl KvProvider {
    pub fn new(
        protocol: impl Into<String>,
        address: impl Into<String>,
        path: impl Into<String>,
        config_type: ConfigType,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            address: address.into(),
            path: path.into(),
            config_type,
            token: None,
            data: SettingsMap::new(),
        }
    }

    /// ACL token (sent to consul as `X-Consul-Token`)
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL with a scheme and without a trailing slash
    #[cfg_attr(not(feature = "remote"), allow(dead_code))]
    fn base_url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        }
    }

    #[cfg_attr(not(feature = "remote"), allow(dead_code))]
    fn key(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    #[cfg(feature = "remote")]
    fn fetch(&self) -> Result<String> {
        let protocol = KvProtocol::from_name(&self.protocol)?;
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        log::debug!("Reading {} key '{}' from {}", self.protocol, self.key(), self.address);

        match protocol {
            KvProtocol::Consul => self.fetch_consul(&client),
            KvProtocol::Etcd3 => self.fetch_etcd3(&client),
        }
    }

    #[cfg(feature = "remote")]
    fn fetch_consul(&self, client: &reqwest::blocking::Client) -> Result<String> {
        let url = format!("{}/v1/kv/{}?raw", self.base_url(), self.key());
        let mut request = client.get(&url);
        if let Some(token) = &self.token {
            request = request.header("X-Consul-Token", token);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(self.status_error(response.status().as_u16()));
        }
        Ok(response.text()?)
    }

    #[cfg(feature = "remote")]
    fn fetch_etcd3(&self, client: &reqwest::blocking::Client) -> Result<String> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let url = format!("{}/v3/kv/range", self.base_url());
        let body = serde_json::json!({ "key": STANDARD.encode(self.key()) });
        let mut request = client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.header("Authorization", token);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(self.status_error(response.status().as_u16()));
        }

        let range: wire::RangeResponse = response.json()?;
        let encoded = range
            .kvs
            .into_iter()
            .next()
            .map(|kv| kv.value)
            .ok_or_else(|| self.status_error(404))?;
        let raw = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| Error::Decode(e.to_string()))?;
        String::from_utf8(raw).map_err(|e| Error::Decode(e.to_string()))
    }

    #[cfg(feature = "remote")]
    fn status_error(&self, status: u16) -> Error {
        Error::RemoteStatus {
            provider: self.protocol.clone(),
            resource: self.key().to_string(),
            status,
        }
    }
}

impl Provider for KvProvider {
    #[cfg(feature = "remote")]
    fn init(&mut self) -> Result<()> {
        let content = super::run_blocking(&self.path, || self.fetch())?;
        let source = format!("{} key '{}'", self.protocol, self.key());
        self.data = self.config_type.parse(&content, &source)?;
        Ok(())
    }

    #[cfg(not(feature = "remote"))]
    fn init(&mut self) -> Result<()> {
        Err(Error::FeatureDisabled("remote"))
    }

    fn data(&self) -> &SettingsMap {
        &self.data
    }

    fn name(&self) -> &str {
        &self.path
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::RemoteKv
    }
}

#[cfg(feature = "remote")]
mod wire {
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub(super) struct RangeResponse {
        #[serde(default)]
        pub kvs: Vec<KeyValue>,
    }

    #[derive(Deserialize)]
    pub(super) struct KeyValue {
        #[serde(default)]
        pub value: String,
    }
}

// =============================================================================
// Tests
// =============================================================================
