//! Secret Manager provider
//!
//! Fetches one secret version through the REST API:
//!
//! ```text
//! GET {endpoint}/v1/projects/{project}/secrets/{secret}/versions/{version}:access
//! ```
//!
//! The payload is base64 in `payload.data` with its CRC32C in
//! `payload.dataCrc32c`. A missing or mismatched checksum fails the load.

use super::{Provider, ProviderKind};
use crate::error::{Error, Result};
use crate::format::ConfigType;
use crate::settings::SettingsMap;

/// Public Secret Manager endpoint
pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";

/// Loads a settings document stored as a versioned secret
pub struct SecretManagerProvider {
    project: String,
    secret: String,
    config_type: ConfigType,
    endpoint: String,
    access_token: Option<String>,
    data: SettingsMap,
}

impl SecretManagerProvider {
    /// `project` may be a bare id or `projects/<id>`; `secret` may carry
    /// `/versions/<n>` (default `latest`)
    pub fn new(
        project: impl Into<String>,
        secret: impl Into<String>,
        config_type: ConfigType,
    ) -> Self {
        Self {
            project: project.into(),
            secret: secret.into(),
            config_type,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            data: SettingsMap::new(),
        }
    }

    /// Override the API base URL
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Bearer token sent with the request
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Full resource name of the secret version
    #[must_use]
    pub fn resource_name(&self) -> String {
        let secret = self.secret.trim_matches('/');
        let base = if secret.starts_with("projects/") {
            secret.to_string()
        } else {
            let project = self.project.trim_matches('/');
            let project = project.strip_prefix("projects/").unwrap_or(project);
            format!("projects/{project}/secrets/{secret}")
        };

        if base.contains("/versions/") {
            base
        } else {
            format!("{base}/versions/latest")
        }
    }

    #[cfg(feature = "remote")]
    fn fetch(&self) -> Result<Vec<u8>> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let resource = self.resource_name();
        let url = format!("{}/v1/{}:access", self.endpoint, resource);
        log::debug!("Accessing secret version {resource}");

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        let mut request = client.get(&url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(Error::RemoteStatus {
                provider: "secret manager".to_string(),
                resource,
                status: response.status().as_u16(),
            });
        }

        let body: wire::AccessResponse = response.json()?;
        let payload = body.payload.ok_or_else(|| Error::DataCorruption {
            resource: resource.clone(),
            reason: "response has no payload".to_string(),
        })?;
        let data = STANDARD
            .decode(payload.data.as_bytes())
            .map_err(|e| Error::Decode(e.to_string()))?;

        verify_checksum(&resource, &data, payload.data_crc32c.as_ref())?;
        Ok(data)
    }
}

impl Provider for SecretManagerProvider {
    #[cfg(feature = "remote")]
    fn init(&mut self) -> Result<()> {
        let raw = super::run_blocking(&self.secret, || self.fetch())?;
        let content = String::from_utf8(raw).map_err(|e| Error::Decode(e.to_string()))?;
        self.data = self.config_type.parse(&content, &self.resource_name())?;
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
        &self.secret
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::RemoteSecretManager
    }
}

/// Compare the payload's CRC32C (Castagnoli) with the server-reported one
#[cfg(feature = "remote")]
pub(crate) fn verify_checksum(
    resource: &str,
    data: &[u8],
    reported: Option<&serde_json::Value>,
) -> Result<()> {
    let corruption = |reason: String| Error::DataCorruption {
        resource: resource.to_string(),
        reason,
    };

    let expected = match reported {
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        _ => None,
    }
    .ok_or_else(|| corruption("payload has no usable CRC32C checksum".to_string()))?;

    let actual = u64::from(crc32c::crc32c(data));
    if actual != expected {
        return Err(corruption(format!(
            "CRC32C mismatch (expected {expected}, computed {actual})"
        )));
    }
    Ok(())
}

#[cfg(feature = "remote")]
mod wire {
    use serde::Deserialize;

    #[derive(Deserialize)]
    pub(super) struct AccessResponse {
        pub payload: Option<SecretPayload>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct SecretPayload {
        #[serde(default)]
        pub data: String,
        #[serde(default)]
        pub data_crc32c: Option<serde_json::Value>,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_name_variants() {
        let p = SecretManagerProvider::new("my-proj", "app-secrets", ConfigType::Yaml);
        assert_eq!(
            p.resource_name(),
            "projects/my-proj/secrets/app-secrets/versions/latest"
        );

        let p = SecretManagerProvider::new("projects/my-proj", "app/versions/3", ConfigType::Yaml);
        assert_eq!(p.resource_name(), "projects/my-proj/secrets/app/versions/3");

        let p = SecretManagerProvider::new(
            "ignored",
            "projects/other/secrets/app",
            ConfigType::Json,
        );
        assert_eq!(p.resource_name(), "projects/other/secrets/app/versions/latest");
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_checksum_verification() {
        use serde_json::json;

        let data = b"key: value\n";
        let good = crc32c::crc32c(data);

        assert!(verify_checksum("r", data, Some(&json!(good.to_string()))).is_ok());
        assert!(verify_checksum("r", data, Some(&json!(good))).is_ok());

        let err = verify_checksum("r", data, Some(&json!((good ^ 1).to_string()))).unwrap_err();
        assert!(err.is_corruption());

        let err = verify_checksum("r", data, None).unwrap_err();
        assert!(err.is_corruption());
    }
}
