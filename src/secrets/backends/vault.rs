//! HashiCorp Vault KV v2 backend.
//!
//! Each secret version is stored as `{"value": <json>}` under the configured mount.
//! Reads unwrap the `value` field again, so callers only ever see the payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};
use validator::{Validate, ValidationError};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::backend::{BackendKind, VaultConnection};
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::types::{SecretString, VersionIndex};

/// Address scheme that selects the in-memory backend instead of a Vault server.
pub const MEMORY_ADDRESS_SCHEME: &str = "memory://";

/// Connection settings for one backend vault.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VaultConfig {
    /// Vault server address, or `memory://` for a process-local store
    #[validate(custom(function = "validate_address"))]
    pub address: String,

    /// Vault token. Never logged.
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Vault Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// KV v2 mount path
    #[serde(default = "default_mount_path")]
    #[validate(length(min = 1, message = "Mount path cannot be empty"))]
    pub mount_path: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    #[validate(range(min = 1, max = 300, message = "Vault timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,
}

fn default_mount_path() -> String {
    "secret".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn validate_address(address: &str) -> std::result::Result<(), ValidationError> {
    if address == MEMORY_ADDRESS_SCHEME
        || address.starts_with("http://")
        || address.starts_with("https://")
    {
        return Ok(());
    }
    let mut err = ValidationError::new("vault_address");
    err.message = Some("Vault address must be http(s):// or memory://".into());
    Err(err)
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            namespace: None,
            mount_path: default_mount_path(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl VaultConfig {
    pub fn is_in_memory(&self) -> bool {
        self.address == MEMORY_ADDRESS_SCHEME
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Connection to a Vault KV v2 mount.
pub struct VaultKv2Connection {
    client: VaultClient,
    address: String,
    mount_path: String,
    timeout: Duration,
}

impl std::fmt::Debug for VaultKv2Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKv2Connection")
            .field("address", &self.address)
            .field("mount_path", &self.mount_path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultKv2Connection {
    /// Build a client and probe the server's health endpoint.
    ///
    /// # Errors
    ///
    /// [`SecretsError::BackendUnavailable`] if the settings are unusable or the server
    /// does not answer the health probe.
    pub async fn connect(config: &VaultConfig) -> Result<Self> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token.expose_secret());
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::backend_unavailable(
                &config.address,
                format!("Invalid Vault configuration: {}", e),
            )
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::backend_unavailable(
                &config.address,
                format!("Failed to create Vault client: {}", e),
            )
        })?;

        let connection = Self {
            client,
            address: config.address.clone(),
            mount_path: config.mount_path.clone(),
            timeout: config.timeout(),
        };

        if let Err(e) = tokio::time::timeout(
            connection.timeout,
            vaultrs::sys::health(&connection.client),
        )
        .await
        .map_err(|_| "timed out".to_string())
        .and_then(|r| r.map_err(|e| e.to_string()))
        {
            error!(error = %e, address = %config.address, "Failed to connect to Vault");
            return Err(SecretsError::backend_unavailable(
                &config.address,
                format!("Vault health check failed: {}", e),
            ));
        }
        info!(address = %config.address, mount_path = %config.mount_path, "Connected to Vault");

        Ok(connection)
    }

    /// Run one client call under the configured timeout and map its failure.
    async fn call<T, F>(&self, name: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ClientError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| self.map_error(name, e)),
            Err(_) => {
                error!(name = %name, address = %self.address, timeout = ?self.timeout, "Vault request timed out");
                Err(SecretsError::backend_unavailable(
                    &self.address,
                    format!("request timed out after {:?}", self.timeout),
                ))
            }
        }
    }

    fn map_error(&self, name: &str, err: ClientError) -> SecretsError {
        match err {
            ClientError::APIError { code: 404, .. } => SecretsError::not_found(name),
            ClientError::APIError { code, errors } => {
                error!(name = %name, code, errors = ?errors, "Vault rejected request");
                SecretsError::storage(format!("Vault returned {} for '{}': {:?}", code, name, errors))
            }
            other => {
                error!(name = %name, error = %other, address = %self.address, "Vault request failed");
                SecretsError::backend_unavailable(&self.address, other.to_string())
            }
        }
    }

    fn unwrap_value(name: &str, mut data: HashMap<String, Value>) -> Result<Value> {
        data.remove("value")
            .ok_or_else(|| SecretsError::storage(format!("Secret '{}' has no 'value' field", name)))
    }
}

#[async_trait]
impl VaultConnection for VaultKv2Connection {
    async fn get(&self, name: &str, version: u64) -> Result<Value> {
        debug!(name = %name, version, mount_path = %self.mount_path, "Reading secret from Vault");

        let data: HashMap<String, Value> = if version == 0 {
            self.call(name, kv2::read(&self.client, &self.mount_path, name)).await?
        } else {
            self.call(name, kv2::read_version(&self.client, &self.mount_path, name, version))
                .await?
        };

        Self::unwrap_value(name, data)
    }

    async fn get_metadata(&self, name: &str) -> Result<VersionIndex> {
        let metadata =
            self.call(name, kv2::read_metadata(&self.client, &self.mount_path, name)).await?;

        let mut index = VersionIndex::new();
        for (version, meta) in metadata.versions {
            match version.parse::<u64>() {
                Ok(number) => index.insert(number, meta.destroyed),
                Err(_) => {
                    debug!(name = %name, version = %version, "Ignoring non-numeric version key");
                }
            }
        }
        Ok(index)
    }

    async fn set(&self, name: &str, value: &Value) -> Result<u64> {
        let mut data = HashMap::new();
        data.insert("value".to_string(), value.clone());

        let written = self.call(name, kv2::set(&self.client, &self.mount_path, name, &data)).await?;

        if written.version == 0 {
            return Err(SecretsError::storage(format!(
                "Vault did not report a version for '{}'",
                name
            )));
        }

        debug!(name = %name, version = written.version, mount_path = %self.mount_path, "Stored secret in Vault");
        Ok(written.version)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.call(name, kv2::delete_metadata(&self.client, &self.mount_path, name)).await?;

        info!(name = %name, mount_path = %self.mount_path, "Deleted secret from Vault");
        Ok(())
    }

    async fn healthy(&self) -> bool {
        match self.call("sys/health", vaultrs::sys::health(&self.client)).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, address = %self.address, "Vault health probe failed");
                false
            }
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::VaultKv2
    }

    fn describe(&self) -> String {
        format!("{} (mount {})", self.address, self.mount_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_config_default() {
        let config = VaultConfig::default();
        assert_eq!(config.address, "http://127.0.0.1:8200");
        assert_eq!(config.mount_path, "secret");
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.token.is_none());
        assert!(!config.is_in_memory());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_vault_config_deserialize_defaults() {
        let config: VaultConfig =
            serde_json::from_str(r#"{"address": "https://vault.example.com", "token": "hvs.x"}"#)
                .unwrap();
        assert_eq!(config.mount_path, "secret");
        assert_eq!(config.token.as_ref().map(|t| t.expose_secret()), Some("hvs.x"));
        assert!(!format!("{:?}", config).contains("hvs.x"));
    }

    #[test]
    fn test_vault_config_rejects_bad_address() {
        let config = VaultConfig { address: "vault.local:8200".to_string(), ..Default::default() };
        assert!(config.validate().is_err());

        let config = VaultConfig { address: MEMORY_ADDRESS_SCHEME.to_string(), ..Default::default() };
        assert!(config.validate().is_ok());
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_vault_config_rejects_empty_mount() {
        let config = VaultConfig { mount_path: String::new(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unwrap_value_requires_value_field() {
        let mut data = HashMap::new();
        data.insert("value".to_string(), serde_json::json!({"a": 1}));
        assert_eq!(
            VaultKv2Connection::unwrap_value("k", data).unwrap(),
            serde_json::json!({"a": 1})
        );

        let err = VaultKv2Connection::unwrap_value("k", HashMap::new()).unwrap_err();
        assert!(matches!(err, SecretsError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_vault_fails() {
        let config = VaultConfig {
            address: "http://127.0.0.1:1".to_string(),
            timeout_seconds: 2,
            ..Default::default()
        };
        let err = VaultKv2Connection::connect(&config).await.unwrap_err();
        assert!(matches!(err, SecretsError::BackendUnavailable { .. }));
    }

    /// Needs a dev server: `vault server -dev` with VAULT_ADDR and VAULT_TOKEN exported.
    #[cfg(feature = "vault_tests")]
    #[tokio::test]
    async fn test_live_vault_versions() {
        let config = VaultConfig {
            address: std::env::var("VAULT_ADDR")
                .unwrap_or_else(|_| "http://127.0.0.1:8200".to_string()),
            token: std::env::var("VAULT_TOKEN").ok().map(SecretString::new),
            ..Default::default()
        };
        let connection = VaultKv2Connection::connect(&config).await.unwrap();
        assert!(connection.healthy().await);

        let name = format!("bosh-vault-test/{}", uuid::Uuid::new_v4());
        assert_eq!(connection.set(&name, &serde_json::json!("one")).await.unwrap(), 1);
        assert_eq!(connection.set(&name, &serde_json::json!({"k": 2})).await.unwrap(), 2);

        assert_eq!(connection.get(&name, 0).await.unwrap(), serde_json::json!({"k": 2}));
        assert_eq!(connection.get(&name, 1).await.unwrap(), serde_json::json!("one"));

        let index = connection.get_metadata(&name).await.unwrap();
        assert_eq!(index.len(), 2);
        assert!(!index.is_destroyed(1));

        connection.delete(&name).await.unwrap();
        assert!(connection.get(&name, 0).await.unwrap_err().is_not_found());
    }
}
