//! Backend vault connection contract.
//!
//! The store only ever talks to a vault through [`VaultConnection`]. Implementations
//! must be safe to call from many in-flight requests at once; the store neither pools
//! nor serializes access.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::memory::InMemoryVault;
use super::vault::{VaultConfig, VaultKv2Connection};
use crate::secrets::error::Result;
use crate::secrets::types::VersionIndex;

/// Kind of backend behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// HashiCorp Vault KV v2
    VaultKv2,
    /// Process-local versioned map
    InMemory,
    /// Placeholder for a backend that failed to connect
    Unavailable,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VaultKv2 => "vault_kv2",
            Self::InMemory => "in_memory",
            Self::Unavailable => "unavailable",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vault_kv2" => Ok(Self::VaultKv2),
            "in_memory" => Ok(Self::InMemory),
            "unavailable" => Ok(Self::Unavailable),
            _ => Err(format!("Unknown backend kind: {}", s)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set of a backend secret-management service.
#[async_trait]
pub trait VaultConnection: Send + Sync + fmt::Debug {
    /// Read one version of `name`. Version `0` means the most recent version.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](crate::secrets::SecretsError::NotFound) if the name or version is absent
    /// - [`SecretsError::BackendUnavailable`](crate::secrets::SecretsError::BackendUnavailable) if the vault cannot be reached
    async fn get(&self, name: &str, version: u64) -> Result<Value>;

    /// Read the version index of `name`.
    async fn get_metadata(&self, name: &str) -> Result<VersionIndex>;

    /// Write a new version of `name` and return its version number.
    async fn set(&self, name: &str, value: &Value) -> Result<u64>;

    /// Remove `name`. Whether this destroys every version is backend-defined.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Health probe. Never errors; an unreachable backend is simply unhealthy.
    async fn healthy(&self) -> bool;

    fn kind(&self) -> BackendKind;

    /// Human-readable location for logs (address, mount).
    fn describe(&self) -> String;
}

/// Shared handle to a connection. Rules and stores hold clones of this, never
/// references into a collection.
pub type SharedConnection = Arc<dyn VaultConnection>;

/// Opens backend connections from configuration.
#[async_trait]
pub trait VaultConnector: Send + Sync {
    async fn connect(&self, config: &VaultConfig) -> Result<SharedConnection>;
}

/// Connector used by the server binary.
///
/// `memory://` addresses yield an [`InMemoryVault`]; anything else is treated as a
/// Vault server address.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

#[async_trait]
impl VaultConnector for DefaultConnector {
    async fn connect(&self, config: &VaultConfig) -> Result<SharedConnection> {
        if config.is_in_memory() {
            return Ok(Arc::new(InMemoryVault::new()));
        }
        let connection = VaultKv2Connection::connect(config).await?;
        Ok(Arc::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_roundtrip() {
        for kind in [BackendKind::VaultKv2, BackendKind::InMemory, BackendKind::Unavailable] {
            let parsed: BackendKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
        assert!("consul".parse::<BackendKind>().is_err());
    }

    #[tokio::test]
    async fn test_default_connector_memory_address() {
        let config = VaultConfig { address: "memory://".to_string(), ..Default::default() };
        let connection = DefaultConnector.connect(&config).await.unwrap();
        assert_eq!(connection.kind(), BackendKind::InMemory);
        assert!(connection.healthy().await);
    }
}
