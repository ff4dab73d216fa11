//! Stand-in for a redirect backend that could not be reached at startup.

use async_trait::async_trait;
use serde_json::Value;

use super::backend::{BackendKind, VaultConnection};
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::types::VersionIndex;

/// Connection placeholder. Every operation fails with
/// [`SecretsError::BackendUnavailable`] and the health probe reports unhealthy,
/// so only the names routed here are affected.
#[derive(Debug, Clone)]
pub struct UnavailableConnection {
    address: String,
    reason: String,
}

impl UnavailableConnection {
    pub fn new(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { address: address.into(), reason: reason.into() }
    }

    fn unavailable(&self) -> SecretsError {
        SecretsError::backend_unavailable(&self.address, &self.reason)
    }
}

#[async_trait]
impl VaultConnection for UnavailableConnection {
    async fn get(&self, _name: &str, _version: u64) -> Result<Value> {
        Err(self.unavailable())
    }

    async fn get_metadata(&self, _name: &str) -> Result<VersionIndex> {
        Err(self.unavailable())
    }

    async fn set(&self, _name: &str, _value: &Value) -> Result<u64> {
        Err(self.unavailable())
    }

    async fn delete(&self, _name: &str) -> Result<()> {
        Err(self.unavailable())
    }

    async fn healthy(&self) -> bool {
        false
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Unavailable
    }

    fn describe(&self) -> String {
        format!("{} (unavailable: {})", self.address, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_operation_fails() {
        let conn = UnavailableConnection::new("https://vault-b:8200", "connection refused");
        assert!(!conn.healthy().await);
        assert_eq!(conn.kind(), BackendKind::Unavailable);

        for err in [
            conn.get("foo", 0).await.unwrap_err(),
            conn.get_metadata("foo").await.unwrap_err(),
            conn.set("foo", &Value::Null).await.unwrap_err(),
            conn.delete("foo").await.unwrap_err(),
        ] {
            assert!(matches!(err, SecretsError::BackendUnavailable { .. }));
            assert_eq!(err.status_code(), 500);
        }
    }
}
