//! Process-local versioned backend.
//!
//! Mirrors the KV v2 versioning model closely enough to exercise the store:
//! versions are dense and 1-indexed per name, individual versions can be destroyed,
//! and deleting a name drops its whole history.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{BackendKind, VaultConnection};
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::types::VersionIndex;

#[derive(Debug, Clone)]
struct StoredVersion {
    value: Option<Value>,
}

impl StoredVersion {
    fn is_destroyed(&self) -> bool {
        self.value.is_none()
    }
}

/// In-memory vault. Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVault {
    inner: Arc<RwLock<HashMap<String, Vec<StoredVersion>>>>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permanently destroy one version, keeping its slot in the version index.
    pub async fn destroy_version(&self, name: &str, version: u64) -> Result<()> {
        let mut data = self.inner.write().await;
        let slot = data
            .get_mut(name)
            .and_then(|versions| slot_index(version).and_then(|i| versions.get_mut(i)))
            .ok_or_else(|| SecretsError::not_found(format!("{} version {}", name, version)))?;
        slot.value = None;
        Ok(())
    }

    /// Number of versions ever written under `name` (destroyed ones included).
    pub async fn version_count(&self, name: &str) -> usize {
        self.inner.read().await.get(name).map_or(0, Vec::len)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.contains_key(name)
    }
}

fn slot_index(version: u64) -> Option<usize> {
    usize::try_from(version).ok().and_then(|v| v.checked_sub(1))
}

#[async_trait]
impl VaultConnection for InMemoryVault {
    async fn get(&self, name: &str, version: u64) -> Result<Value> {
        let data = self.inner.read().await;
        let versions = data.get(name).ok_or_else(|| SecretsError::not_found(name))?;

        let stored = if version == 0 {
            versions.last()
        } else {
            slot_index(version).and_then(|i| versions.get(i))
        };

        stored
            .and_then(|v| v.value.clone())
            .ok_or_else(|| SecretsError::not_found(format!("{} version {}", name, version)))
    }

    async fn get_metadata(&self, name: &str) -> Result<VersionIndex> {
        let data = self.inner.read().await;
        let versions = data.get(name).ok_or_else(|| SecretsError::not_found(name))?;

        let mut index = VersionIndex::new();
        for (number, stored) in (1u64..).zip(versions.iter()) {
            index.insert(number, stored.is_destroyed());
        }
        Ok(index)
    }

    async fn set(&self, name: &str, value: &Value) -> Result<u64> {
        let mut data = self.inner.write().await;
        let versions = data.entry(name.to_string()).or_default();
        versions.push(StoredVersion { value: Some(value.clone()) });
        let version = versions.len() as u64;
        debug!(name = %name, version, "Stored secret version in memory");
        Ok(version)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut data = self.inner.write().await;
        data.remove(name).map(|_| ()).ok_or_else(|| SecretsError::not_found(name))
    }

    async fn healthy(&self) -> bool {
        true
    }

    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_versions_are_dense_and_one_indexed() {
        let vault = InMemoryVault::new();
        assert_eq!(vault.set("k", &json!("a")).await.unwrap(), 1);
        assert_eq!(vault.set("k", &json!("b")).await.unwrap(), 2);
        assert_eq!(vault.set("other", &json!("x")).await.unwrap(), 1);

        assert_eq!(vault.get("k", 1).await.unwrap(), json!("a"));
        assert_eq!(vault.get("k", 2).await.unwrap(), json!("b"));
        assert_eq!(vault.get("k", 0).await.unwrap(), json!("b"));
        assert!(vault.get("k", 3).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_destroyed_versions_stay_indexed() {
        let vault = InMemoryVault::new();
        for v in ["a", "b", "c"] {
            vault.set("k", &json!(v)).await.unwrap();
        }
        vault.destroy_version("k", 2).await.unwrap();

        let index = vault.get_metadata("k").await.unwrap();
        assert_eq!(index.len(), 3);
        assert!(index.is_destroyed(2));
        assert!(!index.is_destroyed(3));
        assert!(vault.get("k", 2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_removes_history() {
        let vault = InMemoryVault::new();
        vault.set("k", &json!("a")).await.unwrap();
        vault.delete("k").await.unwrap();

        assert!(!vault.contains("k").await);
        assert!(vault.get_metadata("k").await.unwrap_err().is_not_found());
        assert!(vault.delete("k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let vault = InMemoryVault::new();
        let handle = vault.clone();
        vault.set("k", &json!(1)).await.unwrap();
        assert_eq!(handle.version_count("k").await, 1);
    }
}
