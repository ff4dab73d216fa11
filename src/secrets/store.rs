//! Single-backend secret store.
//!
//! [`SecretStore`] is the uniform contract the HTTP layer and the credential
//! dispatcher program against. [`VaultStore`] implements it over exactly one
//! [`VaultConnection`](super::backends::VaultConnection).

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn, Instrument};

use super::backends::SharedConnection;
use super::error::{Result, SecretsError};
use super::identifier::{decode, encode, SecretIdentifier, VersionedSecretName};
use super::types::Secret;
use crate::observability::MetricsRecorder;
use crate::store_span;

/// Versioned secret storage keyed by name.
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Fetch the version encoded in `id`.
    ///
    /// The returned [`Secret`] carries `id` unchanged, so a "latest" identifier
    /// stays a "latest" identifier.
    async fn get_by_id(&self, id: &SecretIdentifier) -> Result<Secret>;

    /// Every non-destroyed version of `name`, newest first.
    ///
    /// Versions that fail to load are logged and left out.
    async fn get_all_by_name(&self, name: &str) -> Result<Vec<Secret>>;

    /// Most recent version of `name`.
    async fn get_latest_by_name(&self, name: &str) -> Result<Secret> {
        self.get_by_id(&encode(&VersionedSecretName::latest(name))).await
    }

    /// Newest non-destroyed version of `name` under its concrete identifier.
    ///
    /// Reads only that one version. A failed read is returned rather than skipped.
    async fn get_newest_by_name(&self, name: &str) -> Result<Secret>;

    async fn delete_by_name(&self, name: &str) -> Result<()>;

    /// Write a new version and return its identifier.
    async fn set(&self, name: &str, value: Value) -> Result<SecretIdentifier>;

    async fn healthy(&self) -> bool;
}

/// Secret store over one backend connection.
#[derive(Clone)]
pub struct VaultStore {
    connection: SharedConnection,
    metrics: MetricsRecorder,
}

impl fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultStore").field("backend", &self.connection.describe()).finish()
    }
}

impl VaultStore {
    pub fn new(connection: SharedConnection) -> Self {
        Self::with_metrics(connection, MetricsRecorder::new())
    }

    pub fn with_metrics(connection: SharedConnection, metrics: MetricsRecorder) -> Self {
        Self { connection, metrics }
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    fn observe<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        self.metrics.record_store_operation(operation, result.is_ok());
        result
    }
}

#[async_trait]
impl SecretStore for VaultStore {
    async fn get_by_id(&self, id: &SecretIdentifier) -> Result<Secret> {
        let secret = decode(id)?;
        let result = self
            .connection
            .get(&secret.name, secret.version)
            .instrument(store_span!("get_by_id", secret.name))
            .await;
        let value = self.observe("get_by_id", result)?;

        Ok(Secret { id: id.clone(), name: secret.name, value })
    }

    async fn get_all_by_name(&self, name: &str) -> Result<Vec<Secret>> {
        let result = self
            .connection
            .get_metadata(name)
            .instrument(store_span!("get_metadata", name))
            .await;
        let index = self.observe("get_metadata", result)?;
        if index.is_empty() {
            return Err(SecretsError::not_found(name));
        }

        let newest = index.len() as u64;
        let mut secrets = Vec::with_capacity(index.len());
        for version in (1..=newest).rev() {
            if index.is_destroyed(version) {
                debug!(name = %name, version, "Skipping destroyed version");
                continue;
            }

            let id = encode(&VersionedSecretName::new(name, version));
            match self.get_by_id(&id).await {
                Ok(secret) => secrets.push(secret),
                Err(e) => {
                    warn!(name = %name, version, error = %e, "Failed to load secret version, omitting it");
                }
            }
        }

        Ok(secrets)
    }

    async fn get_newest_by_name(&self, name: &str) -> Result<Secret> {
        let result = self
            .connection
            .get_metadata(name)
            .instrument(store_span!("get_metadata", name))
            .await;
        let index = self.observe("get_metadata", result)?;

        let newest = (1..=index.len() as u64)
            .rev()
            .find(|version| !index.is_destroyed(*version))
            .ok_or_else(|| SecretsError::not_found(name))?;
        self.get_by_id(&encode(&VersionedSecretName::new(name, newest))).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<()> {
        let result =
            self.connection.delete(name).instrument(store_span!("delete_by_name", name)).await;
        self.observe("delete_by_name", result)
    }

    async fn set(&self, name: &str, value: Value) -> Result<SecretIdentifier> {
        let result = self.connection.set(name, &value).instrument(store_span!("set", name)).await;
        let version = self.observe("set", result)?;
        if version == 0 {
            return Err(SecretsError::storage(format!(
                "backend returned no version for '{}'",
                name
            )));
        }

        debug!(name = %name, version, "Stored secret version");
        Ok(encode(&VersionedSecretName::new(name, version)))
    }

    async fn healthy(&self) -> bool {
        self.connection.healthy().await
    }
}
