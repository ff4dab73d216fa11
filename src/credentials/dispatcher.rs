//! Request dispatcher: parse, resolve the variant, validate, generate, store.

use std::sync::Arc;
use tracing::{debug, info};

use super::request::{GenerationRequest, SetRequest};
use super::{CredentialResponse, CredentialType};
use crate::observability::MetricsRecorder;
use crate::secrets::{Result, SecretStore, SecretsError};

/// Turns raw request bodies into stored credentials.
#[derive(Debug, Clone)]
pub struct CredentialService {
    store: Arc<dyn SecretStore>,
    metrics: MetricsRecorder,
}

impl CredentialService {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self::with_metrics(store, MetricsRecorder::new())
    }

    pub fn with_metrics(store: Arc<dyn SecretStore>, metrics: MetricsRecorder) -> Self {
        Self { store, metrics }
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// Handle a generation request body.
    ///
    /// In `no-overwrite` mode an existing newest version is returned as-is and no
    /// material is generated. The existence check and the later write are separate
    /// backend calls, so two concurrent requests for an absent name can both write.
    pub async fn generate(&self, body: &[u8]) -> Result<CredentialResponse> {
        let request = GenerationRequest::parse(body)?;
        let credential_type: CredentialType = request.credential_type.parse()?;

        let generator = credential_type.generator(request.parameters.as_deref())?;
        if !generator.validate() {
            return Err(SecretsError::validation_failed(credential_type.as_str()));
        }

        if request.mode.is_no_overwrite() {
            if let Some(existing) = self.existing(&request.name, credential_type).await? {
                debug!(name = %request.name, credential_type = %credential_type, "Secret exists, skipping generation");
                return Ok(existing);
            }
        }

        let record = generator.generate(self.store.as_ref()).await?;
        let response = record.store(self.store.as_ref(), &request.name).await?;

        self.metrics.record_credential_generated(credential_type.as_str());
        info!(
            name = %response.name,
            id = %response.id,
            credential_type = %credential_type,
            "Generated credential"
        );
        Ok(response)
    }

    /// Handle a set request body carrying client-supplied material.
    pub async fn set(&self, body: &[u8]) -> Result<CredentialResponse> {
        let request = SetRequest::parse(body)?;
        let credential_type: CredentialType = request.credential_type.parse()?;

        let record = credential_type.record(&request.value)?;
        if !record.validate() {
            return Err(SecretsError::validation_failed(credential_type.as_str()));
        }

        let response = record.store(self.store.as_ref(), &request.name).await?;

        self.metrics.record_credential_set(credential_type.as_str());
        info!(
            name = %response.name,
            id = %response.id,
            credential_type = %credential_type,
            "Stored credential"
        );
        Ok(response)
    }

    /// Newest live version of `name`, if any.
    async fn existing(
        &self,
        name: &str,
        credential_type: CredentialType,
    ) -> Result<Option<CredentialResponse>> {
        match self.store.get_newest_by_name(name).await {
            Ok(secret) => Ok(Some(CredentialResponse {
                id: secret.id,
                name: secret.name,
                credential_type,
                value: secret.value,
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
