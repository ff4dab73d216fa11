//! Credential generation and storage.
//!
//! Requests are parsed in two phases. The envelope (`name`, `type`, `mode`) is
//! decoded first with the type-specific payload held back as raw JSON; the `type`
//! discriminator then selects a variant from the closed [`CredentialType`] registry,
//! and only that variant decodes the payload.
//!
//! Each variant provides:
//! - a [`CredentialGenerator`] (`validate`, `generate`) for `POST` requests
//! - a [`CredentialRecord`] (`validate`, `store`) for generated or client-supplied material

pub mod certificate;
pub mod dispatcher;
pub mod password;
pub mod request;
pub mod rsa_keypair;
pub mod ssh_keypair;

pub use dispatcher::CredentialService;
pub use request::{GenerationMode, GenerationRequest, SetRequest};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::secrets::{Result, SecretIdentifier, SecretStore, SecretsError};

/// Discriminators accepted in the `type` field, as listed in error messages.
pub const SUPPORTED_TYPES: &str = "certificate, password, rsa-keypair, ssh-keypair";

/// Closed registry of credential variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialType {
    Password,
    SshKeypair,
    RsaKeypair,
    Certificate,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::SshKeypair => "ssh-keypair",
            Self::RsaKeypair => "rsa-keypair",
            Self::Certificate => "certificate",
        }
    }

    /// Decode generation parameters for this variant.
    ///
    /// A missing payload decodes as `{}`, so variants with all-default parameters
    /// need no `parameters` block.
    pub fn generator(
        &self,
        parameters: Option<&RawValue>,
    ) -> Result<Box<dyn CredentialGenerator>> {
        Ok(match self {
            Self::Password => Box::new(decode_payload::<password::PasswordParameters>(parameters)?),
            Self::SshKeypair => Box::new(decode_payload::<ssh_keypair::SshKeyParameters>(parameters)?),
            Self::RsaKeypair => Box::new(decode_payload::<rsa_keypair::RsaKeyParameters>(parameters)?),
            Self::Certificate => {
                Box::new(decode_payload::<certificate::CertificateParameters>(parameters)?)
            }
        })
    }

    /// Decode client-supplied material for this variant.
    pub fn record(&self, value: &RawValue) -> Result<Box<dyn CredentialRecord>> {
        Ok(match self {
            Self::Password => Box::new(decode_value::<password::PasswordRecord>(value)?),
            Self::SshKeypair => Box::new(decode_value::<ssh_keypair::SshKeyRecord>(value)?),
            Self::RsaKeypair => Box::new(decode_value::<rsa_keypair::RsaKeyRecord>(value)?),
            Self::Certificate => Box::new(decode_value::<certificate::CertificateRecord>(value)?),
        })
    }
}

impl FromStr for CredentialType {
    type Err = SecretsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "password" => Ok(Self::Password),
            "ssh" | "ssh-keypair" => Ok(Self::SshKeypair),
            "rsa" | "rsa-keypair" => Ok(Self::RsaKeypair),
            "certificate" => Ok(Self::Certificate),
            other => Err(SecretsError::unsupported_type(other, SUPPORTED_TYPES)),
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_payload<T: DeserializeOwned>(payload: Option<&RawValue>) -> Result<T> {
    let raw = payload.map_or("{}", RawValue::get);
    Ok(serde_json::from_str(raw)?)
}

fn decode_value<T: DeserializeOwned>(value: &RawValue) -> Result<T> {
    Ok(serde_json::from_str(value.get())?)
}

/// Client-facing result of a generate or set request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialResponse {
    pub id: SecretIdentifier,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    pub value: Value,
}

/// Generated or client-supplied credential material.
#[async_trait]
pub trait CredentialRecord: Send + Sync + fmt::Debug {
    fn credential_type(&self) -> CredentialType;

    /// Required fields are present and non-empty.
    fn validate(&self) -> bool;

    /// JSON value persisted in the backend.
    fn to_value(&self) -> Value;

    /// Persist as a new version of `name`.
    async fn store(&self, store: &dyn SecretStore, name: &str) -> Result<CredentialResponse> {
        let id = store.set(name, self.to_value()).await?;
        Ok(CredentialResponse {
            id,
            name: name.to_string(),
            credential_type: self.credential_type(),
            value: self.to_value(),
        })
    }
}

/// Parameters that can produce a [`CredentialRecord`].
#[async_trait]
pub trait CredentialGenerator: Send + Sync + fmt::Debug {
    fn credential_type(&self) -> CredentialType;

    /// Parameters satisfy the variant's policy.
    fn validate(&self) -> bool;

    /// Produce new material. May read other secrets (a signing CA) but never writes.
    async fn generate(&self, store: &dyn SecretStore) -> Result<Box<dyn CredentialRecord>>;
}
