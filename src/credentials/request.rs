//! Request envelopes.
//!
//! Only the discriminator fields are decoded here. The variant payload stays a
//! [`RawValue`] until the `type` has been resolved.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::secrets::{Result, SecretsError};

/// How a generation request treats an existing secret of the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Always write a new version.
    #[default]
    Overwrite,
    /// Return the existing latest version unchanged if there is one.
    NoOverwrite,
    /// Accepted for compatibility; behaves like `Overwrite`.
    Converge,
}

impl GenerationMode {
    pub fn is_no_overwrite(&self) -> bool {
        matches!(self, Self::NoOverwrite)
    }
}

/// `POST /v1/data` body.
#[derive(Debug, Deserialize)]
pub struct GenerationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub parameters: Option<Box<RawValue>>,
}

impl GenerationRequest {
    pub fn parse(body: &[u8]) -> Result<Self> {
        let request: Self = serde_json::from_slice(body)?;
        require_name(&request.name)?;
        Ok(request)
    }
}

/// `PUT /v1/data` body.
#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub value: Box<RawValue>,
}

impl SetRequest {
    pub fn parse(body: &[u8]) -> Result<Self> {
        let request: Self = serde_json::from_slice(body)?;
        require_name(&request.name)?;
        Ok(request)
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SecretsError::parse("missing required field: name"));
    }
    Ok(())
}
