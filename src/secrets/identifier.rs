//! Opaque secret identifiers.
//!
//! An identifier is the URL-safe base64 (unpadded) form of a compact JSON object
//! `{"name":"<name>","version":"<n>"}`. JSON takes care of escaping arbitrary
//! characters in the name and base64 keeps the result safe for a URI path segment.
//!
//! Decoding is strict: the decoded pair is re-encoded and compared with the input,
//! so only strings that [`encode`] could have produced are accepted. That keeps the
//! mapping a bijection (no alternative spellings such as padded base64, extra JSON
//! whitespace or zero-prefixed versions).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{Result, SecretsError};

/// Version number that asks the backend for the most recent version.
pub const LATEST_VERSION: u64 = 0;

/// A secret name paired with a backend version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedSecretName {
    pub name: String,
    pub version: u64,
}

impl VersionedSecretName {
    pub fn new(name: impl Into<String>, version: u64) -> Self {
        Self { name: name.into(), version }
    }

    /// The "most recent version" sentinel for `name`.
    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, LATEST_VERSION)
    }

    pub fn is_latest(&self) -> bool {
        self.version == LATEST_VERSION
    }

    /// Same version, different name. Used when the router rewrites names.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.version)
    }
}

/// Wire shape of the identifier payload. Field order is fixed by declaration order,
/// which is what makes `encode` deterministic.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdentifierPayload<'a> {
    #[serde(borrow)]
    name: std::borrow::Cow<'a, str>,
    version: std::borrow::Cow<'a, str>,
}

/// Opaque, client-facing identifier for one version of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretIdentifier(String);

impl SecretIdentifier {
    /// Wrap a client-supplied string without validating it; use [`decode`] to parse.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SecretIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a name/version pair. Never fails.
pub fn encode(secret: &VersionedSecretName) -> SecretIdentifier {
    let version = secret.version.to_string();
    let payload = IdentifierPayload {
        name: std::borrow::Cow::Borrowed(secret.name.as_str()),
        version: std::borrow::Cow::Borrowed(version.as_str()),
    };
    // Serializing a struct of two strings cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    SecretIdentifier(URL_SAFE_NO_PAD.encode(json))
}

/// Decode an identifier previously produced by [`encode`].
///
/// # Errors
///
/// [`SecretsError::InvalidIdentifier`] for anything that is not the exact output of `encode`.
pub fn decode(id: &SecretIdentifier) -> Result<VersionedSecretName> {
    let invalid = || SecretsError::invalid_identifier(id.as_str());

    let bytes = URL_SAFE_NO_PAD.decode(id.as_str()).map_err(|_| invalid())?;
    let payload: IdentifierPayload<'_> = serde_json::from_slice(&bytes).map_err(|_| invalid())?;

    if payload.version.is_empty() || !payload.version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let version: u64 = payload.version.parse().map_err(|_| invalid())?;

    let decoded = VersionedSecretName::new(payload.name.into_owned(), version);
    if encode(&decoded) != *id {
        return Err(invalid());
    }
    Ok(decoded)
}
