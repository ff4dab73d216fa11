//! Error taxonomy for the secret store and credential pipeline.

use thiserror::Error;

/// Result type for secret store and credential operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Failures surfaced by the store, the router and the credential dispatcher.
///
/// Every variant maps onto a single client-facing class via [`SecretsError::status_code`];
/// the HTTP layer never needs to inspect the message text.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// The request body was not well-formed JSON or did not match the expected shape.
    #[error("error unmarshaling json request: {message}")]
    Parse { message: String },

    /// The credential `type` discriminator is not part of the registry.
    #[error("credential type: {requested} not supported! Must be one of: {supported}")]
    UnsupportedType { requested: String, supported: String },

    /// Parameters were decoded but violate the variant's policy.
    #[error("invalid credential request for {credential_type}")]
    ValidationFailed { credential_type: String },

    /// An identifier string was not produced by the identifier codec.
    #[error("invalid secret identifier: {id}")]
    InvalidIdentifier { id: String },

    /// No secret (or no such version) exists under the requested name.
    #[error("secret not found: {name}")]
    NotFound { name: String },

    /// The backend vault could not be reached or was never connected.
    #[error("backend unavailable ({backend}): {message}")]
    BackendUnavailable { backend: String, message: String },

    /// Credential material could not be produced.
    #[error("problem generating {credential_type}: {message}")]
    Generation { credential_type: String, message: String },

    /// The backend rejected a write or returned an unusable response.
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl SecretsError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn unsupported_type(requested: impl Into<String>, supported: impl Into<String>) -> Self {
        Self::UnsupportedType { requested: requested.into(), supported: supported.into() }
    }

    pub fn validation_failed(credential_type: impl Into<String>) -> Self {
        Self::ValidationFailed { credential_type: credential_type.into() }
    }

    pub fn invalid_identifier(id: impl Into<String>) -> Self {
        Self::InvalidIdentifier { id: id.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn backend_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable { backend: backend.into(), message: message.into() }
    }

    pub fn generation(credential_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { credential_type: credential_type.into(), message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse_error",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::NotFound { .. } => "not_found",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::Generation { .. } => "generation_error",
            Self::Storage { .. } => "storage_error",
        }
    }

    /// HTTP status the boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Parse { .. } | Self::UnsupportedType { .. } | Self::ValidationFailed { .. } => {
                400
            }
            Self::InvalidIdentifier { .. } | Self::NotFound { .. } => 404,
            Self::BackendUnavailable { .. } | Self::Generation { .. } | Self::Storage { .. } => {
                500
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for SecretsError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SecretsError::parse("bad").status_code(), 400);
        assert_eq!(SecretsError::unsupported_type("x", "y").status_code(), 400);
        assert_eq!(SecretsError::validation_failed("password").status_code(), 400);
        assert_eq!(SecretsError::invalid_identifier("zz").status_code(), 404);
        assert_eq!(SecretsError::not_found("k").status_code(), 404);
        assert_eq!(SecretsError::backend_unavailable("b", "down").status_code(), 500);
        assert_eq!(SecretsError::generation("rsa", "oops").status_code(), 500);
        assert_eq!(SecretsError::storage("no version").status_code(), 500);
    }

    #[test]
    fn test_unsupported_type_names_supported_set() {
        let err = SecretsError::unsupported_type("unsupported-x", "password, certificate");
        let message = err.to_string();
        assert!(message.contains("unsupported-x"));
        assert!(message.contains("password, certificate"));
        assert_eq!(err.kind(), "unsupported_type");
    }

    #[test]
    fn test_json_error_becomes_parse_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SecretsError = json_error.into();
        assert!(matches!(err, SecretsError::Parse { .. }));
    }
}
