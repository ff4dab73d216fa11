//! # Error Handling
//!
//! Process-level errors for the broker: configuration, transport and I/O.
//! Request-level failures live in [`crate::secrets::SecretsError`].

use crate::secrets::SecretsError;

/// Custom result type for process-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for startup and serving
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors (listener, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Secret store failures surfaced during startup
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::config(format!("Validation failed: {}", err))
    }
}
