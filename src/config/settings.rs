//! # Configuration Settings
//!
//! Defines the configuration structure for the broker.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use crate::errors::{Error, Result};
use crate::secrets::backends::VaultConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Logging and metrics configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Default backend vault. Every name without a redirect rule lives here.
    #[validate(nested)]
    pub vault: VaultConfig,

    /// Alternate backends and the names routed to them, in match order
    #[validate(nested)]
    pub redirects: Vec<RedirectGroupConfig>,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if self.observability.enable_metrics && self.observability.metrics_port == self.server.port {
            return Err(Error::config("Server and metrics ports cannot be the same"));
        }
        Ok(())
    }

    /// Total number of redirect rules across all groups.
    pub fn redirect_rule_count(&self) -> usize {
        self.redirects.iter().map(|group| group.rules.len()).sum()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Bind address cannot be empty"))]
    pub bind_address: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Serve HTTPS when present
    #[validate(nested)]
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0".to_string(), port: 9000, tls: None }
    }
}

impl ServerConfig {
    /// Get the server socket address string
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// TLS material for the HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TlsConfig {
    #[validate(custom(function = "validate_path"))]
    pub cert_path: PathBuf,
    #[validate(custom(function = "validate_path"))]
    pub key_path: PathBuf,
}

fn validate_path(path: &PathBuf) -> std::result::Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        let mut err = ValidationError::new("empty_path");
        err.message = Some("TLS paths cannot be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            enable_metrics: false,
            metrics_port: 9091,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}

/// One alternate backend and the rules that route names to it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RedirectGroupConfig {
    #[validate(nested)]
    pub vault: VaultConfig,

    #[serde(default)]
    #[validate(nested)]
    pub rules: Vec<RedirectRuleConfig>,
}

/// A `{ref, redirect}` pair. An empty `redirect` keeps the public name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RedirectRuleConfig {
    /// Public secret name this rule matches, exactly
    #[serde(rename = "ref")]
    #[validate(length(min = 1, message = "Redirect ref cannot be empty"))]
    pub reference: String,

    /// Name to use on the alternate backend
    #[serde(default)]
    pub redirect: String,
}

impl RedirectRuleConfig {
    pub fn new(reference: impl Into<String>, redirect: impl Into<String>) -> Self {
        Self { reference: reference.into(), redirect: redirect.into() }
    }

    /// The backend-side name for this rule.
    pub fn target_name(&self) -> &str {
        if self.redirect.is_empty() {
            &self.reference
        } else {
            &self.redirect
        }
    }
}
