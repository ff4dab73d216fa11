//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//! Secret values are never recorded; log the name and version instead.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Create a tracing span for request tracking.
///
/// ```rust,ignore
/// let span = request_span!("POST", "/v1/data", credential_type = "password");
/// ```
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for one store operation.
#[macro_export]
macro_rules! store_span {
    ($operation:expr, $name:expr) => {
        tracing::debug_span!(
            "store_operation",
            operation = %$operation,
            name = %$name
        )
    };
}

/// Level filter for the subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn build_env_filter(config: &ObservabilityConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.log_level, e)))
}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if config.json_logging {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|e| Error::internal(format!("Failed to install log subscriber: {}", e)))
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        server_address = %config.server.socket_address(),
        tls_enabled = config.server.tls.is_some(),
        default_backend = %config.vault.address,
        redirect_groups = config.redirects.len(),
        redirect_rules = config.redirect_rule_count(),
        metrics_enabled = config.observability.enable_metrics,
        "bosh-vault configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros_compile() {
        let _span = request_span!("GET", "/v1/data");
        let _span = request_span!("POST", "/v1/data", credential_type = "password");
        let _span = store_span!("get_all_by_name", "/foo");
    }

    #[test]
    fn test_log_config_info() {
        let config = crate::config::AppConfig::default();
        log_config_info(&config);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config =
            ObservabilityConfig { log_level: "bosh_vault=verbose".to_string(), ..Default::default() };
        assert!(matches!(build_env_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_configured_level_builds_filter() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config =
            ObservabilityConfig { log_level: "info,bosh_vault=debug".to_string(), ..Default::default() };
        let filter = build_env_filter(&config).unwrap();
        assert!(filter.to_string().contains("bosh_vault=debug"));
    }
}
