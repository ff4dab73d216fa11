//! # Configuration Management
//!
//! Configuration is layered: built-in defaults, then an optional file
//! (TOML, YAML or JSON by extension), then `BV__`-prefixed environment variables
//! such as `BV__SERVER__PORT=8443` or `BV__VAULT__TOKEN=hvs.xxx`.

pub mod settings;

pub use settings::{
    AppConfig, ObservabilityConfig, RedirectGroupConfig, RedirectRuleConfig, ServerConfig,
    TlsConfig,
};

use crate::errors::Result;
use std::path::Path;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "BV";

/// Load and validate configuration.
///
/// A missing `path` means defaults plus environment only.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
    );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;

    tracing::debug!(
        redirect_groups = config.redirects.len(),
        redirect_rules = config.redirect_rule_count(),
        "Configuration loaded"
    );
    Ok(config)
}
