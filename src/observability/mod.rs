//! # Observability Infrastructure
//!
//! Structured logging and metrics for the broker.

pub mod logging;
pub mod metrics;

pub use self::logging::{build_env_filter, init_logging, log_config_info};
pub use self::metrics::{init_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use ::tracing::info;

/// Initialize logging, then metrics when enabled.
pub fn init_observability(config: &ObservabilityConfig) -> Result<MetricsRecorder> {
    init_logging(config)?;
    init_metrics(config)?;

    info!(
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_enabled = config.enable_metrics,
        "Observability initialized"
    );

    Ok(MetricsRecorder::new())
}
