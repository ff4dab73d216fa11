//! # Metrics Collection
//!
//! Counters for credential issuance and backend store traffic, optionally
//! exported in Prometheus format.

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Metrics recorder handed to the components that emit counters.
///
/// Without an installed exporter every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record a generated credential
    pub fn record_credential_generated(&self, credential_type: &str) {
        let labels = [("type", credential_type.to_string())];
        counter!("credentials_generated_total", &labels).increment(1);
    }

    /// Record a client-supplied credential
    pub fn record_credential_set(&self, credential_type: &str) {
        let labels = [("type", credential_type.to_string())];
        counter!("credentials_set_total", &labels).increment(1);
    }

    /// Record the outcome of one backend store operation
    pub fn record_store_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        let labels = [("operation", operation.to_string()), ("status", status.to_string())];
        counter!("store_operations_total", &labels).increment(1);
    }

    fn register_descriptions(&self) {
        describe_counter!(
            "credentials_generated_total",
            Unit::Count,
            "Credentials generated, by credential type"
        );
        describe_counter!(
            "credentials_set_total",
            Unit::Count,
            "Client-supplied credentials stored, by credential type"
        );
        describe_counter!(
            "store_operations_total",
            Unit::Count,
            "Backend store operations, by operation and outcome"
        );
    }
}

/// Initialize the Prometheus exporter
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", "bosh-vault")
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    MetricsRecorder::new().register_descriptions();

    info!(metrics_addr = %metrics_addr, "Metrics collection initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording_without_exporter() {
        let recorder = MetricsRecorder::new();
        recorder.record_credential_generated("password");
        recorder.record_credential_set("certificate");
        recorder.record_store_operation("set", true);
        recorder.record_store_operation("get_by_id", false);
    }

    #[test]
    fn test_init_metrics_disabled() {
        let config = ObservabilityConfig { enable_metrics: false, ..Default::default() };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_init_metrics_no_port() {
        let config =
            ObservabilityConfig { enable_metrics: true, metrics_port: 0, ..Default::default() };
        assert!(init_metrics(&config).is_ok());
    }
}
