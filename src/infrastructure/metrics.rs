use crate::infrastructure::config::MetricsConfig;
use anyhow::Result;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Prometheus-backed metrics; every recording helper is a no-op until `init` installs the exporter
pub struct Metrics;

impl Metrics {
    pub fn init(config: &MetricsConfig) -> Result<()> {
        if !config.enabled {
            info!("Metrics collection disabled");
            return Ok(());
        }

        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid metrics address: {}", e))?;

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus metrics: {}", e))?;

        info!("Metrics collection started successfully on {}", addr);

        Self::init_default_metrics();
        Ok(())
    }

    fn init_default_metrics() {
        counter!("dos_integration_events_received_total", 0);
        counter!("dos_integration_events_rejected_total", 0);
        counter!("dos_integration_change_requests_sent_total", 0);
        counter!("dos_integration_change_requests_failed_total", 0);
        counter!("dos_integration_errors_total", 0);

        gauge!("dos_integration_uptime_seconds", 0.0);
    }

    pub fn increment_events_received() {
        counter!("dos_integration_events_received_total", 1);
    }

    pub fn increment_events_rejected() {
        counter!("dos_integration_events_rejected_total", 1);
    }

    pub fn record_services_matched(matched: u64, valid: u64) {
        counter!("dos_integration_services_matched_total", matched);
        counter!("dos_integration_services_valid_total", valid);
    }

    pub fn increment_change_requests_sent(status: u16) {
        counter!("dos_integration_change_requests_sent_total", 1, "status" => status.to_string());
    }

    pub fn increment_change_requests_failed() {
        counter!("dos_integration_change_requests_failed_total", 1);
    }

    pub fn increment_errors(error_type: &'static str) {
        counter!("dos_integration_errors_total", 1, "type" => error_type);
    }

    pub fn record_event_processing_duration(duration: f64) {
        histogram!("dos_integration_event_processing_duration_seconds", duration);
    }

    pub fn record_change_request_duration(duration: f64) {
        histogram!("dos_integration_change_request_duration_seconds", duration);
    }

    pub fn set_uptime(seconds: f64) {
        gauge!("dos_integration_uptime_seconds", seconds);
    }
}
