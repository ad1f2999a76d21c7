//! Trace export configuration.

use std::time::Duration;

use super::parse::{env_bool, env_duration, env_or};
use super::ConfigError;

/// URL sub-path for the OTLP trace ingestion route.
pub const TRACES_URL_PATH: &str = "/v1/traces";

/// Trace export configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Collector address, host:port
    /// (OTEL_EXPORTER_OTLP_TRACES_ENDPOINT, default tempo:4318).
    pub traces_endpoint: String,
    /// Write spans to stdout instead of the collector
    /// (OTEL_CONSOLE_EXPORTER, default off). Local development only.
    pub console_exporter: bool,
    /// Export timeout (OTEL_EXPORT_TIMEOUT, default 10s).
    pub export_timeout: Duration,
}

impl TelemetryConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            traces_endpoint: env_or("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", "tempo:4318"),
            console_exporter: env_bool("OTEL_CONSOLE_EXPORTER", false),
            export_timeout: env_duration("OTEL_EXPORT_TIMEOUT", "10s")?,
        })
    }

    /// Full collector URL for span ingestion.
    ///
    /// Plain http is deliberate: the collector sits inside the cluster's
    /// trust domain and the transport carries no client data.
    pub fn traces_url(&self) -> String {
        format!("http://{}{}", self.traces_endpoint, TRACES_URL_PATH)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            traces_endpoint: "tempo:4318".to_string(),
            console_exporter: false,
            export_timeout: Duration::from_secs(10),
        }
    }
}
