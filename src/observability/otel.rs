//! OpenTelemetry integration for distributed tracing.
//!
//! Builds a span exporter (OTLP over HTTP, or console for local runs),
//! wraps it in a batching tracer provider carrying the service resource
//! attributes, and installs it as the process-wide provider.
//!
//! # Configuration
//!
//! - `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT`: collector host:port (default: `tempo:4318`)
//! - `OTEL_CONSOLE_EXPORTER`: `1` writes spans to stdout instead (local development)
//! - `OTEL_EXPORT_TIMEOUT`: export timeout (default: `10s`)
//!
//! Spans are shipped to `http://{endpoint}/v1/traces`. Tracing is required
//! infrastructure: exporter construction failure is fatal at startup.

use std::sync::atomic::{AtomicBool, Ordering};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing::{info, warn};

use crate::config::TelemetryConfig;

// Semantic convention key (avoiding dependency on semconv_experimental feature)
const SERVICE_NAME: &str = "service.name";

/// Console span exporter, only for testing locally.
pub fn console_exporter() -> opentelemetry_stdout::SpanExporter {
    opentelemetry_stdout::SpanExporter::default()
}

/// OTLP/HTTP span exporter targeting the configured collector.
///
/// The transport is plain http: the collector lives in the same trust
/// domain and runs without TLS.
///
/// # Errors
///
/// Returns an error if the exporter transport cannot be initialized
/// (e.g. malformed endpoint). Callers treat this as fatal.
pub fn otlp_exporter(
    config: &TelemetryConfig,
) -> Result<opentelemetry_otlp::SpanExporter, Box<dyn std::error::Error + Send + Sync>> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(config.traces_url())
        .with_timeout(config.export_timeout)
        .build()?;
    Ok(exporter)
}

/// Owner of the process-wide tracer provider.
///
/// Construction installs the provider globally (the one boundary where
/// third-party instrumentation expects ambient lookup); everything in this
/// crate takes an explicit tracer from [`Telemetry::tracer`]. Dropping the
/// value flushes buffered spans, so every exit path delivers what it can.
pub struct Telemetry {
    provider: sdktrace::TracerProvider,
    shut_down: AtomicBool,
}

impl Telemetry {
    /// Build the tracer provider and install it globally.
    pub fn init(
        config: &TelemetryConfig,
        service_name: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        // Service identity merged over SDK defaults, computed once.
        let resource = Resource::default().merge(&Resource::new([KeyValue::new(
            SERVICE_NAME,
            service_name.to_string(),
        )]));

        let trace_config = sdktrace::Config::default().with_resource(resource);

        let provider = if config.console_exporter {
            sdktrace::TracerProvider::builder()
                .with_batch_exporter(console_exporter(), runtime::Tokio)
                .with_config(trace_config)
                .build()
        } else {
            sdktrace::TracerProvider::builder()
                .with_batch_exporter(otlp_exporter(config)?, runtime::Tokio)
                .with_config(trace_config)
                .build()
        };

        global::set_tracer_provider(provider.clone());

        if config.console_exporter {
            info!("Tracing initialized (console exporter)");
        } else {
            info!(endpoint = %config.traces_url(), service = service_name, "Tracing initialized");
        }

        Ok(Self {
            provider,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Tracer handle for span creation. Injected into collaborators rather
    /// than looked up globally.
    pub fn tracer(&self) -> sdktrace::Tracer {
        self.provider.tracer("score-server")
    }

    /// Flush buffered spans and shut the provider down.
    ///
    /// Idempotent: only the first call has effect. Returns whether this
    /// call performed the shutdown.
    pub fn shutdown(&self) -> bool {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Err(e) = self.provider.shutdown() {
            warn!("Trace provider shutdown failed: {}", e);
        }
        true
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
