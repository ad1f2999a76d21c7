//! Observability module for tracing and metrics.
//!
//! Provides OpenTelemetry integration for distributed tracing
//! and Prometheus metrics export.
//!
//! # Usage
//!
//! ```rust,ignore
//! use score_server::observability::{Metrics, Telemetry};
//!
//! let telemetry = Telemetry::init(&config.telemetry, &config.logging.service_name)?;
//! let metrics = Metrics::new()?;
//!
//! // ... run servers, create spans via telemetry.tracer() ...
//!
//! telemetry.shutdown();
//! ```

pub mod metrics;
pub mod otel;
pub mod trace;

// Re-exports
pub use metrics::Metrics;
pub use otel::Telemetry;
