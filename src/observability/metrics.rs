//! Prometheus metrics for score-server.
//!
//! Implements RED methodology metrics (Rate, Errors, Duration) for
//! HTTP requests and score runs.

use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Prometheus metrics registry with all application metrics.
///
/// Follows RED methodology:
/// - **R**ate: Request throughput (requests/second)
/// - **E**rrors: Error rate (5xx responses, failed score runs)
/// - **D**uration: Latency distribution (histograms)
pub struct Metrics {
    registry: Registry,
    start_time: Instant,

    // === HTTP Metrics ===
    /// Total HTTP requests by method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration in seconds
    pub http_request_duration_seconds: HistogramVec,

    /// Active HTTP connections
    pub http_connections_active: Gauge,

    /// Handler panics caught by the logging middleware
    pub http_handler_panics_total: Counter,

    // === Scoring Metrics ===
    /// Score runs by outcome
    pub score_runs_total: CounterVec,

    /// Score run duration in seconds
    pub score_run_duration_seconds: Histogram,

    // === Process Metrics ===
    /// Process uptime in seconds
    pub process_uptime_seconds: Gauge,
}

impl Metrics {
    /// Create a new metrics registry with all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // HTTP latency buckets (in seconds)
        let http_buckets = vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ];

        // Score run buckets (in seconds)
        let score_buckets = vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5];

        let http_requests_total = CounterVec::new(
            Opts::new("score_server_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "score_server_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(http_buckets),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let http_connections_active = Gauge::new(
            "score_server_http_connections_active",
            "Active HTTP connections",
        )?;
        registry.register(Box::new(http_connections_active.clone()))?;

        let http_handler_panics_total = Counter::new(
            "score_server_http_handler_panics_total",
            "Handler panics caught by the logging middleware",
        )?;
        registry.register(Box::new(http_handler_panics_total.clone()))?;

        let score_runs_total = CounterVec::new(
            Opts::new("score_server_score_runs_total", "Total score runs"),
            &["status"],
        )?;
        registry.register(Box::new(score_runs_total.clone()))?;

        let score_run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "score_server_score_run_duration_seconds",
                "Score run duration in seconds",
            )
            .buckets(score_buckets),
        )?;
        registry.register(Box::new(score_run_duration_seconds.clone()))?;

        let process_uptime_seconds = Gauge::new(
            "score_server_process_uptime_seconds",
            "Process uptime in seconds",
        )?;
        registry.register(Box::new(process_uptime_seconds.clone()))?;

        Ok(Self {
            registry,
            start_time: Instant::now(),
            http_requests_total,
            http_request_duration_seconds,
            http_connections_active,
            http_handler_panics_total,
            score_runs_total,
            score_run_duration_seconds,
            process_uptime_seconds,
        })
    }

    /// Record HTTP request metrics.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();

        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a score run.
    pub fn record_score_run(&self, success: bool, duration_secs: f64) {
        let status = if success { "success" } else { "error" };
        self.score_runs_total.with_label_values(&[status]).inc();
        self.score_run_duration_seconds.observe(duration_secs);
    }

    /// Increment active connections.
    pub fn inc_connections(&self) {
        self.http_connections_active.inc();
    }

    /// Decrement active connections.
    pub fn dec_connections(&self) {
        self.http_connections_active.dec();
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        self.process_uptime_seconds
            .set(self.start_time.elapsed().as_secs_f64());

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Get the Prometheus registry (for custom metrics).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
