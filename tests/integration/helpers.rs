//! Test helpers and utilities

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace as sdktrace;
use reqwest::{Client, Response, StatusCode};
use tempfile::NamedTempFile;
use tokio::sync::watch;

use score_server::middleware::RequestLogger;
use score_server::observability::Metrics;
use score_server::scoring::ScoringEngine;
use score_server::server::{ApiServer, MetricsServer};

/// Score config used by most tests: two metrics, defaults sum to 42.0.
pub const TEST_SCORE_YAML: &str = "\
name: test-score
metrics:
  - name: latency
    weight: 2.0
    default: 10.0
  - name: errors
    weight: 1.0
    default: 22.0
";

/// Write a score config to a temp file and return its guard.
pub fn score_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp config");
    file.write_all(yaml.as_bytes())
        .expect("Failed to write temp config");
    file
}

/// Tracer that records nothing, for tests that only exercise HTTP behavior.
pub fn noop_tracer() -> sdktrace::Tracer {
    sdktrace::TracerProvider::builder().build().tracer("test")
}

/// In-process API server bound to an ephemeral port.
pub struct TestApi {
    pub base_url: String,
    pub client: Client,
    pub metrics: Arc<Metrics>,
    shutdown_tx: watch::Sender<bool>,
    // Keeps the score config alive for the server's lifetime.
    _config: NamedTempFile,
}

#[allow(dead_code)]
impl TestApi {
    /// Start an API server with the default test score config.
    pub async fn start() -> Self {
        Self::start_with_config(TEST_SCORE_YAML).await
    }

    /// Start an API server with a custom score config.
    pub async fn start_with_config(yaml: &str) -> Self {
        let config = score_config(yaml);
        let metrics = Arc::new(Metrics::new().expect("Failed to build metrics"));

        let engine = ScoringEngine::new(config.path());
        let logger = RequestLogger::new(noop_tracer(), Arc::clone(&metrics));

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = ApiServer::bind(addr, engine, Arc::clone(&metrics), logger)
            .await
            .expect("Failed to bind API server");
        let base_url = format!("http://{}", server.local_addr());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            let _ = server.serve(shutdown_rx).await;
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            client,
            metrics,
            shutdown_tx,
            _config: config,
        }
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a POST request with JSON body
    pub async fn post_json<T: serde::Serialize + ?Sized>(&self, path: &str, json: &T) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(json)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Make a request with an arbitrary method and no body
    pub async fn request(&self, method: reqwest::Method, path: &str) -> Response {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Path of the temp score config backing this server.
    pub fn config_path(&self) -> std::path::PathBuf {
        self._config.path().to_path_buf()
    }

    /// Signal the server to stop accepting connections.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// In-process metrics server bound to an ephemeral port.
pub struct TestMetrics {
    pub base_url: String,
    pub client: Client,
    pub metrics: Arc<Metrics>,
    shutdown_tx: watch::Sender<bool>,
}

#[allow(dead_code)]
impl TestMetrics {
    pub async fn start() -> Self {
        Self::start_with(Arc::new(Metrics::new().expect("Failed to build metrics"))).await
    }

    /// Start a scrape listener over an existing registry.
    pub async fn start_with(metrics: Arc<Metrics>) -> Self {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::bind(addr, Arc::clone(&metrics))
            .await
            .expect("Failed to bind metrics server");
        let base_url = format!("http://{}", server.local_addr());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            let _ = server.serve(shutdown_rx).await;
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            client,
            metrics,
            shutdown_tx,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response contains header with prefix
#[allow(dead_code)]
pub fn assert_header_starts_with(response: &Response, name: &str, prefix: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert!(
        value.starts_with(prefix),
        "Header '{}' expected to start with '{}', got '{}'",
        name,
        prefix,
        value
    );
}

/// Assert that response body contains substring
#[allow(dead_code)]
pub async fn assert_body_contains(response: Response, substring: &str) {
    let body = response.text().await.expect("Failed to read body");
    assert!(
        body.contains(substring),
        "Body does not contain '{}'. Body: {}",
        substring,
        &body[..body.len().min(500)]
    );
}
