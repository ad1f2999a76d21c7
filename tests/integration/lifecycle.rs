//! Supervised lifecycle, end to end: real listeners, real sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;

use score_server::middleware::RequestLogger;
use score_server::observability::Metrics;
use score_server::scoring::ScoringEngine;
use score_server::server::{ApiServer, MetricsServer};
use score_server::supervisor::{ShutdownCause, Supervisor};

use crate::helpers::{noop_tracer, score_config, TestApi, TEST_SCORE_YAML};

const EPHEMERAL: &str = "127.0.0.1:0";

/// Wire both listeners into a supervisor the way the binary does and
/// return it with the API server's bound address.
async fn supervised_service(deadline: Duration) -> (Supervisor, SocketAddr, tempfile::NamedTempFile)
{
    let config = score_config(TEST_SCORE_YAML);
    let metrics = Arc::new(Metrics::new().expect("Failed to build metrics"));
    let mut supervisor = Supervisor::new(deadline, 2);

    let engine = ScoringEngine::new(config.path());
    let logger = RequestLogger::new(noop_tracer(), Arc::clone(&metrics));
    let api = ApiServer::bind(EPHEMERAL.parse().unwrap(), engine, Arc::clone(&metrics), logger)
        .await
        .expect("Failed to bind API server");
    let api_addr = api.local_addr();

    let reporter = supervisor.failure_reporter("api");
    let shutdown = supervisor.shutdown_watch();
    supervisor.spawn(async move {
        if let Err(e) = api.serve(shutdown).await {
            reporter.report(e);
        }
    });

    let scrape = MetricsServer::bind(EPHEMERAL.parse().unwrap(), metrics)
        .await
        .expect("Failed to bind metrics server");
    let reporter = supervisor.failure_reporter("metrics");
    let shutdown = supervisor.shutdown_watch();
    supervisor.spawn(async move {
        if let Err(e) = scrape.serve(shutdown).await {
            reporter.report(e);
        }
    });

    (supervisor, api_addr, config)
}

#[tokio::test]
async fn test_deadline_ends_the_service() {
    let deadline = Duration::from_millis(300);
    let (supervisor, api_addr, _config) = supervised_service(deadline).await;

    let client = reqwest::Client::new();
    let url = format!("http://{}/health", api_addr);

    // The service answers while the deadline has not elapsed.
    let resp = client.get(&url).send().await.expect("health during run");
    assert_eq!(resp.status(), StatusCode::OK);

    let start = Instant::now();
    let cause = supervisor.run().await;
    assert!(matches!(cause, ShutdownCause::DeadlineElapsed));
    // Within the deadline plus scheduling slack, well under the join grace.
    assert!(start.elapsed() < deadline + Duration::from_secs(2));

    // The listener is gone; new connections are refused.
    let result = client
        .get(&url)
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err(), "API still reachable after shutdown");
}

#[tokio::test]
async fn test_keep_alive_connections_stop_at_shutdown() {
    let api = TestApi::start().await;

    // First request establishes a pooled keep-alive connection.
    let resp = api.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    api.shutdown();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The pooled connection was gracefully closed and the listener is gone,
    // so the same client cannot reach the server again.
    let result = api
        .client
        .get(format!("{}/health", api.base_url))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(
        result.is_err(),
        "keep-alive connection served a request after shutdown"
    );
}

#[tokio::test]
async fn test_bind_failure_ends_the_run_before_the_deadline() {
    // Occupy a port so the metrics listener cannot bind it.
    let blocker = tokio::net::TcpListener::bind(EPHEMERAL)
        .await
        .expect("Failed to bind blocker");
    let taken = blocker.local_addr().unwrap();

    let metrics = Arc::new(Metrics::new().expect("Failed to build metrics"));
    let supervisor = {
        let mut supervisor = Supervisor::new(Duration::from_secs(60), 2);
        let reporter = supervisor.failure_reporter("metrics");
        supervisor.spawn(async move {
            match MetricsServer::bind(taken, metrics).await {
                Ok(_) => unreachable!("bind on an occupied port succeeded"),
                Err(e) => reporter.report(e),
            }
        });
        supervisor
    };

    let start = Instant::now();
    match supervisor.run().await {
        ShutdownCause::TaskFailed(failure) => assert_eq!(failure.task, "metrics"),
        other => panic!("expected TaskFailed, got {:?}", other),
    }
    // Nowhere near the 60s deadline.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_surviving_listener_is_stopped_with_the_failed_one() {
    let deadline = Duration::from_secs(60);
    let (supervisor, api_addr, _config) = supervised_service(deadline).await;

    // A third-party failure (not either listener) also ends the run.
    let reporter = supervisor.failure_reporter("api");
    reporter.report("synthetic failure".to_string().into());

    let start = Instant::now();
    let cause = supervisor.run().await;
    assert!(matches!(cause, ShutdownCause::TaskFailed(_)));
    assert!(start.elapsed() < Duration::from_secs(10));

    // The healthy listener went down with the ship.
    let client = reqwest::Client::new();
    let result = client
        .get(format!("http://{}/health", api_addr))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err(), "API still reachable after failure shutdown");
}
