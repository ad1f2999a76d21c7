//! Prometheus scrape listener behavior.

use reqwest::StatusCode;

use crate::helpers::{assert_header_starts_with, assert_status, TestApi, TestMetrics};

#[tokio::test]
async fn test_metrics_scrape_format() {
    let server = TestMetrics::start().await;

    let resp = server.get("/metrics").await;
    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "text/plain; version=0.0.4");

    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("# HELP"));
    assert!(body.contains("score_server_process_uptime_seconds"));
}

#[tokio::test]
async fn test_metrics_unknown_path_returns_404() {
    let server = TestMetrics::start().await;

    let resp = server.get("/health").await;
    assert_status(&resp, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_traffic_shows_up_in_scrape() {
    let api = TestApi::start().await;
    let scrape = TestMetrics::start_with(api.metrics.clone()).await;

    let resp = api.get("/run-scores").await;
    assert_status(&resp, StatusCode::OK);

    let body = scrape
        .get("/metrics")
        .await
        .text()
        .await
        .expect("Failed to read body");
    assert!(
        body.contains("score_server_http_requests_total"),
        "scrape missing request counter"
    );
    assert!(
        body.contains("score_server_score_runs_total"),
        "scrape missing score run counter"
    );
}

#[tokio::test]
async fn test_scrape_and_api_are_isolated() {
    let api = TestApi::start().await;
    let scrape = TestMetrics::start_with(api.metrics.clone()).await;

    // The scoring routes are not reachable through the scrape listener.
    let resp = scrape.get("/run-scores").await;
    assert_status(&resp, StatusCode::NOT_FOUND);

    // And the API keeps working regardless.
    let resp = api.get("/health").await;
    assert_status(&resp, StatusCode::OK);
}
