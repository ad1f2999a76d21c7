//! HTTP handlers for the scoring routes.

use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use tracing::error;

use crate::observability::Metrics;

use super::{ScoreRequest, ScoringEngine};

/// Handle `GET|POST /run-scores`.
///
/// A POST body may carry `{"values": {"<metric>": <number>}}`; GET (or an
/// empty body) runs with the config file's defaults.
pub async fn run_scores<B>(
    engine: &ScoringEngine,
    metrics: &Metrics,
    req: Request<B>,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let request = match parse_request(req).await {
        Ok(request) => request,
        Err(message) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": message }),
            );
        }
    };

    let start = Instant::now();
    match engine.run(&request) {
        Ok(result) => {
            metrics.record_score_run(true, start.elapsed().as_secs_f64());
            json_response(StatusCode::OK, &result)
        }
        Err(e) => {
            metrics.record_score_run(false, start.elapsed().as_secs_f64());
            error!("Score run failed: {}", e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({ "error": e.to_string() }),
            )
        }
    }
}

/// Handle `GET /health`: fixed success status, no business logic.
pub fn health() -> Response<Full<Bytes>> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    json_response(
        StatusCode::OK,
        &serde_json::json!({ "status": "ok", "timestamp": timestamp }),
    )
}

async fn parse_request<B>(req: Request<B>) -> Result<ScoreRequest, String>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| format!("failed to read body: {}", e))?
        .to_bytes();

    if body.is_empty() {
        return Ok(ScoreRequest::default());
    }

    serde_json::from_slice(&body).map_err(|e| format!("invalid request body: {}", e))
}

fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
