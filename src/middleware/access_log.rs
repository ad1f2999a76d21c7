//! Access logging middleware.
//!
//! Wraps an arbitrary request handler: starts the request span, awaits the
//! handler behind a panic barrier, then emits exactly one structured access
//! record and one metrics observation regardless of what the handler did. The
//! wrapped handler's response passes through untouched; only a panic is
//! replaced by a synthesized 500.

use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use opentelemetry_sdk::trace as sdktrace;
use uuid::Uuid;

use crate::observability::trace::{context_ids, TracedRequest};
use crate::observability::Metrics;

/// Access logging middleware.
///
/// Log entries are emitted at INFO level with target "access" so the JSON
/// formatter renders them as access records. Logging failures never reach
/// the client: the tracing sink swallows writer errors.
#[derive(Clone)]
pub struct RequestLogger {
    tracer: sdktrace::Tracer,
    metrics: Arc<Metrics>,
}

impl RequestLogger {
    /// Create a new access logger around the injected tracer and metrics.
    pub fn new(tracer: sdktrace::Tracer, metrics: Arc<Metrics>) -> Self {
        Self { tracer, metrics }
    }

    /// Run `handler` for `req` under span, access-log, and metrics
    /// instrumentation.
    pub async fn wrap<B, F, Fut>(
        &self,
        req: Request<B>,
        remote_ip: IpAddr,
        handler: F,
    ) -> Response<Full<Bytes>>
    where
        F: FnOnce(Request<B>) -> Fut,
        Fut: std::future::Future<Output = Response<Full<Bytes>>>,
    {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        let request_id = Uuid::new_v4().to_string();

        let traced = TracedRequest::new(&self.tracer, &req);
        let (trace_id, span_id) = context_ids(traced.context());

        let response = match AssertUnwindSafe(handler(req)).catch_unwind().await {
            Ok(response) => response,
            Err(_) => {
                self.metrics.http_handler_panics_total.inc();
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header("Content-Type", "application/json")
                    .body(Full::new(Bytes::from(r#"{"error":"internal error"}"#)))
                    .unwrap()
            }
        };

        let status = response.status().as_u16();
        let bytes = response.body().size_hint().exact().unwrap_or(0);
        let duration_ms = traced.end(status);

        self.metrics
            .record_http_request(&method, &path, status, duration_ms / 1000.0);

        tracing::info!(
            target: "access",
            method = %method,
            path = %path,
            query = query.as_deref(),
            status = status,
            bytes = bytes,
            duration_ms = duration_ms,
            ip = %remote_ip,
            request_id = %request_id,
            trace_id = trace_id.as_deref(),
            span_id = span_id.as_deref(),
            "{} {} {}",
            method,
            path,
            status
        );

        response
    }
}
