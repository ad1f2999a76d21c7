//! Request span creation and W3C Trace Context extraction.
//!
//! Every inbound HTTP request gets a server span carrying method, path,
//! and (on completion) status and duration. The parent context is taken
//! from the `traceparent` header when a caller supplies one.

use http::{HeaderMap, Request};
use opentelemetry::{
    propagation::{Extractor, TextMapPropagator},
    trace::{SpanKind, Status, TraceContextExt, Tracer},
    Context, KeyValue,
};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace as sdktrace;
use opentelemetry_semantic_conventions::trace::{
    HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, HTTP_ROUTE, URL_PATH, URL_QUERY,
};
use std::time::Instant;

/// Extract W3C Trace Context from incoming request headers.
pub fn extract_context<B>(request: &Request<B>) -> Context {
    let propagator = TraceContextPropagator::new();
    let extractor = HeaderExtractor(request.headers());
    propagator.extract(&extractor)
}

/// Create a server span for an HTTP request.
///
/// Returns the span context for use in nested spans.
pub fn start_http_span<B>(
    tracer: &sdktrace::Tracer,
    request: &Request<B>,
    parent_context: &Context,
) -> Context {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();

    let span = tracer
        .span_builder(format!("{} {}", method, path))
        .with_kind(SpanKind::Server)
        .with_attributes(vec![
            KeyValue::new(HTTP_REQUEST_METHOD, method),
            KeyValue::new(URL_PATH, path.clone()),
            KeyValue::new(URL_QUERY, query),
            KeyValue::new(HTTP_ROUTE, path),
        ])
        .start_with_context(tracer, parent_context);

    Context::current_with_span(span)
}

/// End an HTTP span with response information.
pub fn end_http_span(context: &Context, status_code: u16, duration_ms: f64) {
    let span = context.span();

    span.set_attribute(KeyValue::new(HTTP_RESPONSE_STATUS_CODE, status_code as i64));
    span.set_attribute(KeyValue::new("http.request.duration_ms", duration_ms));

    // Server errors mark the span; anything else stays Unset per
    // OpenTelemetry conventions (client errors are not span errors).
    if status_code >= 500 {
        span.set_status(Status::error(format!("HTTP {}", status_code)));
    }

    span.end();
}

/// Trace and span ids of the active span, for log correlation.
pub fn context_ids(context: &Context) -> (Option<String>, Option<String>) {
    let span = context.span();
    let sc = span.span_context();
    if sc.is_valid() {
        (
            Some(sc.trace_id().to_string()),
            Some(sc.span_id().to_string()),
        )
    } else {
        (None, None)
    }
}

/// Helper struct for tracing an HTTP request with timing.
pub struct TracedRequest {
    context: Context,
    start: Instant,
}

impl TracedRequest {
    /// Start tracing a new HTTP request.
    pub fn new<B>(tracer: &sdktrace::Tracer, request: &Request<B>) -> Self {
        let parent = extract_context(request);
        let context = start_http_span(tracer, request, &parent);

        Self {
            context,
            start: Instant::now(),
        }
    }

    /// Get the trace context for propagation.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Elapsed time since the span started, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// End the request trace with response info. Returns the duration in ms.
    pub fn end(self, status_code: u16) -> f64 {
        let duration_ms = self.elapsed_ms();
        end_http_span(&self.context, status_code, duration_ms);
        duration_ms
    }
}

// Header extractor for OpenTelemetry propagation
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}
