//! Distributed tracing middleware for HTTP requests
//!
//! Extracts the W3C trace context from incoming headers and opens one span
//! per request, parented on the remote context when present.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{Instrument, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::observability::extract_trace_context;

/// Middleware that extracts trace context from HTTP headers and creates spans
pub async fn trace_context_middleware(req: Request, next: Next) -> Response {
    let span = info_span!(
        "http_request",
        otel.name = %format!("{} {}", req.method(), req.uri().path()),
        method = %req.method(),
        path = %req.uri().path(),
        user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown"),
        status = tracing::field::Empty,
    );
    span.set_parent(extract_trace_context(req.headers()));

    let response = next.run(req).instrument(span.clone()).await;
    span.record("status", response.status().as_u16());

    response
}
