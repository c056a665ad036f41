pub mod tracing;

pub use self::tracing::trace_context_middleware;

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::observability::PaymentMetrics;

/// Middleware to record HTTP request metrics
pub async fn metrics_middleware(
    State(metrics): State<PaymentMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    metrics.record_request(&method, &endpoint);

    let response = next.run(req).await;

    metrics.record_response(&method, &endpoint, response.status().as_u16(), start.elapsed());

    response
}
