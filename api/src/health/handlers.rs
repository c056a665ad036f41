use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::debug;

use super::{HealthManager, HealthResponse, HealthStatus};

/// Liveness probe handler at /health - the process is up
pub async fn liveness_handler() -> &'static str {
    debug!("Liveness check requested");
    "OK"
}

/// Readiness probe handler at /health/ready - 503 until the listener is bound
pub async fn readiness_handler(
    State(health_manager): State<HealthManager>,
) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");

    let health = health_manager.get_health().await;
    let status = match health.status {
        HealthStatus::Ready => StatusCode::OK,
        HealthStatus::Starting => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(health))
}
