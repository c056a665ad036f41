use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use super::AppState;
use crate::config::AppConfig;
use crate::health::{liveness_handler, readiness_handler};
use crate::middleware::{metrics_middleware, trace_context_middleware};
use crate::observability::Telemetry;
use crate::payments::{create_payment, list_payments, method_not_allowed};

/// Start the HTTP server and block until a shutdown signal arrives
///
/// Binds `bind:port`, marks the service ready, serves until SIGINT or
/// SIGTERM, then flushes telemetry. Telemetry shutdown failures are logged,
/// not returned.
pub async fn start_server(config: AppConfig, telemetry: Telemetry) -> Result<()> {
    let bind_addr = config.bind_address();
    info!("Attempting to bind to {}", bind_addr);

    let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {}: {}. Is another process using this port?",
            bind_addr,
            e
        )
    })?;
    info!("Server listening on {}", bind_addr);

    let state = AppState::new(telemetry.clone());
    serve(listener, state, shutdown_signal()).await?;

    info!("HTTP server stopped, flushing telemetry");
    shutdown_telemetry(telemetry, Duration::from_secs(config.server.shutdown_timeout)).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Serve the router on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state.clone());

    state.health.mark_ready().await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Assemble payment and health routes with the request middleware
///
/// The trace layer is outermost so metrics are recorded inside the request
/// span.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/payment",
            get(list_payments)
                .post(create_payment)
                .fallback(method_not_allowed),
        )
        .route("/health", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(from_fn_with_state(state.metrics.clone(), metrics_middleware))
        .layer(from_fn(trace_context_middleware))
        .with_state(state)
}

/// Flush and stop every provider, bounded by `timeout`
async fn shutdown_telemetry(telemetry: Telemetry, timeout: Duration) {
    let flush = tokio::task::spawn_blocking(move || telemetry.shutdown());

    match tokio::time::timeout(timeout, flush).await {
        Ok(Ok(Ok(()))) => info!("Telemetry shut down"),
        Ok(Ok(Err(e))) => error!(error = %e, "Telemetry shutdown failed"),
        Ok(Err(e)) => error!(error = %e, "Telemetry shutdown task panicked"),
        Err(_) => warn!(?timeout, "Telemetry shutdown timed out"),
    }
}

/// Wait for SIGINT or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
