use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// Readiness of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Listener not bound yet
    Starting,
    /// Accepting traffic
    Ready,
}

/// Readiness response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    /// RFC3339 timestamp of this check
    pub timestamp: String,
}

/// Tracks whether the server is ready to accept traffic
#[derive(Debug, Clone)]
pub struct HealthManager {
    status: Arc<RwLock<HealthStatus>>,
    startup_time: Instant,
}

impl HealthManager {
    pub fn new() -> Self {
        Self {
            status: Arc::new(RwLock::new(HealthStatus::Starting)),
            startup_time: Instant::now(),
        }
    }

    /// Mark the service as ready (called after the listener binds)
    pub async fn mark_ready(&self) {
        *self.status.write().await = HealthStatus::Ready;
        info!("Payment service marked as ready");
    }

    pub async fn status(&self) -> HealthStatus {
        *self.status.read().await
    }

    pub async fn get_health(&self) -> HealthResponse {
        HealthResponse {
            status: self.status().await,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.startup_time.elapsed().as_secs(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl Default for HealthManager {
    fn default() -> Self {
        Self::new()
    }
}
