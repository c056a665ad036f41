use axum::extract::FromRef;

use crate::health::HealthManager;
use crate::observability::{PaymentMetrics, Telemetry};
use crate::payments::PaymentStore;

/// Shared request state
///
/// Telemetry handles travel with the state instead of being looked up
/// through process globals.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: PaymentStore,
    pub metrics: PaymentMetrics,
    pub health: HealthManager,
    pub telemetry: Telemetry,
}

impl AppState {
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            store: PaymentStore::new(),
            metrics: PaymentMetrics::new(&telemetry.meter()),
            health: HealthManager::new(),
            telemetry,
        }
    }
}
