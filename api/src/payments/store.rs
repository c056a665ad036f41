use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::{NewPayment, Payment};

/// Append-only in-memory payment list shared by all request handlers
#[derive(Debug, Clone, Default)]
pub struct PaymentStore {
    payments: Arc<RwLock<Vec<Payment>>>,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all payments in insertion order
    pub async fn list(&self) -> Vec<Payment> {
        self.payments.read().await.clone()
    }

    pub async fn create(&self, request: NewPayment) -> Payment {
        let payment = Payment::from_request(request);

        let mut payments = self.payments.write().await;
        payments.push(payment.clone());
        debug!(payment_id = %payment.id, total = payments.len(), "Payment stored");

        payment
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }
}
