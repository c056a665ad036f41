//! In-memory payment records and their HTTP handlers

pub mod handlers;
pub mod models;
pub mod store;

pub use handlers::{create_payment, list_payments, method_not_allowed};
pub use models::{DEFAULT_CURRENCY, NewPayment, Payment, STATUS_PENDING, generate_payment_id};
pub use store::PaymentStore;
