use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::{NewPayment, Payment};
use crate::error::AppError;
use crate::server::AppState;

/// `GET /api/payment`
#[instrument(name = "list_payments", skip_all)]
pub async fn list_payments(State(state): State<AppState>) -> Json<Vec<Payment>> {
    Json(state.store.list().await)
}

/// `POST /api/payment`
///
/// The body is decoded by hand so every parse failure maps to the same
/// `{"error":"Invalid JSON"}` response, independent of content type.
#[instrument(name = "create_payment", skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let request = decode_request(&body)?;

    let payment = state.store.create(request).await;
    state.metrics.record_payment(&payment);

    info!(
        payment_id = %payment.id,
        amount = payment.amount,
        currency = %payment.currency,
        "Payment created"
    );

    Ok((StatusCode::CREATED, Json(payment)))
}

/// Decode the first JSON value of the body
///
/// Bytes after that value are ignored. A `null` body is an empty request;
/// anything else that is not an object is rejected.
fn decode_request(body: &[u8]) -> Result<NewPayment, AppError> {
    let value = serde_json::Deserializer::from_slice(body)
        .into_iter::<Value>()
        .next()
        .ok_or(AppError::InvalidJson)?
        .map_err(|_| AppError::InvalidJson)?;

    match value {
        Value::Null => Ok(NewPayment::default()),
        Value::Object(_) => serde_json::from_value(value).map_err(|_| AppError::InvalidJson),
        _ => Err(AppError::InvalidJson),
    }
}

/// Any other method on `/api/payment`
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
