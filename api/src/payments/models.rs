use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ulid::Ulid;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const STATUS_PENDING: &str = "pending";

/// A stored payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    /// RFC3339 UTC timestamp, second precision
    pub date: String,
}

/// Body of `POST /api/payment`
///
/// Only `amount` and `currency` are honored; server-owned fields sent by the
/// client are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewPayment {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

impl Payment {
    /// Stamp server-owned fields onto a client request
    pub fn from_request(request: NewPayment) -> Self {
        let currency = request
            .currency
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        Self {
            id: generate_payment_id(),
            amount: request.amount,
            currency,
            status: STATUS_PENDING.to_string(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// `pay_` followed by a ULID: unique across concurrent requests and sortable
/// by creation time
pub fn generate_payment_id() -> String {
    format!("pay_{}", Ulid::new())
}
