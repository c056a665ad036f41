//! OpenTelemetry metric instruments for the payment service
//!
//! Instrument names follow the demo dashboards:
//! - `http_requests_total` (counter): requests by method and endpoint
//! - `http_request_duration_seconds` (histogram): latency by method, endpoint, status code
//! - `http_errors_total` (counter): responses with status >= 400
//! - `payment_amount` (histogram): amounts by currency
//! - `payments_by_status_total` (counter)
//! - `payments_by_currency_total` (counter)

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

use crate::payments::Payment;

#[derive(Clone)]
pub struct PaymentMetrics {
    request_counter: Counter<u64>,
    response_duration: Histogram<f64>,
    error_counter: Counter<u64>,
    payment_amount: Histogram<f64>,
    payments_by_status: Counter<u64>,
    payments_by_currency: Counter<u64>,
}

impl PaymentMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            request_counter: meter
                .u64_counter("http_requests_total")
                .with_description("Total number of HTTP requests")
                .with_unit("1")
                .build(),
            response_duration: meter
                .f64_histogram("http_request_duration_seconds")
                .with_description("HTTP request duration in seconds")
                .with_unit("s")
                .build(),
            error_counter: meter
                .u64_counter("http_errors_total")
                .with_description("Total number of HTTP errors")
                .with_unit("1")
                .build(),
            payment_amount: meter
                .f64_histogram("payment_amount")
                .with_description("Payment amounts processed")
                .with_unit("currency_unit")
                .build(),
            payments_by_status: meter
                .u64_counter("payments_by_status_total")
                .with_description("Total number of payments by status")
                .with_unit("1")
                .build(),
            payments_by_currency: meter
                .u64_counter("payments_by_currency_total")
                .with_description("Total number of payments by currency")
                .with_unit("1")
                .build(),
        }
    }

    pub fn record_request(&self, method: &str, endpoint: &str) {
        self.request_counter.add(
            1,
            &[
                KeyValue::new("method", method.to_string()),
                KeyValue::new("endpoint", endpoint.to_string()),
            ],
        );
    }

    /// Record latency, and count the response as an error when status >= 400
    pub fn record_response(&self, method: &str, endpoint: &str, status_code: u16, duration: Duration) {
        let attributes = [
            KeyValue::new("method", method.to_string()),
            KeyValue::new("endpoint", endpoint.to_string()),
            KeyValue::new("status_code", status_code.to_string()),
        ];

        self.response_duration
            .record(duration.as_secs_f64(), &attributes);

        if status_code >= 400 {
            self.error_counter.add(1, &attributes);
        }
    }

    pub fn record_payment(&self, payment: &Payment) {
        let currency = [KeyValue::new("currency", payment.currency.clone())];

        self.payment_amount.record(payment.amount, &currency);
        self.payments_by_status
            .add(1, &[KeyValue::new("status", payment.status.clone())]);
        self.payments_by_currency.add(1, &currency);
    }
}
