use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Currencies drawn for generated payments
pub const CURRENCIES: [&str; 10] = [
    "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "CNY", "SEK", "NZD",
];

const PROGRESS_EVERY: u64 = 50;

/// Body of a generated `POST /api/payment`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Create(PaymentRequest),
    List,
}

/// Amount in [1.00, 999.99] with two decimals
pub fn random_amount<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(100..=99_999) as f64 / 100.0
}

pub fn random_currency<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CURRENCIES[rng.gen_range(0..CURRENCIES.len())]
}

/// Pick the next request: a create with probability `post_ratio`
pub fn next_request<R: Rng + ?Sized>(rng: &mut R, post_ratio: f64) -> RequestKind {
    if rng.gen_bool(post_ratio) {
        RequestKind::Create(PaymentRequest {
            amount: random_amount(rng),
            currency: random_currency(rng).to_string(),
        })
    } else {
        RequestKind::List
    }
}

pub struct TrafficGenerator {
    client: reqwest::Client,
    payment_url: String,
    interval: Duration,
    post_ratio: f64,
    sent: Arc<AtomicU64>,
}

impl TrafficGenerator {
    pub fn new(base_url: &str, interval: Duration, post_ratio: f64, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            payment_url: format!("{}/api/payment", base_url.trim_end_matches('/')),
            interval,
            post_ratio,
            sent: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn payment_url(&self) -> &str {
        &self.payment_url
    }

    /// Requests fired so far
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Fire one request per tick, forever
    ///
    /// Requests are not awaited; a slow server never slows the tick rate.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;

            let kind = {
                let mut rng = rand::thread_rng();
                next_request(&mut rng, self.post_ratio)
            };
            self.fire(kind);

            let sent = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
            if sent % PROGRESS_EVERY == 0 {
                info!(sent, "Traffic progress");
            }
        }
    }

    fn fire(&self, kind: RequestKind) {
        let client = self.client.clone();
        let url = self.payment_url.clone();

        tokio::spawn(async move {
            let (method, result) = match &kind {
                RequestKind::Create(body) => ("POST", client.post(&url).json(body).send().await),
                RequestKind::List => ("GET", client.get(&url).send().await),
            };

            match result {
                Ok(response) if response.status().as_u16() >= 400 => {
                    warn!(method, status = response.status().as_u16(), "Request rejected");
                }
                Ok(response) => {
                    debug!(method, status = response.status().as_u16(), "Request completed");
                }
                Err(e) => warn!(method, error = %e, "Request failed"),
            }
        });
    }
}
