//! Trace-context propagation helpers
//!
//! Extraction goes through the globally installed text-map propagator, so
//! the `propagator.composite` setting of the telemetry configuration decides
//! which headers are honored.

use axum::http::HeaderMap;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Extract the remote parent context from incoming HTTP headers
pub fn extract_trace_context(headers: &HeaderMap) -> opentelemetry::Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}
