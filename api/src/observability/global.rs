//! Process-wide telemetry accessors
//!
//! The HTTP layer receives its [`Telemetry`] through `AppState`. These
//! accessors serve code that has no handle in reach; each falls back to a
//! library default when [`install`] never ran: no-op OpenTelemetry providers
//! and a development console logger.

use std::sync::OnceLock;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::metrics::Meter;
use tracing::Dispatch;

use super::init::{SCOPE, Telemetry};
use super::logging::{LoggingConfig, build_dispatch};
use crate::error::TelemetryError;

static LOGGER: OnceLock<Dispatch> = OnceLock::new();

/// Register the bundle's providers, propagator and logger process-wide
///
/// Fails if a global logger was already installed.
pub fn install(telemetry: &Telemetry) -> Result<(), TelemetryError> {
    let logger = telemetry.logger();

    tracing::dispatcher::set_global_default(logger.clone())
        .map_err(|e| TelemetryError::Install(e.to_string()))?;
    LOGGER
        .set(logger)
        .map_err(|_| TelemetryError::Install("logger already set".to_string()))?;

    global::set_tracer_provider(telemetry.tracer_provider().clone());
    global::set_meter_provider(telemetry.meter_provider().clone());
    global::set_text_map_propagator(telemetry.text_map_propagator());

    Ok(())
}

pub fn tracer() -> BoxedTracer {
    global::tracer(SCOPE)
}

pub fn meter() -> Meter {
    global::meter(SCOPE)
}

pub fn logger() -> Dispatch {
    if let Some(logger) = LOGGER.get() {
        return logger.clone();
    }

    let logger = build_dispatch(&LoggingConfig::development(), None, None);
    tracing::dispatcher::with_default(&logger, || {
        tracing::info!("No telemetry providers installed, using development logger");
    });
    logger
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::KeyValue;
    use opentelemetry::trace::{Span, Tracer};

    // Unit tests never call install(), so these exercise the defaults

    #[test]
    fn test_default_tracer_is_usable() {
        let mut span = tracer().start("default-span");
        span.set_attribute(KeyValue::new("payment.id", "pay_1"));
        span.end();
    }

    #[test]
    fn test_default_meter_is_usable() {
        let counter = meter().u64_counter("default_total").build();
        counter.add(1, &[KeyValue::new("method", "GET")]);

        let histogram = meter().f64_histogram("default_seconds").build();
        histogram.record(0.25, &[]);
    }

    #[test]
    fn test_default_logger_is_usable() {
        let logger = logger();
        tracing::dispatcher::with_default(&logger, || {
            tracing::info!(amount = 10.5, "logged through fallback");
        });
    }
}
