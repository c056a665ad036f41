//! Structured logging subscriber construction
//!
//! The service logger is a [`tracing::Dispatch`] rather than a process-wide
//! subscriber so it can be built, handed around and tested without touching
//! global state. The binary installs it globally through
//! [`super::global::install`].
//!
//! Layers, in order:
//! - `EnvFilter` (`RUST_LOG` overrides the configured level)
//! - `fmt` layer, JSON for production and pretty for development
//! - `tracing-opentelemetry` span layer, when a tracer provider is configured
//! - OTel log bridge, when a logger provider is configured

use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::LoggerProvider;
use opentelemetry_sdk::trace::Tracer;
use tracing::Dispatch;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::filter_fn,
    fmt,
    layer::SubscriberExt,
};

/// Targets whose events are kept out of the OTel log bridge so exporting a
/// log record never produces another one
const BRIDGE_EXCLUDED_TARGETS: &[&str] = &["opentelemetry", "tonic", "h2", "hyper", "reqwest", "tower"];

/// Configuration for the logging subscriber
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// JSON output (production) or pretty output (development)
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
        }
    }
}

impl LoggingConfig {
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Build the service logger
pub fn build_dispatch(
    config: &LoggingConfig,
    tracer: Option<Tracer>,
    logger_provider: Option<&LoggerProvider>,
) -> Dispatch {
    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().pretty().with_target(true).boxed()
    };

    let span_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let log_bridge = logger_provider.map(|provider| {
        OpenTelemetryTracingBridge::new(provider).with_filter(filter_fn(|metadata| {
            !BRIDGE_EXCLUDED_TARGETS
                .iter()
                .any(|target| metadata.target().starts_with(target))
        }))
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt_layer)
        .with(span_layer)
        .with(log_bridge);

    Dispatch::new(subscriber)
}
