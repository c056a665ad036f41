//! Observability: telemetry bootstrap, logging, metrics and trace propagation
//!
//! [`Telemetry`] is the provider bundle built at startup from the
//! OpenTelemetry configuration file. It is injected into the HTTP layer;
//! [`global`] offers process-wide accessors with library-default fallbacks.

pub mod config;
pub mod env;
pub mod global;
pub mod init;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use crate::error::TelemetryError;
pub use config::OtelConfiguration;
pub use init::{PropagatorKind, SCOPE, Telemetry, TelemetrySettings};
pub use logging::LoggingConfig;
pub use metrics::PaymentMetrics;
pub use self::tracing::extract_trace_context;
