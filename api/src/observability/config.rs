//! OpenTelemetry declarative configuration model
//!
//! A subset of the collector-style `file_format: "0.3"` schema: resource
//! attributes, propagators, and OTLP-exporting tracer, meter and logger
//! providers. Durations are expressed in milliseconds, as in the upstream
//! schema.
//!
//! ```yaml
//! file_format: "0.3"
//! resource:
//!   attributes:
//!     - name: service.name
//!       value: payment-service
//! tracer_provider:
//!   processors:
//!     - batch:
//!         exporter:
//!           otlp:
//!             protocol: http/protobuf
//!             endpoint: ${OTEL_EXPORTER_OTLP_ENDPOINT:-http://localhost:4318}
//! ```

use std::time::Duration;

use figment::{
    Figment,
    providers::{Format, Yaml},
};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::TelemetryError;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OtelConfiguration {
    #[garde(length(min = 1))]
    pub file_format: String,

    #[garde(skip)]
    #[serde(default)]
    pub disabled: bool,

    #[garde(dive)]
    #[serde(default)]
    pub resource: Option<ResourceConfig>,

    #[garde(dive)]
    #[serde(default)]
    pub propagator: Option<PropagatorConfig>,

    #[garde(dive)]
    #[serde(default)]
    pub tracer_provider: Option<TracerProviderConfig>,

    #[garde(dive)]
    #[serde(default)]
    pub meter_provider: Option<MeterProviderConfig>,

    #[garde(dive)]
    #[serde(default)]
    pub logger_provider: Option<LoggerProviderConfig>,
}

impl OtelConfiguration {
    /// Parse an already env-expanded YAML document and validate it
    pub fn parse(yaml: &str) -> Result<Self, TelemetryError> {
        let config: OtelConfiguration = Figment::from(Yaml::string(yaml))
            .extract()
            .map_err(|e| TelemetryError::Parse(Box::new(e)))?;

        config
            .validate()
            .map_err(|report| TelemetryError::Invalid(report.to_string()))?;

        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ResourceConfig {
    #[garde(dive)]
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AttributeConfig {
    #[garde(length(min = 1))]
    pub name: String,

    #[garde(skip)]
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PropagatorConfig {
    #[garde(inner(pattern(r"^(tracecontext|baggage)$")))]
    #[serde(default)]
    pub composite: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct TracerProviderConfig {
    #[garde(dive)]
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,

    #[garde(skip)]
    #[serde(default)]
    pub sampler: Option<SamplerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct LoggerProviderConfig {
    #[garde(dive)]
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
}

/// A span or log record processor: exactly one of `batch` or `simple`
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ProcessorConfig {
    #[garde(dive)]
    #[serde(default)]
    pub batch: Option<BatchProcessorConfig>,

    #[garde(dive)]
    #[serde(default)]
    pub simple: Option<SimpleProcessorConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BatchProcessorConfig {
    /// Delay between consecutive exports, in milliseconds
    #[garde(range(min = 1))]
    #[serde(default)]
    pub schedule_delay: Option<u64>,

    #[garde(range(min = 1))]
    #[serde(default)]
    pub export_timeout: Option<u64>,

    #[garde(range(min = 1))]
    #[serde(default)]
    pub max_queue_size: Option<usize>,

    #[garde(range(min = 1))]
    #[serde(default)]
    pub max_export_batch_size: Option<usize>,

    #[garde(dive)]
    pub exporter: ExporterConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SimpleProcessorConfig {
    #[garde(dive)]
    pub exporter: ExporterConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ExporterConfig {
    #[garde(dive)]
    #[serde(default)]
    pub otlp: Option<OtlpExporterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OtlpExporterConfig {
    #[garde(pattern(r"^(grpc|http/protobuf)$"))]
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[garde(length(min = 1))]
    pub endpoint: String,

    #[garde(dive)]
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,

    /// Export timeout in milliseconds
    #[garde(range(min = 1))]
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_protocol() -> String {
    "http/protobuf".to_string()
}

impl OtlpExporterConfig {
    pub fn is_grpc(&self) -> bool {
        self.protocol == "grpc"
    }

    /// Endpoint for one signal; bare HTTP endpoints get the signal path
    pub fn signal_endpoint(&self, signal_path: &str) -> String {
        if self.is_grpc() {
            return self.endpoint.clone();
        }

        let has_path = self
            .endpoint
            .parse::<axum::http::Uri>()
            .map(|uri| !matches!(uri.path(), "" | "/"))
            .unwrap_or(false);

        if has_path {
            self.endpoint.clone()
        } else {
            format!("{}{}", self.endpoint.trim_end_matches('/'), signal_path)
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HeaderConfig {
    #[garde(length(min = 1))]
    pub name: String,

    #[garde(skip)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct MeterProviderConfig {
    #[garde(dive)]
    #[serde(default)]
    pub readers: Vec<MetricReaderConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct MetricReaderConfig {
    #[garde(dive)]
    pub periodic: PeriodicReaderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PeriodicReaderConfig {
    /// Collection interval in milliseconds
    #[garde(range(min = 1))]
    #[serde(default)]
    pub interval: Option<u64>,

    #[garde(range(min = 1))]
    #[serde(default)]
    pub timeout: Option<u64>,

    #[garde(dive)]
    pub exporter: ExporterConfig,
}

/// Sampler selection; the first populated field wins
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SamplerConfig {
    #[serde(default)]
    pub always_on: Option<EmptyConfig>,
    #[serde(default)]
    pub always_off: Option<EmptyConfig>,
    #[serde(default)]
    pub trace_id_ratio_based: Option<RatioConfig>,
    #[serde(default)]
    pub parent_based: Option<ParentBasedConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EmptyConfig {}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatioConfig {
    #[serde(default = "default_ratio")]
    pub ratio: f64,
}

fn default_ratio() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ParentBasedConfig {
    #[serde(default)]
    pub root: Option<Box<SamplerConfig>>,
}
