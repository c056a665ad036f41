//! Telemetry bootstrap
//!
//! Builds the provider bundle ([`Telemetry`]) from an OpenTelemetry
//! declarative configuration file:
//!
//! 1. read the file (a missing file selects the fallback bundle)
//! 2. expand environment variables textually
//! 3. parse and validate the YAML
//! 4. construct tracer, meter and logger providers with OTLP exporters
//!
//! Any failure after step 1 is returned to the caller, which treats it as
//! fatal at startup.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    logs::{self as sdklogs, BatchLogProcessor, LoggerProvider},
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::{BaggagePropagator, TraceContextPropagator},
    runtime,
    trace::{self as sdktrace, BatchSpanProcessor, Sampler, Tracer, TracerProvider},
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tonic::metadata::MetadataMap;
use tracing::Dispatch;

use super::config::{
    AttributeConfig, AttributeValue, BatchProcessorConfig, HeaderConfig, LoggerProviderConfig,
    MeterProviderConfig, OtelConfiguration, OtlpExporterConfig, ResourceConfig, SamplerConfig,
    TracerProviderConfig,
};
use super::env::expand_env;
use super::logging::{LoggingConfig, build_dispatch};
use crate::error::TelemetryError;

/// Instrumentation scope for every tracer and meter handed out by the service
pub const SCOPE: &str = "payment-service";

/// Identity and local logging settings applied to every provider
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub service_version: String,
    pub logging: LoggingConfig,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: SCOPE.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Propagators named in the `propagator.composite` list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagatorKind {
    TraceContext,
    Baggage,
}

/// The provider bundle: tracer, meter and logger plus one shutdown operation
#[derive(Clone)]
pub struct Telemetry {
    tracer_provider: TracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: Option<LoggerProvider>,
    propagators: Vec<PropagatorKind>,
    logger: Dispatch,
    exporting: bool,
}

impl Telemetry {
    /// Bootstrap from a configuration file path
    ///
    /// A missing file is not an error: the fallback bundle is returned.
    pub fn from_config_file(
        path: impl AsRef<Path>,
        settings: &TelemetrySettings,
    ) -> Result<Self, TelemetryError> {
        let path = path.as_ref();

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::fallback(settings)),
            Err(source) => {
                return Err(TelemetryError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = OtelConfiguration::parse(&expand_env(&raw))?;
        Self::from_config(&config, settings)
    }

    /// Build providers from an already parsed configuration
    pub fn from_config(
        config: &OtelConfiguration,
        settings: &TelemetrySettings,
    ) -> Result<Self, TelemetryError> {
        if config.disabled {
            return Ok(Self::fallback(settings));
        }

        let resource = build_resource(config.resource.as_ref(), settings);

        let tracer_provider =
            build_tracer_provider(config.tracer_provider.as_ref(), resource.clone())?;
        let meter_provider = build_meter_provider(config.meter_provider.as_ref(), resource.clone())?;
        let logger_provider = config
            .logger_provider
            .as_ref()
            .map(|c| build_logger_provider(c, resource))
            .transpose()?;

        let span_tracer = config
            .tracer_provider
            .as_ref()
            .map(|_| tracer_provider.tracer(SCOPE));
        let logger = build_dispatch(&settings.logging, span_tracer, logger_provider.as_ref());

        Ok(Self {
            tracer_provider,
            meter_provider,
            logger_provider,
            propagators: propagator_kinds(config),
            logger,
            exporting: true,
        })
    }

    /// Bare production logger, no exporters, no-op shutdown
    pub fn fallback(settings: &TelemetrySettings) -> Self {
        Self {
            tracer_provider: TracerProvider::builder().build(),
            meter_provider: SdkMeterProvider::builder().build(),
            logger_provider: None,
            propagators: vec![PropagatorKind::TraceContext, PropagatorKind::Baggage],
            logger: build_dispatch(&settings.logging, None, None),
            exporting: false,
        }
    }

    pub fn tracer(&self) -> Tracer {
        self.tracer_provider.tracer(SCOPE)
    }

    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(SCOPE)
    }

    /// The structured logger
    pub fn logger(&self) -> Dispatch {
        self.logger.clone()
    }

    /// Whether any provider was built from a configuration file
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn tracer_provider(&self) -> &TracerProvider {
        &self.tracer_provider
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    pub fn propagators(&self) -> &[PropagatorKind] {
        &self.propagators
    }

    /// Composite text-map propagator for the configured propagators
    pub fn text_map_propagator(&self) -> TextMapCompositePropagator {
        let propagators = self
            .propagators
            .iter()
            .map(|kind| -> Box<dyn TextMapPropagator + Send + Sync> {
                match kind {
                    PropagatorKind::TraceContext => Box::new(TraceContextPropagator::new()),
                    PropagatorKind::Baggage => Box::new(BaggagePropagator::new()),
                }
            })
            .collect();
        TextMapCompositePropagator::new(propagators)
    }

    /// Flush and shut down every configured provider
    ///
    /// Blocks until exporters drain; call it from a blocking context.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        if !self.exporting {
            return Ok(());
        }

        let mut failures = Vec::new();

        if let Err(e) = self.tracer_provider.shutdown() {
            failures.push(format!("traces: {e}"));
        }
        if let Err(e) = self.meter_provider.shutdown() {
            failures.push(format!("metrics: {e}"));
        }
        if let Some(provider) = &self.logger_provider {
            if let Err(e) = provider.shutdown() {
                failures.push(format!("logs: {e}"));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TelemetryError::Shutdown(failures.join("; ")))
        }
    }
}

fn propagator_kinds(config: &OtelConfiguration) -> Vec<PropagatorKind> {
    match &config.propagator {
        Some(propagator) if !propagator.composite.is_empty() => propagator
            .composite
            .iter()
            .filter_map(|name| match name.as_str() {
                "tracecontext" => Some(PropagatorKind::TraceContext),
                "baggage" => Some(PropagatorKind::Baggage),
                _ => None,
            })
            .collect(),
        _ => vec![PropagatorKind::TraceContext, PropagatorKind::Baggage],
    }
}

impl AttributeConfig {
    fn to_key_value(&self) -> KeyValue {
        let key = self.name.clone();
        match &self.value {
            AttributeValue::Bool(v) => KeyValue::new(key, *v),
            AttributeValue::Int(v) => KeyValue::new(key, *v),
            AttributeValue::Double(v) => KeyValue::new(key, *v),
            AttributeValue::String(v) => KeyValue::new(key, v.clone()),
        }
    }
}

/// SDK defaults, then service identity, then configured attributes
fn build_resource(config: Option<&ResourceConfig>, settings: &TelemetrySettings) -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, settings.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, settings.service_version.clone()),
    ];

    if let Some(config) = config {
        attributes.extend(config.attributes.iter().map(AttributeConfig::to_key_value));
    }

    Resource::default().merge(&Resource::new(attributes))
}

fn build_sampler(config: &SamplerConfig) -> Sampler {
    if config.always_on.is_some() {
        Sampler::AlwaysOn
    } else if config.always_off.is_some() {
        Sampler::AlwaysOff
    } else if let Some(ratio) = &config.trace_id_ratio_based {
        Sampler::TraceIdRatioBased(ratio.ratio.clamp(0.0, 1.0))
    } else if let Some(parent) = &config.parent_based {
        let root = parent
            .root
            .as_deref()
            .map(build_sampler)
            .unwrap_or(Sampler::AlwaysOn);
        Sampler::ParentBased(Box::new(root))
    } else {
        Sampler::ParentBased(Box::new(Sampler::AlwaysOn))
    }
}

fn grpc_metadata(headers: &[HeaderConfig]) -> Result<MetadataMap, TelemetryError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for header in headers {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| TelemetryError::Invalid(format!("header {}: {e}", header.name)))?;
        let value = HeaderValue::from_str(&header.value)
            .map_err(|e| TelemetryError::Invalid(format!("header {}: {e}", header.name)))?;
        map.insert(name, value);
    }
    Ok(MetadataMap::from_headers(map))
}

fn http_headers(headers: &[HeaderConfig]) -> HashMap<String, String> {
    headers
        .iter()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect()
}

/// Build one OTLP exporter for a signal, over gRPC or HTTP/protobuf
macro_rules! otlp_exporter {
    ($exporter:ty, $otlp:expr, $path:literal, $signal:literal) => {{
        let otlp: &OtlpExporterConfig = $otlp;
        let endpoint = otlp.signal_endpoint($path);
        let timeout = otlp.timeout().unwrap_or(Duration::from_secs(10));

        let built = if otlp.is_grpc() {
            <$exporter>::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .with_timeout(timeout)
                .with_metadata(grpc_metadata(&otlp.headers)?)
                .build()
        } else {
            <$exporter>::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint)
                .with_timeout(timeout)
                .with_headers(http_headers(&otlp.headers))
                .build()
        };

        built.map_err(|e| TelemetryError::Exporter {
            signal: $signal,
            message: e.to_string(),
        })
    }};
}

fn span_batch_config(batch: &BatchProcessorConfig) -> sdktrace::BatchConfig {
    let mut builder = sdktrace::BatchConfigBuilder::default();
    if let Some(ms) = batch.schedule_delay {
        builder = builder.with_scheduled_delay(Duration::from_millis(ms));
    }
    if let Some(ms) = batch.export_timeout {
        builder = builder.with_max_export_timeout(Duration::from_millis(ms));
    }
    if let Some(size) = batch.max_queue_size {
        builder = builder.with_max_queue_size(size);
    }
    if let Some(size) = batch.max_export_batch_size {
        builder = builder.with_max_export_batch_size(size);
    }
    builder.build()
}

fn log_batch_config(batch: &BatchProcessorConfig) -> sdklogs::BatchConfig {
    let mut builder = sdklogs::BatchConfigBuilder::default();
    if let Some(ms) = batch.schedule_delay {
        builder = builder.with_scheduled_delay(Duration::from_millis(ms));
    }
    if let Some(ms) = batch.export_timeout {
        builder = builder.with_max_export_timeout(Duration::from_millis(ms));
    }
    if let Some(size) = batch.max_queue_size {
        builder = builder.with_max_queue_size(size);
    }
    if let Some(size) = batch.max_export_batch_size {
        builder = builder.with_max_export_batch_size(size);
    }
    builder.build()
}

fn build_tracer_provider(
    config: Option<&TracerProviderConfig>,
    resource: Resource,
) -> Result<TracerProvider, TelemetryError> {
    let mut builder = TracerProvider::builder();
    let mut sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOn));

    if let Some(config) = config {
        for processor in &config.processors {
            if let Some(batch) = &processor.batch {
                if let Some(otlp) = &batch.exporter.otlp {
                    let exporter =
                        otlp_exporter!(opentelemetry_otlp::SpanExporter, otlp, "/v1/traces", "trace")?;
                    let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
                        .with_batch_config(span_batch_config(batch))
                        .build();
                    builder = builder.with_span_processor(processor);
                }
            }
            if let Some(simple) = &processor.simple {
                if let Some(otlp) = &simple.exporter.otlp {
                    let exporter =
                        otlp_exporter!(opentelemetry_otlp::SpanExporter, otlp, "/v1/traces", "trace")?;
                    builder = builder.with_simple_exporter(exporter);
                }
            }
        }

        if let Some(sampler_config) = &config.sampler {
            sampler = build_sampler(sampler_config);
        }
    }

    #[allow(deprecated)]
    let builder = builder.with_config(
        sdktrace::Config::default()
            .with_sampler(sampler)
            .with_resource(resource),
    );

    Ok(builder.build())
}

fn build_meter_provider(
    config: Option<&MeterProviderConfig>,
    resource: Resource,
) -> Result<SdkMeterProvider, TelemetryError> {
    let mut builder = SdkMeterProvider::builder().with_resource(resource);

    for reader in config.map(|c| c.readers.as_slice()).unwrap_or_default() {
        let periodic = &reader.periodic;
        let Some(otlp) = &periodic.exporter.otlp else {
            continue;
        };

        let exporter =
            otlp_exporter!(opentelemetry_otlp::MetricExporter, otlp, "/v1/metrics", "metric")?;

        let mut reader = PeriodicReader::builder(exporter, runtime::Tokio);
        if let Some(ms) = periodic.interval {
            reader = reader.with_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = periodic.timeout {
            reader = reader.with_timeout(Duration::from_millis(ms));
        }
        builder = builder.with_reader(reader.build());
    }

    Ok(builder.build())
}

fn build_logger_provider(
    config: &LoggerProviderConfig,
    resource: Resource,
) -> Result<LoggerProvider, TelemetryError> {
    let mut builder = LoggerProvider::builder().with_resource(resource);

    for processor in &config.processors {
        if let Some(batch) = &processor.batch {
            if let Some(otlp) = &batch.exporter.otlp {
                let exporter =
                    otlp_exporter!(opentelemetry_otlp::LogExporter, otlp, "/v1/logs", "log")?;
                let processor = BatchLogProcessor::builder(exporter, runtime::Tokio)
                    .with_batch_config(log_batch_config(batch))
                    .build();
                builder = builder.with_log_processor(processor);
            }
        }
        if let Some(simple) = &processor.simple {
            if let Some(otlp) = &simple.exporter.otlp {
                let exporter =
                    otlp_exporter!(opentelemetry_otlp::LogExporter, otlp, "/v1/logs", "log")?;
                builder = builder.with_simple_exporter(exporter);
            }
        }
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::config::{EmptyConfig, ParentBasedConfig, RatioConfig};
    use opentelemetry::trace::{Span, Tracer as _};

    #[test]
    fn test_fallback_bundle() {
        let telemetry = Telemetry::fallback(&TelemetrySettings::default());

        assert!(!telemetry.is_exporting());
        assert!(telemetry.shutdown().is_ok());
        assert_eq!(
            telemetry.propagators(),
            &[PropagatorKind::TraceContext, PropagatorKind::Baggage]
        );

        // Handles still work without exporters
        let mut span = telemetry.tracer().start("fallback");
        span.end();
        telemetry.meter().u64_counter("fallback_total").build().add(1, &[]);
    }

    #[test]
    fn test_disabled_configuration_uses_fallback() {
        let config = OtelConfiguration::parse("file_format: \"0.3\"\ndisabled: true\n").unwrap();
        let telemetry = Telemetry::from_config(&config, &TelemetrySettings::default()).unwrap();
        assert!(!telemetry.is_exporting());
    }

    #[test]
    fn test_empty_configuration_exports_nothing_but_is_configured() {
        let config = OtelConfiguration::parse("file_format: \"0.3\"\n").unwrap();
        let telemetry = Telemetry::from_config(&config, &TelemetrySettings::default()).unwrap();
        assert!(telemetry.is_exporting());
        assert_eq!(
            telemetry.propagators(),
            &[PropagatorKind::TraceContext, PropagatorKind::Baggage]
        );
    }

    #[test]
    fn test_propagator_selection() {
        let config =
            OtelConfiguration::parse("file_format: \"0.3\"\npropagator:\n  composite: [baggage]\n")
                .unwrap();
        assert_eq!(propagator_kinds(&config), vec![PropagatorKind::Baggage]);
    }

    #[test]
    fn test_resource_attributes_override_identity() {
        let config = ResourceConfig {
            attributes: vec![AttributeConfig {
                name: "service.name".to_string(),
                value: AttributeValue::String("payments-canary".to_string()),
            }],
        };
        let resource = build_resource(Some(&config), &TelemetrySettings::default());

        assert_eq!(
            resource.get(opentelemetry::Key::from_static_str(SERVICE_NAME)),
            Some(opentelemetry::Value::from("payments-canary"))
        );
        assert_eq!(
            resource.get(opentelemetry::Key::from_static_str(SERVICE_VERSION)),
            Some(opentelemetry::Value::from(env!("CARGO_PKG_VERSION")))
        );
    }

    #[test]
    fn test_sampler_selection() {
        let off = SamplerConfig {
            always_off: Some(EmptyConfig {}),
            ..Default::default()
        };
        assert!(matches!(build_sampler(&off), Sampler::AlwaysOff));

        let ratio = SamplerConfig {
            trace_id_ratio_based: Some(RatioConfig { ratio: 7.0 }),
            ..Default::default()
        };
        assert!(matches!(build_sampler(&ratio), Sampler::TraceIdRatioBased(r) if r == 1.0));

        let parent = SamplerConfig {
            parent_based: Some(ParentBasedConfig { root: None }),
            ..Default::default()
        };
        assert!(matches!(build_sampler(&parent), Sampler::ParentBased(_)));
    }

    #[test]
    fn test_invalid_grpc_header_rejected() {
        let headers = vec![HeaderConfig {
            name: "bad header".to_string(),
            value: "x".to_string(),
        }];
        assert!(matches!(grpc_metadata(&headers), Err(TelemetryError::Invalid(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_otlp_providers_build() {
        let yaml = r#"
file_format: "0.3"
tracer_provider:
  processors:
    - batch:
        schedule_delay: 200
        exporter:
          otlp:
            protocol: grpc
            endpoint: http://127.0.0.1:4317
meter_provider:
  readers:
    - periodic:
        interval: 60000
        exporter:
          otlp:
            protocol: http/protobuf
            endpoint: http://127.0.0.1:4318
logger_provider:
  processors:
    - batch:
        exporter:
          otlp:
            protocol: http/protobuf
            endpoint: http://127.0.0.1:4318
"#;
        let config = OtelConfiguration::parse(yaml).unwrap();
        let telemetry = Telemetry::from_config(&config, &TelemetrySettings::default()).unwrap();

        assert!(telemetry.is_exporting());

        // No collector is listening; shutdown may report export failures
        let _ = tokio::task::spawn_blocking(move || telemetry.shutdown()).await;
    }
}
