use std::io::Write;

use payment_service::observability::{PropagatorKind, Telemetry, TelemetrySettings};
use payment_service::TelemetryError;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.yaml");

    let telemetry = Telemetry::from_config_file(&path, &TelemetrySettings::default()).unwrap();

    assert!(!telemetry.is_exporting());
    tracing::dispatcher::with_default(&telemetry.logger(), || {
        tracing::info!("fallback logger works");
    });
    assert!(telemetry.shutdown().is_ok());
}

#[test]
fn test_malformed_file_is_an_error() {
    let file = write_config("file_format: [unterminated\n  - : :");

    let result = Telemetry::from_config_file(file.path(), &TelemetrySettings::default());

    assert!(matches!(result, Err(TelemetryError::Parse(_))));
}

#[test]
fn test_invalid_protocol_is_an_error() {
    let file = write_config(
        r#"
file_format: "0.3"
tracer_provider:
  processors:
    - simple:
        exporter:
          otlp:
            protocol: carrier-pigeon
            endpoint: http://localhost:4318
"#,
    );

    let result = Telemetry::from_config_file(file.path(), &TelemetrySettings::default());

    assert!(matches!(result, Err(TelemetryError::Invalid(_))));
}

#[test]
fn test_directory_path_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let result = Telemetry::from_config_file(dir.path(), &TelemetrySettings::default());

    assert!(matches!(result, Err(TelemetryError::Io { .. })));
}

#[test]
fn test_disabled_file_falls_back() {
    let file = write_config("file_format: \"0.3\"\ndisabled: true\n");

    let telemetry = Telemetry::from_config_file(file.path(), &TelemetrySettings::default()).unwrap();

    assert!(!telemetry.is_exporting());
}

#[test]
fn test_env_expanded_propagators() {
    unsafe {
        std::env::set_var("PAYMENT_BOOTSTRAP_TEST_PROPAGATOR", "baggage");
    }
    let file = write_config(
        r#"
file_format: "0.3"
propagator:
  composite: [ "${PAYMENT_BOOTSTRAP_TEST_PROPAGATOR}" ]
"#,
    );

    let telemetry = Telemetry::from_config_file(file.path(), &TelemetrySettings::default()).unwrap();

    assert!(telemetry.is_exporting());
    assert_eq!(telemetry.propagators(), &[PropagatorKind::Baggage]);
    unsafe {
        std::env::remove_var("PAYMENT_BOOTSTRAP_TEST_PROPAGATOR");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_otlp_exporters_build_from_file() {
    let file = write_config(
        r#"
file_format: "0.3"
resource:
  attributes:
    - name: deployment.environment
      value: test
tracer_provider:
  processors:
    - batch:
        schedule_delay: 1000
        exporter:
          otlp:
            protocol: http/protobuf
            endpoint: ${PAYMENT_BOOTSTRAP_TEST_UNSET:-http://127.0.0.1:4318}
meter_provider:
  readers:
    - periodic:
        interval: 60000
        exporter:
          otlp:
            protocol: http/protobuf
            endpoint: http://127.0.0.1:4318
"#,
    );

    let telemetry = Telemetry::from_config_file(file.path(), &TelemetrySettings::default()).unwrap();

    assert!(telemetry.is_exporting());
}
