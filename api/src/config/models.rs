use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::observability::{LoggingConfig, SCOPE, TelemetrySettings};

#[derive(Debug, Deserialize, Serialize, Validate, Default)]
pub struct AppConfig {
    #[garde(dive)]
    #[serde(default)]
    pub server: ServerConfig,

    #[garde(dive)]
    #[serde(default)]
    pub logging: LogConfig,

    #[garde(dive)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Identity and local logging settings for the telemetry bootstrap
    pub fn telemetry_settings(&self) -> TelemetrySettings {
        TelemetrySettings {
            service_name: SCOPE.to_string(),
            service_version: self.telemetry.service_version.clone(),
            logging: LoggingConfig {
                level: self.logging.level.clone(),
                json_format: self.logging.format == "json",
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[garde(range(min = 1024, max = 65535))]
    pub port: u16,

    #[garde(length(min = 1), custom(validate_bind_address))]
    #[serde(default = "default_bind")]
    pub bind: String,

    #[garde(range(min = 1, max = 300))]
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64, // seconds
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind: default_bind(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LogConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct TelemetryConfig {
    /// OpenTelemetry declarative configuration file; missing is allowed
    #[garde(length(min = 1))]
    #[serde(default = "default_telemetry_config_file")]
    pub config_file: String,

    #[garde(length(min = 1))]
    #[serde(default = "default_service_version")]
    pub service_version: String,
}

fn default_telemetry_config_file() -> String {
    "local/otel.yaml".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            config_file: default_telemetry_config_file(),
            service_version: default_service_version(),
        }
    }
}

fn validate_bind_address(value: &str, _: &()) -> garde::Result {
    value
        .parse::<std::net::IpAddr>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("Invalid IP address"))
}
