use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use garde::Validate;

use super::AppConfig;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "payment-service", version, about = "In-memory payment API with OpenTelemetry")]
pub struct Cli {
    /// Path to an application configuration file (TOML)
    #[arg(long, env = "APP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the OpenTelemetry configuration file (YAML)
    #[arg(long, env = "OTEL_CONFIG_FILE")]
    pub otel_config: Option<String>,

    /// Server port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    pub bind: Option<String>,

    /// Environment name, selects config/{environment}.toml
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    fn environment_name(&self) -> String {
        self.environment
            .clone()
            .unwrap_or_else(|| "production".to_string())
    }

    /// Only the flags actually given, as keyed overrides
    fn overrides(&self) -> Figment {
        let mut figment = Figment::new();
        if let Some(port) = self.port {
            figment = figment.merge(Serialized::default("server.port", port));
        }
        if let Some(bind) = &self.bind {
            figment = figment.merge(Serialized::default("server.bind", bind));
        }
        if let Some(path) = &self.otel_config {
            figment = figment.merge(Serialized::default("telemetry.config_file", path));
        }
        if self.debug {
            figment = figment.merge(Serialized::default("logging.level", "debug"));
        }
        figment
    }
}

/// Load configuration, lowest to highest priority:
/// embedded defaults, `config/default.toml`, `config/{env}.toml`,
/// `--config` file, `APP_` environment variables, CLI flags
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file("config/default.toml"))
        .merge(Toml::file(format!("config/{}.toml", cli.environment_name())));

    if let Some(path) = &cli.config {
        figment = figment.merge(Toml::file(path));
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("APP_").split("__"))
        .merge(cli.overrides())
        .extract()?;

    config.validate()?;

    Ok(config)
}
