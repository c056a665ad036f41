pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod payments;
pub mod server;

pub use config::*;
pub use error::*;
pub use server::*;

use anyhow::Result;
use clap::Parser;
use std::panic;

use crate::observability::Telemetry;

/// Main server entry point for library usage
pub async fn run_server() -> Result<()> {
    let cli = Cli::parse();
    let app_config = config::load_config(&cli)?;

    // A malformed telemetry file is fatal; a missing one is not
    let telemetry = Telemetry::from_config_file(
        &app_config.telemetry.config_file,
        &app_config.telemetry_settings(),
    )?;
    observability::global::install(&telemetry)?;

    // Set up panic handler (so it can use logging)
    panic::set_hook(Box::new(|panic_info| {
        ::tracing::error!(?panic_info, "FATAL: Panic occurred");
        std::process::exit(1);
    }));

    ::tracing::info!(
        version = %app_config.telemetry.service_version,
        "Payment service starting up"
    );

    if telemetry.is_exporting() {
        ::tracing::info!(
            config_file = %app_config.telemetry.config_file,
            propagators = ?telemetry.propagators(),
            "Telemetry exporters configured"
        );
    } else {
        ::tracing::info!(
            config_file = %app_config.telemetry.config_file,
            "No telemetry configuration in use, logging to stdout only"
        );
    }

    server::start_server(app_config, telemetry).await
}
