mod generator;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use generator::TrafficGenerator;

#[derive(Parser, Debug)]
#[command(name = "traffic-generator", version, about = "Sends a steady stream of payment requests")]
struct Args {
    /// Base URL of the payment service
    #[arg(default_value = "http://localhost:8080", env = "TARGET_URL")]
    base_url: String,

    /// Milliseconds between requests
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    /// Share of requests that create a payment, the rest list
    #[arg(long, default_value_t = 0.8, value_parser = parse_ratio)]
    post_ratio: f64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

fn parse_ratio(value: &str) -> Result<f64, String> {
    let ratio: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(format!("{ratio} is not within 0.0..=1.0"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let generator = TrafficGenerator::new(
        &args.base_url,
        Duration::from_millis(args.interval_ms),
        args.post_ratio,
        Duration::from_secs(args.timeout_secs),
    )?;

    info!(
        target_url = generator.payment_url(),
        interval_ms = args.interval_ms,
        post_ratio = args.post_ratio,
        "Starting traffic generator"
    );

    tokio::select! {
        _ = generator.run() => {}
        _ = shutdown_signal() => {}
    }

    info!(total = generator.sent(), "Traffic generator stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
