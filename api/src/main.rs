#[tokio::main]
async fn main() {
    if let Err(e) = payment_service::run_server().await {
        eprintln!("payment-service failed: {e:#}");
        std::process::exit(1);
    }
}
