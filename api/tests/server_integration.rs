use anyhow::Result;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use payment_service::AppState;
use payment_service::observability::{Telemetry, TelemetrySettings};
use payment_service::server::serve;

struct TestServer {
    base_url: String,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

async fn spawn_server() -> Result<TestServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let state = AppState::new(Telemetry::fallback(&TelemetrySettings::default()));
    let (shutdown, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(serve(listener, state, async {
        let _ = rx.await;
    }));

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        shutdown,
        handle,
    })
}

/// Test that server starts and answers on the bound port
#[tokio::test]
async fn test_server_starts_and_binds() -> Result<()> {
    let server = spawn_server().await?;

    let client = reqwest::Client::new();
    let response = timeout(
        Duration::from_secs(5),
        client.get(format!("{}/health", server.base_url)).send(),
    )
    .await??;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    let _ = server.shutdown.send(());
    server.handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_ready_once_bound() -> Result<()> {
    let server = spawn_server().await?;

    let response = reqwest::get(format!("{}/health/ready", server.base_url)).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");

    let _ = server.shutdown.send(());
    server.handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_payment_round_trip_over_http() -> Result<()> {
    let server = spawn_server().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/payment", server.base_url);

    let created = client
        .post(&url)
        .json(&serde_json::json!({"amount": 42.5, "currency": "EUR"}))
        .send()
        .await?;
    assert_eq!(created.status(), 201);
    let created: serde_json::Value = created.json().await?;

    let listed: Vec<serde_json::Value> = client.get(&url).send().await?.json().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
    assert_eq!(listed[0]["currency"], "EUR");

    let _ = server.shutdown.send(());
    server.handle.await??;
    Ok(())
}

/// Test graceful shutdown completes within timeout
#[tokio::test]
async fn test_graceful_shutdown() -> Result<()> {
    let server = spawn_server().await?;

    server.shutdown.send(()).expect("server still running");

    let result = timeout(Duration::from_secs(5), server.handle).await;
    assert!(result.is_ok(), "server did not stop within 5 seconds");
    result???;
    Ok(())
}
