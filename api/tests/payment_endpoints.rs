use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use chrono::DateTime;
use serde_json::Value;
use tower::ServiceExt;

use payment_service::AppState;
use payment_service::observability::{Telemetry, TelemetrySettings};
use payment_service::server::create_router;

fn app() -> Router {
    create_router(AppState::new(Telemetry::fallback(&TelemetrySettings::default())))
}

async fn send(app: &Router, method: Method, body: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri("/api/payment")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_create_payment_returns_stamped_record() {
    let app = app();

    let response = send(&app, Method::POST, r#"{"amount": 100.5}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let payment: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let id = payment["id"].as_str().unwrap();
    assert!(id.starts_with("pay_"));
    assert!(id.len() > "pay_".len());
    assert_eq!(payment["amount"], 100.5);
    assert_eq!(payment["currency"], "USD");
    assert_eq!(payment["status"], "pending");
    assert!(DateTime::parse_from_rfc3339(payment["date"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_client_owned_fields_are_ignored() {
    let app = app();

    let response = send(
        &app,
        Method::POST,
        r#"{"id":"mine","amount":5,"currency":"GBP","status":"paid","date":"yesterday"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let payment: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_ne!(payment["id"], "mine");
    assert_eq!(payment["currency"], "GBP");
    assert_eq!(payment["status"], "pending");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = app();

    let response = send(&app, Method::POST, "{not json").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, r#"{"error":"Invalid JSON"}"#);
}

#[tokio::test]
async fn test_null_and_trailing_input_is_accepted() {
    let app = app();

    for body in [
        r#"{"amount": null}"#,
        "null",
        r#"{"amount": 5} trailing"#,
        r#"{"amount": 5}{"amount": 6}"#,
    ] {
        let response = send(&app, Method::POST, body).await;
        assert_eq!(response.status(), StatusCode::CREATED, "{body}");
    }

    let response = send(&app, Method::GET, "").await;
    let listed: Vec<Value> = serde_json::from_str(&body_text(response).await).unwrap();
    let amounts: Vec<f64> = listed.iter().map(|p| p["amount"].as_f64().unwrap()).collect();
    assert_eq!(amounts, vec![0.0, 0.0, 5.0, 5.0]);
    assert!(listed.iter().all(|p| p["currency"] == "USD"));
}

#[tokio::test]
async fn test_empty_and_non_object_bodies_are_rejected() {
    let app = app();

    for body in ["", "[]", "42", r#""payment""#] {
        let response = send(&app, Method::POST, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body_text(response).await, r#"{"error":"Invalid JSON"}"#);
    }
}

#[tokio::test]
async fn test_cors_preflight_is_not_allowed() {
    let response = app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/payment")
                .header(header::ORIGIN, "http://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_text(response).await, r#"{"error":"Method not allowed"}"#);
}

#[tokio::test]
async fn test_rejected_body_is_not_stored() {
    let app = app();

    send(&app, Method::POST, r#"{"amount": "ten"}"#).await;
    let response = send(&app, Method::GET, "").await;

    assert_eq!(body_text(response).await, "[]");
}

#[tokio::test]
async fn test_list_is_empty_initially() {
    let response = send(&app(), Method::GET, "").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "[]");
}

#[tokio::test]
async fn test_list_returns_payments_in_insertion_order() {
    let app = app();
    let mut created = Vec::new();

    for amount in [1.0, 2.0, 3.0] {
        let response = send(&app, Method::POST, &format!(r#"{{"amount": {amount}}}"#)).await;
        let payment: Value = serde_json::from_str(&body_text(response).await).unwrap();
        created.push(payment["id"].clone());
    }

    let response = send(&app, Method::GET, "").await;
    let listed: Vec<Value> = serde_json::from_str(&body_text(response).await).unwrap();

    assert_eq!(listed.len(), 3);
    for (record, id) in listed.iter().zip(&created) {
        assert_eq!(&record["id"], id);
    }
    assert_eq!(listed[2]["amount"], 3.0);
}

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    let app = app();

    for method in [Method::PUT, Method::DELETE, Method::PATCH, Method::OPTIONS] {
        let response = send(&app, method.clone(), "").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(body_text(response).await, r#"{"error":"Method not allowed"}"#);
    }
}
