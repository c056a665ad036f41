use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidJson => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

/// Failures while bootstrapping or tearing down telemetry
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to read telemetry config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse telemetry config: {0}")]
    Parse(Box<figment::Error>),

    #[error("invalid telemetry config: {0}")]
    Invalid(String),

    #[error("failed to build {signal} exporter: {message}")]
    Exporter {
        signal: &'static str,
        message: String,
    },

    #[error("telemetry already installed: {0}")]
    Install(String),

    #[error("telemetry shutdown failed: {0}")]
    Shutdown(String),
}
