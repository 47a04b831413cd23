//! Service-level handlers

use axum::{http::StatusCode, response::IntoResponse};

/// GET /_health, /health-check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /favicon.ico, answered without touching storage
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found\n")
}
