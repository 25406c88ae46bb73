//! HTTP endpoints for fake-service.
//!
//! Serves emulated requests plus health, readiness and metrics endpoints.

pub mod health;
mod metrics;
mod ready;

use crate::service::FakeService;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Extension, Json, Router};
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(service: Arc<FakeService>) -> Router {
    Router::new()
        .route("/", get(request_handler).post(request_handler))
        .route("/health", get(health::health_handler))
        .route("/ready", get(ready::ready_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(Extension(service))
}

/// Emulated request endpoint.
///
/// The status code mirrors the code of the response tree.
async fn request_handler(Extension(service): Extension<Arc<FakeService>>) -> impl IntoResponse {
    let response = service.handle().await;
    let status = StatusCode::from_u16(response.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response))
}
