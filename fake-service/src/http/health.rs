//! Health check endpoint.

use crate::service::FakeService;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Service name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Load loops still running.
    pub active_loops: usize,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(Extension(service): Extension<Arc<FakeService>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        name: service.name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_loops: service.load().active_loops(),
        uptime_seconds: service.uptime().as_secs(),
    })
}
