//! Readiness endpoint.

use crate::service::FakeService;
use axum::http::StatusCode;
use axum::Extension;
use std::sync::Arc;

/// Readiness handler.
///
/// Fails until the configured readiness delay has passed since startup.
pub async fn ready_handler(
    Extension(service): Extension<Arc<FakeService>>,
) -> (StatusCode, &'static str) {
    if service.is_ready() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service starting")
    }
}
