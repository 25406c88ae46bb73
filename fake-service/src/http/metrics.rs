//! Prometheus metrics endpoint.

use crate::service::FakeService;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
pub async fn metrics_handler(Extension(service): Extension<Arc<FakeService>>) -> impl IntoResponse {
    let m = service.metrics();
    let load = service.load();

    // Gauges
    let active_loops = load.active_loops();

    // Counters
    let requests = m.requests_total.load(Ordering::Relaxed);
    let upstream_errors = m.upstream_errors_total.load(Ordering::Relaxed);
    let injected = m.injected_errors_total.load(Ordering::Relaxed);
    let overruns = m.budget_overruns_total.load(Ordering::Relaxed);
    let ticks = load.total_ticks();

    let body = format!(
        r#"# HELP fake_service_info Service information
# TYPE fake_service_info gauge
fake_service_info{{name="{name}",version="{version}"}} 1

# HELP fake_service_load_loops_active Load loops currently running
# TYPE fake_service_load_loops_active gauge
fake_service_load_loops_active {active_loops}

# HELP fake_service_requests_total Total requests handled
# TYPE fake_service_requests_total counter
fake_service_requests_total {requests}

# HELP fake_service_upstream_errors_total Total failed upstream calls
# TYPE fake_service_upstream_errors_total counter
fake_service_upstream_errors_total {upstream_errors}

# HELP fake_service_injected_errors_total Total requests answered with an injected error
# TYPE fake_service_injected_errors_total counter
fake_service_injected_errors_total {injected}

# HELP fake_service_budget_overruns_total Total requests that ran past their target duration
# TYPE fake_service_budget_overruns_total counter
fake_service_budget_overruns_total {overruns}

# HELP fake_service_memory_ticks_total Total memory load ticks
# TYPE fake_service_memory_ticks_total counter
fake_service_memory_ticks_total {ticks}
"#,
        name = service.name(),
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
