//! Request handling.
//!
//! [`FakeService`] answers one request by running the configured load,
//! calling every upstream through the worker pool and then holding the
//! response until the drawn request duration has passed.

use crate::budget;
use crate::config::Config;
use crate::error::{Result, UpstreamError};
use crate::inject::ErrorInjector;
use crate::load::{LoadGenerator, LoadStats};
use crate::net;
use crate::upstream::{HttpUpstream, Upstream};
use crate::worker::WorkerPool;
use chrono::{DateTime, SecondsFormat, Utc};
use fake_core::{Budget, GeneratorConfig, RequestDuration};
use fake_types::{Response, ResponseType};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Operational metrics for monitoring request handling.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    /// Total requests handled.
    pub requests_total: AtomicU64,
    /// Total failed upstream calls.
    pub upstream_errors_total: AtomicU64,
    /// Total requests answered with an injected error.
    pub injected_errors_total: AtomicU64,
    /// Total requests that ran past their drawn duration.
    pub budget_overruns_total: AtomicU64,
}

type CallFuture = Pin<Box<dyn Future<Output = std::result::Result<Response, UpstreamError>> + Send>>;
type CallFn = Box<dyn Fn(String) -> CallFuture + Send + Sync>;

/// One emulated service.
pub struct FakeService {
    name: String,
    message: String,
    upstream_uris: Vec<String>,
    pool: WorkerPool<CallFn>,
    timing: RequestDuration,
    load_config: Arc<GeneratorConfig>,
    load: Arc<LoadStats>,
    injector: Arc<dyn ErrorInjector>,
    metrics: ServiceMetrics,
    ip_addresses: Vec<String>,
    started: Instant,
    ready_delay: Duration,
}

impl std::fmt::Debug for FakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeService")
            .field("name", &self.name)
            .field("upstream_uris", &self.upstream_uris)
            .field("workers", &self.pool.workers())
            .field("timing", &self.timing)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl FakeService {
    /// Create a service that calls upstreams over HTTP and reports this
    /// host's interface addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_millis(config.service.upstream_timeout_ms);
        let upstream = HttpUpstream::new(timeout)?;
        let service = Self::new(config, Arc::new(upstream))?;
        Ok(service.with_ip_addresses(net::local_ip_addresses()))
    }

    /// Create a service that calls upstreams through `upstream`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &Config, upstream: Arc<dyn Upstream>) -> Result<Self> {
        let call: CallFn = Box::new(move |uri: String| -> CallFuture {
            let upstream = upstream.clone();
            Box::pin(async move { upstream.call(&uri).await })
        });

        Ok(Self {
            name: config.service.name.clone(),
            message: config.service.message.clone(),
            upstream_uris: config.service.upstream_uris.clone(),
            pool: WorkerPool::new(config.service.upstream_workers, call)?,
            timing: config.request_duration()?,
            load_config: Arc::new(config.generator_config()?),
            load: Arc::new(LoadStats::default()),
            injector: Arc::new(config.injector()?),
            metrics: ServiceMetrics::default(),
            ip_addresses: Vec::new(),
            started: Instant::now(),
            ready_delay: Duration::from_millis(config.service.ready_delay_ms),
        })
    }

    /// Replace the error injector.
    pub fn with_injector(mut self, injector: Arc<dyn ErrorInjector>) -> Self {
        self.injector = injector;
        self
    }

    /// Addresses reported in every response.
    pub fn with_ip_addresses(mut self, ip_addresses: Vec<String>) -> Self {
        self.ip_addresses = ip_addresses;
        self
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// Load counters shared by every request's generator.
    pub fn load(&self) -> &Arc<LoadStats> {
        &self.load
    }

    /// Addresses reported in every response.
    pub fn ip_addresses(&self) -> &[String] {
        &self.ip_addresses
    }

    /// Time since the service was created.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the readiness delay has passed.
    pub fn is_ready(&self) -> bool {
        self.uptime() >= self.ready_delay
    }

    /// Handle one request and return its response tree.
    ///
    /// Never fails: upstream failures and injected errors are reported in the
    /// returned tree.
    pub async fn handle(&self) -> Response {
        let started = Instant::now();
        let start_time = Utc::now();
        self.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

        // Each request gets its own generation; loops run until the handle
        // drops at the end of this request
        let generator = LoadGenerator::with_stats(self.load_config.clone(), self.load.clone());
        let _load = match generator.generate() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Load generation not started: {}", e);
                None
            }
        };

        let mut response = Response::new(&self.name, ResponseType::Http);
        response.ip_addresses = self.ip_addresses.clone();

        if let Some(injected) = self.injector.maybe_inject() {
            self.metrics
                .injected_errors_total
                .fetch_add(1, Ordering::Relaxed);
            response.code = injected.code;
            response.error = Some(injected.message);
            finish(&mut response, start_time, started);
            return response;
        }

        let (results, aggregate) = match self.pool.run(self.upstream_uris.clone()).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Upstream fan-out failed: {}", e);
                response.code = 500;
                response.error = Some(e.to_string());
                finish(&mut response, start_time, started);
                return response;
            }
        };
        response.append_upstreams(results.into_iter().map(|result| {
            let node = match result.outcome {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!(uri = %result.task, "Upstream call failed: {}", e);
                    e.to_response()
                }
            };
            (result.task, node)
        }));

        let target = self.timing.calculate(&mut rand::thread_rng());

        if let Some(aggregate) = aggregate {
            self.metrics
                .upstream_errors_total
                .fetch_add(aggregate.failed as u64, Ordering::Relaxed);
            response.code = 500;
            response.error = Some(aggregate.to_string());
            finish(&mut response, start_time, started);
            return response;
        }

        if let Budget::Exhausted { overrun } = budget::settle(target, started).await {
            if !overrun.is_zero() {
                self.metrics
                    .budget_overruns_total
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        response.code = 200;
        response.set_message(&self.message);
        finish(&mut response, start_time, started);
        response
    }
}

fn finish(response: &mut Response, start_time: DateTime<Utc>, started: Instant) {
    response.start_time = start_time.to_rfc3339_opts(SecondsFormat::Micros, true);
    response.end_time = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    response.duration = format!("{:?}", started.elapsed());
}
