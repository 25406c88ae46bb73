//! CPU pressure loop.
//!
//! The supervisor is a Tokio task. The busy-waiting itself happens on one
//! dedicated OS thread per core so that it never starves the runtime.

use fake_core::{DutyCycle, GeneratorConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Start one duty-cycle worker per core and run until cancelled.
pub(super) async fn run(
    config: &GeneratorConfig,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let cycle = config.duty_cycle();
    tracing::info!(
        cores = config.cpu_cores(),
        duty = config.cpu_duty_cycle(),
        run = ?cycle.run,
        sleep = ?cycle.sleep,
        "Generating CPU load"
    );

    // Flag owned by this supervisor's workers, cleared by either stop path
    let lane_running = Arc::new(AtomicBool::new(true));
    let mut workers = Vec::with_capacity(config.cpu_cores());
    for lane in 0..config.cpu_cores() {
        let (running, lane_running) = (running.clone(), lane_running.clone());
        let spawned = thread::Builder::new()
            .name(format!("cpu-load-{lane}"))
            .spawn(move || duty_cycle(cycle, &running, &lane_running));
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => {
                tracing::error!(lane, "Failed to start CPU worker: {}", e);
                break;
            }
        }
    }

    cancel.cancelled().await;
    lane_running.store(false, Ordering::Release);

    let started = workers.len();
    let joined = tokio::task::spawn_blocking(move || {
        workers
            .into_iter()
            .map(|worker| worker.join())
            .filter(Result::is_err)
            .count()
    })
    .await;

    match joined {
        Ok(0) => tracing::info!(workers = started, "CPU loop stopped"),
        Ok(panicked) => tracing::error!(panicked, "CPU workers panicked"),
        Err(e) => tracing::error!("Failed to join CPU workers: {}", e),
    }
}

/// Busy-wait for `run`, then sleep for `sleep`, while both flags are set.
fn duty_cycle(cycle: DutyCycle, running: &AtomicBool, lane_running: &AtomicBool) {
    let live = || running.load(Ordering::Acquire) && lane_running.load(Ordering::Acquire);

    while live() {
        let started = Instant::now();
        while started.elapsed() < cycle.run {
            std::hint::spin_loop();
        }
        if !cycle.sleep.is_zero() {
            thread::sleep(cycle.sleep);
        }
    }
}
