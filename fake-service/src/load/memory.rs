//! Memory pressure loop.

use fake_core::{GeneratorConfig, TICK_INTERVAL};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::LoadStats;

/// Allocate `baseline + delta` bytes once per tick until cancelled.
pub(super) async fn run(
    config: &GeneratorConfig,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    stats: Arc<LoadStats>,
) {
    let model = config.variance_model();
    let mut phase = config.new_phase();
    let mut rng = StdRng::from_entropy();
    phase.reset(Instant::now());

    tracing::info!(
        baseline = phase.baseline_bytes(),
        variance = config.variance_percent(),
        model = %model,
        ticks_per_period = phase.ticks_per_period(),
        "Memory loop started"
    );

    while running.load(Ordering::Acquire) && !cancel.is_cancelled() {
        let started = Instant::now();
        phase.mark_tick(started);

        let delta = model.delta(&phase, &mut rng);
        let target = phase.target_bytes(delta);
        tracing::debug!(
            tick = %phase.fraction_label(),
            angle = %phase.radians_label(),
            model = %model,
            delta,
            "Computed memory variance"
        );

        let allocated = allocate(target);
        phase.record_allocation(allocated);
        stats.record_tick();
        tracing::debug!(bytes = allocated, tick = %phase.fraction_label(), "Allocated memory");

        phase.advance();

        let pause = TICK_INTERVAL.saturating_sub(started.elapsed());
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    tracing::info!(
        elapsed = ?phase.start_time().elapsed(),
        last_bytes = phase.current_bytes(),
        "Memory loop stopped"
    );
}

/// Touch a buffer of `bytes` bytes and release it.
///
/// Returns the number of bytes actually allocated, zero if the allocation
/// was refused.
fn allocate(bytes: u64) -> u64 {
    let Ok(len) = usize::try_from(bytes) else {
        tracing::warn!(bytes, "Allocation larger than address space, skipping");
        return 0;
    };

    let mut buffer: Vec<u8> = Vec::new();
    if let Err(e) = buffer.try_reserve_exact(len) {
        tracing::warn!(bytes, "Allocation failed: {}", e);
        return 0;
    }
    buffer.resize(len, 1);
    std::hint::black_box(&buffer);
    bytes
}
