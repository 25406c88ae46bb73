//! Phase tracking for the memory pressure loop.
//!
//! A variance period is divided into ticks of [`TICK_INTERVAL`]. The phase is
//! the position of the current tick within the period and is what the
//! variance models are evaluated against.
//!
//! The state is owned by a single memory loop. Nothing here is shared, so no
//! synchronization is needed.

use std::time::{Duration, Instant};

/// Interval between two memory loop iterations.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Lower bound on ticks per period so that `ticks - 1` is never zero.
pub const MIN_TICKS_PER_PERIOD: u32 = 2;

/// Phase state of one running memory loop.
#[derive(Debug, Clone)]
pub struct PhaseState {
    baseline_bytes: u64,
    max_variance_bytes: f64,
    current_bytes: u64,
    current_tick: u32,
    ticks_per_period: u32,
    start_time: Instant,
    last_tick_time: Instant,
}

impl PhaseState {
    /// Create phase state for a baseline, variance percentage and period.
    pub fn new(baseline_bytes: u64, variance_percent: u32, period: Duration) -> Self {
        let now = Instant::now();
        Self {
            baseline_bytes,
            max_variance_bytes: baseline_bytes as f64 * f64::from(variance_percent) / 100.0,
            current_bytes: baseline_bytes,
            current_tick: 0,
            ticks_per_period: ticks_per_period(period, TICK_INTERVAL),
            start_time: now,
            last_tick_time: now,
        }
    }

    /// Rewind to tick zero and refresh the timestamps.
    pub fn reset(&mut self, now: Instant) {
        self.current_bytes = self.baseline_bytes;
        self.current_tick = 0;
        self.start_time = now;
        self.last_tick_time = now;
    }

    /// Record the start of a tick.
    pub fn mark_tick(&mut self, now: Instant) {
        self.last_tick_time = now;
    }

    /// Move forward one tick, wrapping at the end of the period.
    pub fn advance(&mut self) {
        self.current_tick = (self.current_tick + 1) % self.ticks_per_period;
    }

    /// Apply a variance delta to the baseline.
    ///
    /// The result never accumulates previous deltas and never goes below zero.
    pub fn target_bytes(&self, delta: i64) -> u64 {
        self.baseline_bytes.saturating_add_signed(delta)
    }

    /// Remember the size allocated on the current tick.
    pub fn record_allocation(&mut self, bytes: u64) {
        self.current_bytes = bytes;
    }

    /// Position in the period, in `[0, 1)`.
    pub fn x(&self) -> f64 {
        f64::from(self.current_tick) / f64::from(self.ticks_per_period)
    }

    /// Position in the period, in `[0, 1]`.
    ///
    /// Reaches exactly 1 on the final tick of the period.
    pub fn linear_x(&self) -> f64 {
        f64::from(self.current_tick) / f64::from(self.ticks_per_period - 1)
    }

    /// Current angle in radians, in `[0, 2π)`.
    pub fn radians(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.x()
    }

    /// Tick as a fraction of the period, e.g. `3/10`.
    pub fn fraction_label(&self) -> String {
        format!("{}/{}", self.current_tick, self.ticks_per_period)
    }

    /// Current angle in π notation, e.g. `π/2` or `3π/5`.
    pub fn radians_label(&self) -> String {
        let (num, denom) = reduce(self.current_tick * 2, self.ticks_per_period);
        match (num, denom) {
            (0, _) => "0".to_string(),
            // 2π is excluded since the tick wraps before reaching the period
            (_, 1) => "π".to_string(),
            (1, _) => format!("π/{}", denom),
            _ => format!("{}π/{}", num, denom),
        }
    }

    /// Baseline allocation in bytes.
    pub fn baseline_bytes(&self) -> u64 {
        self.baseline_bytes
    }

    /// Largest absolute variance in bytes.
    pub fn max_variance_bytes(&self) -> f64 {
        self.max_variance_bytes
    }

    /// Size allocated on the most recent tick.
    pub fn current_bytes(&self) -> u64 {
        self.current_bytes
    }

    /// Current tick, in `[0, ticks_per_period)`.
    pub fn current_tick(&self) -> u32 {
        self.current_tick
    }

    /// Number of ticks in one period.
    pub fn ticks_per_period(&self) -> u32 {
        self.ticks_per_period
    }

    /// When the loop owning this state started.
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// When the most recent tick started.
    pub fn last_tick_time(&self) -> Instant {
        self.last_tick_time
    }

    #[cfg(test)]
    pub(crate) fn at_tick(mut self, tick: u32) -> Self {
        assert!(tick < self.ticks_per_period);
        self.current_tick = tick;
        self
    }
}

/// Number of ticks of length `tick` that fit in `period`, at least
/// [`MIN_TICKS_PER_PERIOD`].
pub fn ticks_per_period(period: Duration, tick: Duration) -> u32 {
    let ticks = period.as_millis() / tick.as_millis().max(1);
    u32::try_from(ticks)
        .unwrap_or(u32::MAX)
        .max(MIN_TICKS_PER_PERIOD)
}

fn reduce(num: u32, denom: u32) -> (u32, u32) {
    if num == 0 {
        return (num, denom);
    }
    let g = gcd(num, denom);
    (num / g, denom / g)
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn ticks_per_period_from_seconds() {
        assert_eq!(ticks_per_period(Duration::from_secs(60), TICK_INTERVAL), 120);
        assert_eq!(ticks_per_period(Duration::from_secs(5), TICK_INTERVAL), 10);
    }

    #[test]
    fn ticks_per_period_has_floor() {
        assert_eq!(ticks_per_period(Duration::ZERO, TICK_INTERVAL), 2);
        assert_eq!(ticks_per_period(Duration::from_millis(700), TICK_INTERVAL), 2);
    }

    #[test]
    fn max_variance_is_percentage_of_baseline() {
        let phase = PhaseState::new(100 * MIB, 20, Duration::from_secs(10));
        assert_eq!(phase.max_variance_bytes(), (20 * MIB) as f64);
        assert_eq!(phase.current_bytes(), 100 * MIB);
    }

    #[test]
    fn advance_wraps_at_period() {
        let mut phase = PhaseState::new(MIB, 10, Duration::from_secs(2));
        assert_eq!(phase.ticks_per_period(), 4);

        let ticks: Vec<u32> = (0..9)
            .map(|_| {
                let t = phase.current_tick();
                phase.advance();
                t
            })
            .collect();
        assert_eq!(ticks, vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn tick_stays_in_range() {
        let mut phase = PhaseState::new(MIB, 10, Duration::from_secs(1));
        for _ in 0..50 {
            assert!(phase.current_tick() < phase.ticks_per_period());
            phase.advance();
        }
    }

    #[test]
    fn target_is_relative_to_baseline() {
        let mut phase = PhaseState::new(1000, 10, Duration::from_secs(5));
        assert_eq!(phase.target_bytes(-100), 900);
        phase.record_allocation(900);
        // A second delta is applied to the baseline, not the previous allocation
        assert_eq!(phase.target_bytes(-100), 900);
        assert_eq!(phase.target_bytes(50), 1050);
    }

    #[test]
    fn target_never_negative() {
        let phase = PhaseState::new(10, 100, Duration::from_secs(5));
        assert_eq!(phase.target_bytes(-500), 0);
    }

    #[test]
    fn reset_rewinds_tick() {
        let mut phase = PhaseState::new(1000, 10, Duration::from_secs(5));
        phase.advance();
        phase.advance();
        phase.record_allocation(1100);

        let now = Instant::now();
        phase.reset(now);

        assert_eq!(phase.current_tick(), 0);
        assert_eq!(phase.current_bytes(), 1000);
        assert_eq!(phase.start_time(), now);
        assert_eq!(phase.last_tick_time(), now);
    }

    #[test]
    fn x_and_linear_x() {
        let phase = PhaseState::new(1000, 10, Duration::from_secs(5)).at_tick(9);
        assert_eq!(phase.x(), 0.9);
        assert_eq!(phase.linear_x(), 1.0);
    }

    #[test]
    fn labels() {
        let phase = PhaseState::new(1000, 10, Duration::from_secs(5));
        assert_eq!(phase.fraction_label(), "0/10");
        assert_eq!(phase.radians_label(), "0");

        let phase = phase.at_tick(5);
        assert_eq!(phase.fraction_label(), "5/10");
        assert_eq!(phase.radians_label(), "π");

        let phase = PhaseState::new(1000, 10, Duration::from_secs(4)).at_tick(2);
        assert_eq!(phase.radians_label(), "π/2");

        let phase = PhaseState::new(1000, 10, Duration::from_secs(5)).at_tick(3);
        assert_eq!(phase.radians_label(), "3π/5");
    }

    #[test]
    fn gcd_reduces() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(reduce(4, 8), (1, 2));
        assert_eq!(reduce(3, 7), (3, 7));
    }
}
