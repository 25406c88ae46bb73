//! Request duration distribution.
//!
//! Produces the target duration of each request from configured percentiles.
//! A request lands in the p50 bucket half of the time, the p90 bucket 40% of
//! the time, the p99 bucket 9% of the time, and beyond p99 for the remaining
//! 1%. The chosen value is then jittered by up to `variance_percent` either way.

use rand::Rng;
use std::time::Duration;

/// Errors rejecting a duration distribution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    /// Percentiles are not ordered p50 ≤ p90 ≤ p99.
    #[error("percentiles must satisfy p50 <= p90 <= p99 (got {p50:?}, {p90:?}, {p99:?})")]
    Unordered {
        /// Configured p50.
        p50: Duration,
        /// Configured p90.
        p90: Duration,
        /// Configured p99.
        p99: Duration,
    },
    /// Jitter would allow negative durations.
    #[error("timing variance must be at most 100%, got {0}%")]
    Variance(u32),
}

/// Percentile-based request duration distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestDuration {
    p50: Duration,
    p90: Duration,
    p99: Duration,
    variance_percent: u32,
}

impl RequestDuration {
    /// Build a distribution from percentiles and a jitter percentage.
    ///
    /// # Errors
    ///
    /// Returns an error if the percentiles are out of order or the variance
    /// exceeds 100%.
    pub fn new(
        p50: Duration,
        p90: Duration,
        p99: Duration,
        variance_percent: u32,
    ) -> Result<Self, TimingError> {
        if p50 > p90 || p90 > p99 {
            return Err(TimingError::Unordered { p50, p90, p99 });
        }
        if variance_percent > 100 {
            return Err(TimingError::Variance(variance_percent));
        }
        Ok(Self {
            p50,
            p90,
            p99,
            variance_percent,
        })
    }

    /// Draw a target duration for one request.
    pub fn calculate<R: Rng>(&self, rng: &mut R) -> Duration {
        let bucket = rng.gen_range(0..100u32);
        let base = match bucket {
            0..=49 => self.p50,
            50..=89 => self.p90,
            90..=98 => self.p99,
            _ => self.p99 + (self.p99 - self.p90),
        };

        if self.variance_percent == 0 || base.is_zero() {
            return base;
        }

        let spread = f64::from(self.variance_percent) / 100.0;
        let factor = 1.0 + rng.gen_range(-spread..=spread);
        base.mul_f64(factor.max(0.0))
    }
}
