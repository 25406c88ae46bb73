//! Load generator configuration.
//!
//! [`GeneratorConfig`] is created once per service instance and never
//! mutated. Invalid values are rejected at construction instead of being
//! silently clamped.

use std::time::Duration;

use crate::phase::PhaseState;
use crate::variance::VarianceModel;

/// Length of one CPU duty cycle (busy portion + sleep portion).
pub const CPU_UNIT_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on CPU lanes a single generator may start.
pub const MAX_CPU_CORES: usize = 1024;

/// Bytes in one MiB.
pub const MIB: u64 = 1024 * 1024;

/// Busy and idle portions of one CPU duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    /// Time spent busy-waiting.
    pub run: Duration,
    /// Time spent suspended.
    pub sleep: Duration,
}

/// Errors rejecting a generator configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorConfigError {
    /// Duty cycle is not a fraction in `[0, 1]`.
    #[error("cpu duty cycle must be within [0, 1], got {0}")]
    DutyCycle(f64),

    /// Too many CPU lanes requested.
    #[error("cpu cores must be at most {max}, got {cores}")]
    TooManyCores {
        /// Requested cores.
        cores: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// Variance would drive allocations below zero.
    #[error("memory variance must be at most 100%, got {0}%")]
    Variance(u32),

    /// Variance is enabled but has no period to vary over.
    #[error("memory variance period must be non-zero when variance is enabled")]
    ZeroPeriod,
}

/// Immutable configuration of one load generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    cpu_cores: usize,
    cpu_duty_cycle: f64,
    baseline_bytes: u64,
    variance_percent: u32,
    variance_model: VarianceModel,
    variance_period: Duration,
}

impl GeneratorConfig {
    /// Validate and build a configuration.
    ///
    /// The variance model is resolved from `variance_model` here; unknown
    /// names quietly become [`VarianceModel::Zero`].
    ///
    /// # Errors
    ///
    /// Returns an error if the duty cycle is outside `[0, 1]`, more than
    /// [`MAX_CPU_CORES`] cores are requested, variance exceeds 100%, or
    /// variance is enabled with a zero period.
    pub fn new(
        cpu_cores: usize,
        cpu_duty_cycle: f64,
        baseline_bytes: u64,
        variance_percent: u32,
        variance_model: &str,
        variance_period: Duration,
    ) -> Result<Self, GeneratorConfigError> {
        if !(0.0..=1.0).contains(&cpu_duty_cycle) {
            return Err(GeneratorConfigError::DutyCycle(cpu_duty_cycle));
        }
        if cpu_cores > MAX_CPU_CORES {
            return Err(GeneratorConfigError::TooManyCores {
                cores: cpu_cores,
                max: MAX_CPU_CORES,
            });
        }
        if variance_percent > 100 {
            return Err(GeneratorConfigError::Variance(variance_percent));
        }
        if variance_percent > 0 && variance_period.is_zero() {
            return Err(GeneratorConfigError::ZeroPeriod);
        }

        Ok(Self {
            cpu_cores,
            cpu_duty_cycle,
            baseline_bytes,
            variance_percent,
            variance_model: VarianceModel::from_name(variance_model, variance_percent),
            variance_period,
        })
    }

    /// Configuration that allocates `baseline_bytes` and nothing else.
    pub fn memory_only(baseline_bytes: u64) -> Self {
        Self {
            cpu_cores: 0,
            cpu_duty_cycle: 0.0,
            baseline_bytes,
            variance_percent: 0,
            variance_model: VarianceModel::Zero,
            variance_period: Duration::ZERO,
        }
    }

    /// Number of CPU lanes.
    pub fn cpu_cores(&self) -> usize {
        self.cpu_cores
    }

    /// Whether a CPU loop is started.
    pub fn cpu_enabled(&self) -> bool {
        self.cpu_cores > 0
    }

    /// Fraction of each unit interval spent busy.
    pub fn cpu_duty_cycle(&self) -> f64 {
        self.cpu_duty_cycle
    }

    /// Busy and idle portions of one [`CPU_UNIT_INTERVAL`].
    pub fn duty_cycle(&self) -> DutyCycle {
        let unit_nanos = CPU_UNIT_INTERVAL.as_nanos() as f64;
        let run = Duration::from_nanos((unit_nanos * self.cpu_duty_cycle).round() as u64);
        DutyCycle {
            run,
            sleep: CPU_UNIT_INTERVAL.saturating_sub(run),
        }
    }

    /// Baseline memory size in bytes.
    pub fn baseline_bytes(&self) -> u64 {
        self.baseline_bytes
    }

    /// Variance as a percentage of the baseline.
    pub fn variance_percent(&self) -> u32 {
        self.variance_percent
    }

    /// Resolved variance model.
    pub fn variance_model(&self) -> VarianceModel {
        self.variance_model
    }

    /// Length of one variance period.
    pub fn variance_period(&self) -> Duration {
        self.variance_period
    }

    /// Fresh phase state for a new generation.
    pub fn new_phase(&self) -> PhaseState {
        PhaseState::new(
            self.baseline_bytes,
            self.variance_percent,
            self.variance_period,
        )
    }
}
