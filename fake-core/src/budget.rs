//! Request duration budget.
//!
//! A request has a target total duration `D`. Work done while handling it
//! (load generation setup, upstream fan-out) takes `E`. Whatever is left of
//! the budget is slept out so that the observed latency is `max(D, E)`.

use std::time::Duration;

/// Outcome of comparing elapsed time against the target duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Time left to sleep before responding.
    Remaining(Duration),
    /// Intrinsic work already used up the budget; respond immediately.
    Exhausted {
        /// How far past the target the request already is.
        overrun: Duration,
    },
}

impl Budget {
    /// Compare `elapsed` against `target`.
    pub fn settle(target: Duration, elapsed: Duration) -> Self {
        match target.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => Self::Remaining(remaining),
            _ => Self::Exhausted {
                overrun: elapsed.saturating_sub(target),
            },
        }
    }

    /// Time to sleep; zero when exhausted.
    pub fn sleep(&self) -> Duration {
        match self {
            Self::Remaining(remaining) => *remaining,
            Self::Exhausted { .. } => Duration::ZERO,
        }
    }

    /// Check if no time is left.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn remaining_is_target_minus_elapsed() {
        assert_eq!(Budget::settle(ms(100), ms(30)), Budget::Remaining(ms(70)));
        assert_eq!(Budget::settle(ms(100), ms(30)).sleep(), ms(70));
    }

    #[test]
    fn overrun_is_exhausted() {
        let budget = Budget::settle(ms(100), ms(150));
        assert_eq!(budget, Budget::Exhausted { overrun: ms(50) });
        assert!(budget.is_exhausted());
        assert_eq!(budget.sleep(), Duration::ZERO);
    }

    #[test]
    fn exact_match_is_exhausted_without_overrun() {
        assert_eq!(
            Budget::settle(ms(100), ms(100)),
            Budget::Exhausted {
                overrun: Duration::ZERO
            }
        );
    }

    #[test]
    fn zero_target_never_sleeps() {
        assert!(Budget::settle(Duration::ZERO, Duration::ZERO).is_exhausted());
        assert!(Budget::settle(Duration::ZERO, ms(5)).is_exhausted());
    }
}
