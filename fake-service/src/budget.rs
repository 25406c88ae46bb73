//! Duration budget controller.
//!
//! Sleeps out whatever is left of a request's target duration so that the
//! observed latency is `max(target, elapsed)`.

use fake_core::Budget;
use std::time::{Duration, Instant};

/// Sleep until `target` has passed since `started`.
///
/// Returns immediately when the request already ran past its target; the
/// overrun is logged and reported back, never treated as an error.
pub async fn settle(target: Duration, started: Instant) -> Budget {
    let budget = Budget::settle(target, started.elapsed());

    if let Budget::Exhausted { overrun } = budget {
        tracing::warn!(?target, ?overrun, "Request exceeded its duration budget");
        return budget;
    }

    let remaining = budget.sleep();
    tracing::debug!(?target, ?remaining, "Sleeping out request budget");
    tokio::time::sleep(remaining).await;

    budget
}
