// src/strategies/bank.rs
use crate::strategies::traits::Cadence;
use chrono::{DateTime, FixedOffset, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;

pub const HOUR: Duration = Duration::from_secs(60 * 60);
/// Rough time one poll cycle takes; the alignment wakes up this much earlier.
pub const PROCESSING_ALLOWANCE: Duration = Duration::from_secs(3 * 60);
/// Upper bound (exclusive) of the start-up jitter budget.
pub const MAX_JITTER_BUDGET: Duration = Duration::from_secs(5 * 60);

/// How long to sleep so a check lands just before `target`.
///
/// Wakes up `jitter_budget + PROCESSING_ALLOWANCE` early when there is room
/// for it, waits the whole way when there is not, and returns zero when the
/// target has already passed.
pub fn aligned_wait(
    now: DateTime<FixedOffset>,
    target: DateTime<FixedOffset>,
    jitter_budget: Duration,
) -> Duration {
    let Ok(raw) = (target - now).to_std() else {
        return Duration::ZERO;
    };

    let reserve = jitter_budget + PROCESSING_ALLOWANCE;
    if raw < reserve {
        raw
    } else {
        raw - reserve
    }
}

/// Start of the hour following `now`.
pub fn next_top_of_hour(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let into_hour = chrono::Duration::seconds(i64::from(now.minute() * 60 + now.second()))
        + chrono::Duration::nanoseconds(i64::from(now.nanosecond()));
    now - into_hour + chrono::Duration::hours(1)
}

/// Hourly ticker aligned once to the top of the hour. Whether a tick may
/// actually fetch depends on the service's sending hours, checked by the cycle.
pub struct BankCadence<R = StdRng> {
    rng: R,
}

impl BankCadence<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for BankCadence<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + Send> BankCadence<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> Cadence for BankCadence<R> {
    fn name(&self) -> &'static str {
        "bank"
    }

    fn first_wait(&mut self, now: DateTime<FixedOffset>) -> Duration {
        let budget_ms = self.rng.gen_range(0..MAX_JITTER_BUDGET.as_millis() as u64);
        aligned_wait(now, next_top_of_hour(now), Duration::from_millis(budget_ms))
    }

    fn next_tick(&mut self, fired_at: Instant, finished_at: Instant) -> Instant {
        // Fixed hourly grid; ticks missed by a long cycle are skipped, not replayed.
        let mut next = fired_at + HOUR;
        while next <= finished_at {
            next += HOUR;
        }
        next
    }
}
