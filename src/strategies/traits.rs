// src/strategies/traits.rs
use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use tokio::time::Instant;

/// Timing policy of one service. Each scheduler task owns its own value, so
/// jitter and alignment state never leak between services.
pub trait Cadence: Send {
    fn name(&self) -> &'static str;

    /// Wait between the cold-start cycle and the first regular tick.
    fn first_wait(&mut self, now: DateTime<FixedOffset>) -> Duration;

    /// Deadline of the tick after the one that was due at `fired_at` and
    /// whose cycle completed at `finished_at`.
    fn next_tick(&mut self, fired_at: Instant, finished_at: Instant) -> Instant;

    /// Pause between two consecutive items of one cycle.
    fn item_gap(&mut self) -> Duration {
        Duration::ZERO
    }
}
