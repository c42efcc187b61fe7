// src/strategies/marketplace.rs
use crate::strategies::traits::Cadence;
use chrono::{DateTime, FixedOffset};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;

pub const BASE_INTERVAL: Duration = Duration::from_secs(20 * 60);
/// Upper bound (exclusive) of the jitter added to every redrawn interval.
pub const INTERVAL_JITTER: Duration = Duration::from_secs(10 * 60);
pub const MIN_ITEM_GAP: Duration = Duration::from_secs(60);
pub const MAX_ITEM_GAP: Duration = Duration::from_secs(180);

/// 20 минут + случайные 0..10 минут, пересчитывается после каждого цикла,
/// чтобы период опроса не был фиксированным.
pub struct MarketplaceCadence<R = StdRng> {
    rng: R,
}

impl MarketplaceCadence<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for MarketplaceCadence<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + Send> MarketplaceCadence<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    fn redraw(&mut self) -> Duration {
        BASE_INTERVAL + random_between(&mut self.rng, Duration::ZERO, INTERVAL_JITTER)
    }
}

impl<R: Rng + Send> Cadence for MarketplaceCadence<R> {
    fn name(&self) -> &'static str {
        "marketplace"
    }

    fn first_wait(&mut self, _now: DateTime<FixedOffset>) -> Duration {
        BASE_INTERVAL
    }

    fn next_tick(&mut self, _fired_at: Instant, finished_at: Instant) -> Instant {
        finished_at + self.redraw()
    }

    fn item_gap(&mut self) -> Duration {
        random_between(&mut self.rng, MIN_ITEM_GAP, MAX_ITEM_GAP)
    }
}

/// Uniform in `[low, high)` at millisecond resolution.
fn random_between<R: Rng>(rng: &mut R, low: Duration, high: Duration) -> Duration {
    let low_ms = low.as_millis() as u64;
    let high_ms = high.as_millis() as u64;
    if high_ms <= low_ms {
        return low;
    }
    Duration::from_millis(rng.gen_range(low_ms..high_ms))
}
