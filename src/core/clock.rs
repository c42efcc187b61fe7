// src/core/clock.rs
use chrono::{DateTime, FixedOffset, Local};

/// Wall-clock source. Timers use tokio time; only hour-of-day decisions read this.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}
