//! The reactor's coarse clock.
//!
//! All timers of a reactor share one clock. Time is measured, never
//! signalled: every dispatch pass asks how many whole ticks went by since the
//! last one and replays them, so timer precision is exactly one tick.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Clock {
    tick: Duration,
    last: Instant,
}

impl Clock {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick: tick.max(Duration::from_millis(1)),
            last: Instant::now(),
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Whole ticks elapsed since the previous call. The reference point moves
    /// forward by exactly that many ticks so fractions carry over.
    pub fn elapsed_ticks(&mut self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.last);
        let ticks = (elapsed.as_nanos() / self.tick.as_nanos()) as u64;
        if ticks > 0 {
            self.last += self.tick * ticks as u32;
        }
        ticks
    }

    /// Instant at which `ticks` more ticks will have elapsed.
    pub fn deadline(&self, ticks: u32) -> Instant {
        self.last + self.tick * ticks
    }

    /// Period expressed in ticks, rounded down, never zero.
    pub fn ticks_for(&self, period: Duration) -> u32 {
        let n = period.as_nanos() / self.tick.as_nanos();
        u32::try_from(n).unwrap_or(u32::MAX).max(1)
    }
}

/// A periodic countdown measured in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    period: u32,
    remaining: u32,
}

impl Timer {
    pub fn new(period: u32) -> Self {
        let period = period.max(1);
        Self {
            period,
            remaining: period,
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Count one tick down. Returns true when the timer fires; it is then
    /// reloaded with its period.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.period;
            return true;
        }
        false
    }
}
