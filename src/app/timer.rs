// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-interval tick scheduling for the main loop

use std::time::{Duration, Instant};

/// Deadline tracker for one periodic callback
///
/// The main loop asks each ticker how long it may wait, sleeps (or polls
/// input) for at most that long, then fires whichever tickers are due.
/// Late ticks are not replayed: a ticker that fell behind fires once and
/// reschedules from the current time.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    /// A ticker whose first tick is due immediately
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// Time left until the next tick, zero if already due
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Consume a due tick; returns false if it was not due yet
    pub fn fire(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }
}
