#![forbid(unsafe_code)]

//! Time sources.

use std::cell::Cell;

use barrage_core::Millis;
use web_time::{SystemTime, UNIX_EPOCH};

/// Source of "now" on the shared time base.
pub trait Clock {
    fn now(&self) -> Millis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Millis {
        (**self).now()
    }
}

/// Wall clock in epoch milliseconds, matching transport timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| Millis::try_from(d.as_millis()).unwrap_or(Millis::MAX))
    }
}

/// Hand-driven clock for tests and simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// Move forward by `by` ms and return the new time.
    pub fn advance(&self, by: Millis) -> Millis {
        let next = self.now.get().saturating_add(by);
        self.now.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}
