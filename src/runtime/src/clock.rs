//! Millisecond clock advanced by the platform timer.

use core::sync::atomic::{AtomicI64, Ordering};

use porthal_hal::Clock;

/// A clock whose time is pushed in by the platform, typically from the RTC at
/// boot and from the timer tick afterwards.
#[derive(Debug, Default)]
pub struct TickClock {
    millis: AtomicI64,
}

impl TickClock {
    /// Create a clock reading `millis`.
    pub const fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Set the current time, e.g. after reading the RTC.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    /// Advance the clock by `delta` milliseconds. Called from the tick handler.
    pub fn advance(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::Relaxed);
    }
}

impl Clock for TickClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }
}
