//! porthal Hardware Abstraction Layer (HAL) traits.
//!
//! This crate defines the few platform services the runtime consumes: a wall
//! clock for stamping events and a wake primitive for suspended native callers.

#![no_std]

extern crate alloc;

use alloc::sync::Arc;

/// Trait for a wall-clock time source.
pub trait Clock {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Trait for waking native callers suspended on a numbered signal.
pub trait Notifier {
    /// Wakes every caller currently waiting on `signal`.
    fn notify(&self, signal: u32);
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, signal: u32) {
        (**self).notify(signal)
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, signal: u32) {
        (**self).notify(signal)
    }
}

/// A notifier that drops every wake-up.
///
/// Useful for event logs whose consumers only ever poll.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _signal: u32) {}
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}
