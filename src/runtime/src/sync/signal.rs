//! Numbered broadcast signals with epoch-based waiting.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};
use log::debug;
use porthal_hal::Notifier;
use spin::Mutex;

/// Per-signal state.
#[derive(Default)]
struct SignalSlot {
    /// Bumped on every raise.
    epoch: u64,
    /// Tasks parked until the epoch moves.
    waiters: Vec<Waker>,
}

/// A table of numbered signals.
///
/// Raising a signal wakes every task waiting on it (broadcast). Signals are
/// created on first use and live as long as the table.
pub struct SignalTable {
    slots: Mutex<BTreeMap<u32, SignalSlot>>,
}

impl SignalTable {
    /// Create an empty signal table.
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    /// Current epoch of `signal`. Take this before checking the wait condition.
    pub fn epoch(&self, signal: u32) -> u64 {
        self.slots.lock().get(&signal).map_or(0, |slot| slot.epoch)
    }

    /// Number of tasks parked on `signal`.
    pub fn waiting(&self, signal: u32) -> usize {
        self.slots
            .lock()
            .get(&signal)
            .map_or(0, |slot| slot.waiters.len())
    }

    /// Wait until `signal` is raised after the epoch `seen` was observed.
    ///
    /// Resolves immediately if it already has been.
    pub fn wait(&self, signal: u32, seen: u64) -> SignalWait<'_> {
        SignalWait {
            table: self,
            signal,
            seen,
        }
    }

    /// Raise `signal`, waking every waiter. Returns how many were woken.
    pub fn raise(&self, signal: u32) -> usize {
        let waiters = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(signal).or_default();
            slot.epoch = slot.epoch.wrapping_add(1);
            core::mem::take(&mut slot.waiters)
        };

        let woken = waiters.len();
        for waker in waiters {
            waker.wake();
        }
        if woken > 0 {
            debug!("signal {:#x} woke {} waiter(s)", signal, woken);
        }
        woken
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<SignalTable> for SignalTable {
    fn as_ref(&self) -> &SignalTable {
        self
    }
}

impl Notifier for SignalTable {
    fn notify(&self, signal: u32) {
        self.raise(signal);
    }
}

/// Future returned by [`SignalTable::wait`].
pub struct SignalWait<'a> {
    table: &'a SignalTable,
    signal: u32,
    seen: u64,
}

impl Future for SignalWait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // Epoch check and waker registration happen under one lock, so a raise
        // cannot slip in between them.
        let mut slots = this.table.slots.lock();
        let slot = slots.entry(this.signal).or_default();
        if slot.epoch != this.seen {
            return Poll::Ready(());
        }

        if !slot.waiters.iter().any(|w| w.will_wake(cx.waker())) {
            slot.waiters.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use futures_util::task::{waker, ArcWake};

    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn poll_once(fut: &mut SignalWait<'_>, counter: &Arc<CountingWaker>) -> Poll<()> {
        let waker = waker(Arc::clone(counter));
        let mut cx = Context::from_waker(&waker);
        Pin::new(fut).poll(&mut cx)
    }

    #[test]
    fn test_wait_pending_until_raise() {
        let table = SignalTable::new();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));

        let seen = table.epoch(1);
        let mut wait = table.wait(1, seen);
        assert!(poll_once(&mut wait, &counter).is_pending());
        assert_eq!(table.waiting(1), 1);

        assert_eq!(table.raise(1), 1);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(poll_once(&mut wait, &counter).is_ready());
    }

    #[test]
    fn test_raise_before_wait_is_not_lost() {
        let table = SignalTable::new();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));

        let seen = table.epoch(9);
        table.raise(9);

        let mut wait = table.wait(9, seen);
        assert!(poll_once(&mut wait, &counter).is_ready());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_signals_are_independent() {
        let table = SignalTable::new();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));

        let mut wait = table.wait(1, table.epoch(1));
        assert!(poll_once(&mut wait, &counter).is_pending());

        assert_eq!(table.raise(2), 0);
        assert!(poll_once(&mut wait, &counter).is_pending());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_repeated_poll_registers_once() {
        let table = SignalTable::new();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));

        let mut wait = table.wait(3, table.epoch(3));
        assert!(poll_once(&mut wait, &counter).is_pending());
        assert!(poll_once(&mut wait, &counter).is_pending());
        assert_eq!(table.waiting(3), 1);
    }

    #[test]
    fn test_notifier_raises() {
        let table = SignalTable::new();
        let before = table.epoch(4);
        table.notify(4);
        assert_eq!(table.epoch(4), before + 1);
    }
}
