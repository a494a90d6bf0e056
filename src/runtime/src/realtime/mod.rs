//! Bounded real-time event log.
//!
//! Producers append named events; a single polling consumer asks for the
//! oldest event newer than its cursor. The ring holds the most recent
//! `capacity` events and overwrites the oldest slot silently once full, so a
//! consumer that falls behind by more than `capacity` events skips the lost
//! ones without being told.
//!
//! When nothing newer than the cursor exists, [`EventLog::get`] answers
//! [`EventError::WouldBlock`] and marks the log as blocked. The next
//! [`EventLog::add`] clears the mark and raises [`EVENT_SIGNAL`] through the
//! log's [`Notifier`] exactly once.

mod controller;

pub use controller::{EventController, EventHandler};

use alloc::vec;
use alloc::vec::Vec;
use log::{debug, trace, warn};
use porthal_common::{EventCursor, EventError, EventName, LoggedEvent};
use porthal_hal::{Clock, Notifier};
use spin::Mutex;

use crate::config::{EventLogConfig, EVENT_SIGNAL, MAX_EVENT_INDEX};
use crate::sync::SignalTable;

/// Ring state, guarded as a whole.
struct Ring {
    /// `None` until a slot is first written.
    slots: Vec<Option<LoggedEvent>>,
    /// Index the next added event receives.
    next_index: u32,
    /// Set when a `get` found nothing; cleared by the next `add`.
    blocked: bool,
}

/// A fixed-capacity log of recently fired events.
pub struct EventLog<C, N> {
    ring: Mutex<Ring>,
    clock: C,
    notifier: N,
}

impl<C: Clock, N: Notifier> EventLog<C, N> {
    /// Create a log with the default capacity.
    pub fn new(clock: C, notifier: N) -> Self {
        Self::with_config(EventLogConfig::default(), clock, notifier)
    }

    /// Create a log sized by `config`.
    pub fn with_config(config: EventLogConfig, clock: C, notifier: N) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            ring: Mutex::new(Ring {
                slots: vec![None; capacity],
                next_index: 0,
                blocked: false,
            }),
            clock,
            notifier,
        }
    }

    /// Add an event named by raw bytes.
    ///
    /// Empty names and names longer than [`porthal_common::MAX_NAME_LEN`]
    /// bytes are rejected without touching the log. Returns the index
    /// assigned to the event.
    pub fn add(&self, name: &[u8]) -> Result<u32, EventError> {
        match EventName::from_bytes(name) {
            Ok(name) => Ok(self.push(name)),
            Err(e) => {
                warn!("rejecting real-time event: {}", e);
                Err(e)
            }
        }
    }

    /// Add an already validated event. Returns its index.
    pub fn push(&self, name: EventName) -> u32 {
        let (index, wake) = {
            let mut ring = self.ring.lock();
            let index = ring.next_index;
            let slot = index as usize % ring.slots.len();
            ring.slots[slot] = Some(LoggedEvent {
                time: self.clock.now_millis(),
                index,
                name,
            });
            ring.next_index = if index == MAX_EVENT_INDEX { 0 } else { index + 1 };
            (index, core::mem::take(&mut ring.blocked))
        };

        trace!("event {} logged as #{}", name, index);
        if wake {
            debug!("event #{} releases blocked consumer", index);
            self.notifier.notify(EVENT_SIGNAL);
        }
        index
    }

    /// Oldest event newer than `cursor`.
    ///
    /// Returns [`EventError::WouldBlock`] and marks the log blocked when there
    /// is none; the caller should wait for [`EVENT_SIGNAL`] and retry with the
    /// same cursor.
    pub fn get(&self, cursor: EventCursor) -> Result<LoggedEvent, EventError> {
        let mut ring = self.ring.lock();
        let found = ring
            .slots
            .iter()
            .flatten()
            .filter(|event| cursor.admits(event))
            .min_by_key(|event| event.index)
            .copied();

        match found {
            Some(event) => Ok(event),
            None => {
                ring.blocked = true;
                Err(EventError::WouldBlock)
            }
        }
    }

    /// Current time of the log's clock.
    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Number of ring slots.
    pub fn capacity(&self) -> usize {
        self.ring.lock().slots.len()
    }

    /// Number of events currently held.
    pub fn len(&self) -> usize {
        self.ring.lock().slots.iter().flatten().count()
    }

    /// Whether no event has been added yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index the next added event will receive.
    pub fn next_index(&self) -> u32 {
        self.ring.lock().next_index
    }

    /// Whether a consumer was told to block and has not been released yet.
    pub fn is_blocked(&self) -> bool {
        self.ring.lock().blocked
    }

    #[cfg(test)]
    fn with_next_index(self, index: u32) -> Self {
        self.ring.lock().next_index = index;
        self
    }
}

impl<C: Clock, N: Notifier + AsRef<SignalTable>> EventLog<C, N> {
    /// The signal table the log raises [`EVENT_SIGNAL`] on.
    pub fn signals(&self) -> &SignalTable {
        self.notifier.as_ref()
    }

    /// Wait for the oldest event newer than `cursor`.
    ///
    /// Returns `None` if the wait was ended by a raise of [`EVENT_SIGNAL`]
    /// that brought no qualifying event, which is how
    /// [`EventLog::interrupt`] reaches a parked consumer.
    pub async fn next_event(&self, cursor: EventCursor) -> Option<LoggedEvent> {
        let signals = self.signals();
        let seen = signals.epoch(EVENT_SIGNAL);
        match self.get(cursor) {
            Ok(event) => return Some(event),
            Err(_) => debug!("consumer at {:?} blocked", cursor),
        }

        signals.wait(EVENT_SIGNAL, seen).await;
        self.get(cursor).ok()
    }

    /// Wake a consumer parked in [`EventLog::next_event`] without adding an event.
    pub fn interrupt(&self) {
        debug!("interrupting event consumer");
        self.signals().raise(EVENT_SIGNAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TickClock;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use porthal_hal::{FixedClock, NullNotifier};

    #[derive(Default)]
    struct CountingNotifier(AtomicUsize);

    impl Notifier for CountingNotifier {
        fn notify(&self, signal: u32) {
            assert_eq!(signal, EVENT_SIGNAL);
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn name_of(event: &LoggedEvent) -> &[u8] {
        event.name.as_bytes()
    }

    #[test]
    fn test_events_delivered_in_order() {
        let clock = TickClock::new(10);
        let log = EventLog::new(&clock, NullNotifier);

        for name in [&b"e1"[..], b"e2", b"e3"] {
            log.add(name).unwrap();
            clock.advance(1);
        }

        let mut cursor = EventCursor::START;
        let mut seen = alloc::vec::Vec::new();
        while let Ok(event) = log.get(cursor) {
            seen.push(event.name);
            cursor.advance(&event);
        }
        let names: alloc::vec::Vec<_> = seen.iter().map(|n| n.as_bytes()).collect();
        assert_eq!(names, [&b"e1"[..], b"e2", b"e3"]);
    }

    #[test]
    fn test_empty_log_blocks() {
        let log = EventLog::new(FixedClock(0), NullNotifier);
        assert_eq!(log.get(EventCursor::START), Err(EventError::WouldBlock));
        assert!(log.is_blocked());
        assert!(log.is_empty());
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let log = EventLog::new(FixedClock(0), NullNotifier);
        let capacity = log.capacity();

        for _ in 0..=capacity {
            log.add(b"tick").unwrap();
        }

        let event = log.get(EventCursor::START).unwrap();
        assert_eq!(event.index, 1);
        assert_eq!(log.len(), capacity);
    }

    #[test]
    fn test_would_block_then_add_succeeds() {
        let clock = TickClock::new(500);
        let notifier = CountingNotifier::default();
        let log = EventLog::new(&clock, &notifier);

        log.add(b"old").unwrap();
        let cursor = EventCursor::new(clock.now_millis(), Some(1_000));
        assert_eq!(log.get(cursor), Err(EventError::WouldBlock));

        let cursor = EventCursor::new(clock.now_millis(), Some(0));
        assert_eq!(log.get(cursor), Err(EventError::WouldBlock));
        log.add(b"new").unwrap();
        let event = log.get(cursor).unwrap();
        assert_eq!(name_of(&event), b"new");
        assert_eq!(event.index, 1);
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wake_only_when_blocked() {
        let notifier = CountingNotifier::default();
        let log = EventLog::new(FixedClock(0), &notifier);

        log.add(b"a").unwrap();
        log.add(b"b").unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);

        let _ = log.get(EventCursor::new(0, Some(1)));
        log.add(b"c").unwrap();
        log.add(b"d").unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
        assert!(!log.is_blocked());
    }

    #[test]
    fn test_invalid_names_do_not_advance() {
        let log = EventLog::new(FixedClock(0), NullNotifier);

        assert_eq!(log.add(b""), Err(EventError::InvalidName));
        assert_eq!(log.add(b"sixteen_chars___"), Err(EventError::InvalidName));
        assert_eq!(log.next_index(), 0);

        assert_eq!(log.add(b"fifteen_chars__"), Ok(0));
        assert_eq!(log.next_index(), 1);
    }

    #[test]
    fn test_index_restarts_after_max() {
        let log = EventLog::new(FixedClock(0), NullNotifier).with_next_index(MAX_EVENT_INDEX);

        assert_eq!(log.add(b"last"), Ok(MAX_EVENT_INDEX));
        assert_eq!(log.next_index(), 0);
        assert_eq!(log.add(b"first"), Ok(0));
        assert!(i32::try_from(MAX_EVENT_INDEX).is_ok());
    }

    #[test]
    fn test_time_filter() {
        let clock = TickClock::new(100);
        let log = EventLog::new(&clock, NullNotifier);

        log.add(b"early").unwrap();
        clock.set(200);
        log.add(b"late").unwrap();

        let event = log.get(EventCursor::new(150, None)).unwrap();
        assert_eq!(name_of(&event), b"late");
        assert_eq!(event.time, 200);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let log = EventLog::with_config(
            EventLogConfig { capacity: 0 },
            FixedClock(0),
            NullNotifier,
        );
        assert_eq!(log.capacity(), 1);
        log.add(b"a").unwrap();
        log.add(b"b").unwrap();
        assert_eq!(name_of(&log.get(EventCursor::START).unwrap()), b"b");
    }
}
