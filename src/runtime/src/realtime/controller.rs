//! Handler registration and dispatch on top of the event log.
//!
//! The controller owns the consumer cursor. Its consumer loop runs only while
//! at least one handler is registered: it starts at the current time (events
//! fired before the consumer started are skipped), delivers each new event to
//! the handlers registered for its name, and exits once the last handler is
//! removed.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use log::{debug, trace};
use porthal_common::{EventCursor, EventError, EventName, LoggedEvent};
use porthal_hal::{Clock, Notifier};
use spin::Mutex;

use super::EventLog;
use crate::sync::SignalTable;
use crate::task::{Priority, Task};

/// Receiver of real-time events.
pub trait EventHandler: Send + Sync {
    /// Called once for every delivered event whose name the handler was registered for.
    fn handle_event(&self, event: &LoggedEvent);
}

struct ControllerState {
    handlers: BTreeMap<EventName, Vec<Arc<dyn EventHandler>>>,
    /// Time part of the cursor; `None` until the consumer first polls.
    last_time: Option<i64>,
    last_index: Option<u32>,
    running: bool,
}

/// Dispatches events from an [`EventLog`] to registered handlers.
pub struct EventController<C, N> {
    log: Arc<EventLog<C, N>>,
    state: Mutex<ControllerState>,
}

impl<C, N> EventController<C, N>
where
    C: Clock + 'static,
    N: Notifier + AsRef<SignalTable> + 'static,
{
    /// Create a controller consuming `log`.
    pub fn new(log: Arc<EventLog<C, N>>) -> Arc<Self> {
        Arc::new(Self {
            log,
            state: Mutex::new(ControllerState {
                handlers: BTreeMap::new(),
                last_time: None,
                last_index: None,
                running: false,
            }),
        })
    }

    /// The log this controller consumes.
    pub fn log(&self) -> &Arc<EventLog<C, N>> {
        &self.log
    }

    /// Register `handler` for events named `name`.
    ///
    /// Registering the same handler twice for a name is a no-op. Returns
    /// whether the handler was added.
    pub fn add_handler(
        &self,
        name: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<bool, EventError> {
        let name = EventName::new(name)?;
        let mut state = self.state.lock();
        let handlers = state.handlers.entry(name).or_default();
        if handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return Ok(false);
        }
        handlers.push(handler);
        Ok(true)
    }

    /// Remove every handler registered for `name`.
    pub fn remove_handlers(&self, name: &str) -> Result<(), EventError> {
        let name = EventName::new(name)?;
        let removed = self.state.lock().handlers.remove(&name).is_some();
        if removed {
            debug!("removed all handlers for {}", name);
        }
        self.stop_if_idle();
        Ok(())
    }

    /// Remove one handler registered for `name`.
    pub fn remove_handler(
        &self,
        name: &str,
        handler: &Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        let name = EventName::new(name)?;
        {
            let mut state = self.state.lock();
            if let Some(handlers) = state.handlers.get_mut(&name) {
                handlers.retain(|h| !Arc::ptr_eq(h, handler));
                if handlers.is_empty() {
                    state.handlers.remove(&name);
                }
            }
        }
        self.stop_if_idle();
        Ok(())
    }

    /// Whether any handler is registered.
    pub fn has_handlers(&self) -> bool {
        !self.state.lock().handlers.is_empty()
    }

    /// Whether the consumer loop is running.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Current consumer cursor, if the consumer has started.
    pub fn cursor(&self) -> Option<EventCursor> {
        let state = self.state.lock();
        state
            .last_time
            .map(|time| EventCursor::new(time, state.last_index))
    }

    /// Build the consumer task if handlers exist and none is running yet.
    ///
    /// The returned task runs at [`Priority::Realtime`] and must be spawned on
    /// an executor.
    pub fn start(self: &Arc<Self>) -> Option<Task> {
        {
            let mut state = self.state.lock();
            if state.running || state.handlers.is_empty() {
                return None;
            }
            state.running = true;
        }
        debug!("starting real-time event consumer");
        Some(Task::with_priority(
            Arc::clone(self).consume(),
            Priority::Realtime,
        ))
    }

    /// Add an event to the log, as a native producer would.
    pub fn fire(&self, name: &[u8]) -> Result<u32, EventError> {
        self.log.add(name)
    }

    /// Deliver an event to local handlers directly, bypassing the log.
    pub fn fire_event(&self, name: &str) -> Result<(), EventError> {
        let name = EventName::new(name)?;
        let event = LoggedEvent {
            time: self.log.now(),
            index: 0,
            name,
        };
        self.dispatch(&event);
        Ok(())
    }

    fn stop_if_idle(&self) {
        let idle = {
            let state = self.state.lock();
            state.running && state.handlers.is_empty()
        };
        if idle {
            self.log.interrupt();
        }
    }

    fn dispatch(&self, event: &LoggedEvent) {
        let handlers = match self.state.lock().handlers.get(&event.name) {
            Some(handlers) => handlers.clone(),
            None => return,
        };
        trace!("dispatching {} to {} handler(s)", event.name, handlers.len());
        for handler in handlers {
            handler.handle_event(event);
        }
    }

    async fn consume(self: Arc<Self>) {
        loop {
            let cursor = {
                let mut state = self.state.lock();
                if state.handlers.is_empty() {
                    state.last_time = None;
                    state.running = false;
                    debug!("no handlers left, event consumer exiting");
                    return;
                }
                let now = self.log.now();
                let time = *state.last_time.get_or_insert(now);
                EventCursor::new(time, state.last_index)
            };

            if let Some(event) = self.log.next_event(cursor).await {
                self.state.lock().last_index = Some(event.index);
                self.dispatch(&event);
            }
        }
    }
}
