//! Process-wide instances and the native-call surface.
//!
//! The VM's native methods reach the runtime through the functions below.
//! They speak the VM's conventions: ids and indices are `i32`, `-1` means
//! "no result", and failures the VM reports as exceptions come back as
//! [`NativeError`].
//!
//! A native event consumer snapshots [`rt_event_epoch`], calls
//! [`rt_event_get`], and on `-1` suspends on [`rt_event_wait`] with the
//! snapshot before retrying.

use alloc::sync::Arc;
use core::{fmt, ops::Range};

use lazy_static::lazy_static;
use log::warn;
use porthal_common::{BridgeError, BridgeId, EventCursor, EventName, LoggedEvent};

use crate::clock::TickClock;
use crate::config::EVENT_SIGNAL;
use crate::ipc::BridgeRegistry;
use crate::realtime::EventLog;
use crate::sync::{SignalTable, SignalWait};

/// Wall clock stamping real-time events. The platform sets and advances it.
pub static CLOCK: TickClock = TickClock::new(0);

lazy_static! {
    /// Signals native callers suspend on.
    pub static ref SIGNALS: Arc<SignalTable> = Arc::new(SignalTable::new());

    /// The real-time event log.
    pub static ref EVENT_LOG: EventLog<&'static TickClock, Arc<SignalTable>> =
        EventLog::new(&CLOCK, Arc::clone(&SIGNALS));

    /// The IPC bridge registry.
    pub static ref BRIDGES: BridgeRegistry = BridgeRegistry::new();
}

/// Failure the VM surfaces as an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeError {
    /// A bridge operation failed (`IOException`).
    Io(BridgeError),
    /// A negative bridge id was passed (`IOException`).
    UnknownId(i32),
    /// Offset or length outside the Java array.
    IndexOutOfBounds,
}

impl From<BridgeError> for NativeError {
    fn from(e: BridgeError) -> Self {
        NativeError::Io(e)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeError::Io(e) => write!(f, "IOException: {}", e),
            NativeError::UnknownId(id) => write!(f, "IOException: IPC buffer {} not found", id),
            NativeError::IndexOutOfBounds => write!(f, "ArrayIndexOutOfBoundsException"),
        }
    }
}

/// Byte range `offset..offset + len` if it lies within `total` bytes.
fn region(total: usize, offset: i32, len: i32) -> Option<Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let len = usize::try_from(len).ok()?;
    let end = start.checked_add(len)?;
    (end <= total).then_some(start..end)
}

/// Fire a real-time event named by `len` bytes of `data` at `offset`.
///
/// Names longer than the limit are cut short; empty names and bad ranges are
/// dropped.
pub fn rt_event_fire(data: &[u8], offset: i32, len: i32) {
    let range = match region(data.len(), offset, len) {
        Some(range) => range,
        None => {
            warn!("rt_event_fire: range {}+{} outside {} bytes", offset, len, data.len());
            return;
        }
    };
    match EventName::truncated(&data[range]) {
        Ok(name) => {
            EVENT_LOG.push(name);
        }
        Err(e) => warn!("rt_event_fire: {}", e),
    }
}

/// Fetch the oldest event newer than `(last_time, last_index)` into `out`.
///
/// Returns the event index, or `-1` if there is none yet (wait on
/// [`rt_event_wait`] and retry) or `out` is missing.
pub fn rt_event_get(out: Option<&mut LoggedEvent>, last_time: i64, last_index: i32) -> i32 {
    let out = match out {
        Some(out) => out,
        None => {
            warn!("rt_event_get: no output event");
            return -1;
        }
    };
    match EVENT_LOG.get(EventCursor::from_native(last_time, last_index)) {
        Ok(event) => {
            *out = event;
            // never above MAX_EVENT_INDEX, so never negative
            event.index as i32
        }
        Err(_) => -1,
    }
}

/// Current epoch of the event signal; snapshot before [`rt_event_get`].
pub fn rt_event_epoch() -> u64 {
    SIGNALS.epoch(EVENT_SIGNAL)
}

/// Suspend until the event signal is raised after the epoch `seen`.
pub fn rt_event_wait(seen: u64) -> SignalWait<'static> {
    SIGNALS.wait(EVENT_SIGNAL, seen)
}

/// Force every caller suspended in [`rt_event_wait`] to return.
pub fn rt_event_interrupt() {
    SIGNALS.raise(EVENT_SIGNAL);
}

/// Open or create the bridge `name` with at least `required` bytes.
///
/// Returns the bridge id, or `-1` for a missing name, a negative size, a
/// smaller existing bridge, a full registry, or an allocation failure.
pub fn bridge_open(name: Option<&str>, required: i32) -> i32 {
    let name = match name {
        Some(name) => name,
        None => {
            warn!("bridge_open: null bridge name");
            return -1;
        }
    };
    let required = match usize::try_from(required) {
        Ok(required) => required,
        Err(_) => return -1,
    };
    BRIDGES
        .get_or_create(name, required)
        .map_or(-1, BridgeId::as_i32)
}

fn lookup(id: i32) -> Result<BridgeId, NativeError> {
    BridgeId::from_native(id).ok_or(NativeError::UnknownId(id))
}

/// Read the pending message of bridge `id` into `buf[offset..offset + len]`.
///
/// Returns the bytes copied, 0 if nothing is pending.
pub fn bridge_read(id: i32, buf: &mut [u8], offset: i32, len: i32) -> Result<i32, NativeError> {
    let range = region(buf.len(), offset, len).ok_or(NativeError::IndexOutOfBounds)?;
    let id = lookup(id)?;
    let read = BRIDGES.read(id, &mut buf[range])?;
    Ok(read as i32)
}

/// Write `buf[offset..offset + len]` as the message of bridge `id`.
///
/// Returns the bytes written, 0 while the previous message is unread.
pub fn bridge_write(id: i32, buf: &[u8], offset: i32, len: i32) -> Result<i32, NativeError> {
    let range = region(buf.len(), offset, len).ok_or(NativeError::IndexOutOfBounds)?;
    let id = lookup(id)?;
    let written = BRIDGES.write(id, &buf[range])?;
    Ok(written as i32)
}
