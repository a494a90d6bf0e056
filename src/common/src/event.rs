//! Real-time event values exchanged between producers and the polling consumer.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Longest event name in bytes, excluding the terminator the native side adds.
pub const MAX_NAME_LEN: usize = 15;

/// A short, non-empty event name stored inline.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventName {
    bytes: [u8; MAX_NAME_LEN],
    len: u8,
}

impl EventName {
    /// Build a name from a string, rejecting empty or overlong input.
    pub fn new(name: &str) -> Result<Self, EventError> {
        Self::from_bytes(name.as_bytes())
    }

    /// Build a name from raw bytes. Input ends at the first NUL, if any.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, EventError> {
        let raw = until_nul(raw);
        if raw.is_empty() || raw.len() > MAX_NAME_LEN {
            return Err(EventError::InvalidName);
        }
        Ok(Self::copy_of(raw))
    }

    /// Build a name keeping at most [`MAX_NAME_LEN`] bytes of the input.
    ///
    /// Only an empty result is rejected.
    pub fn truncated(raw: &[u8]) -> Result<Self, EventError> {
        let raw = until_nul(raw);
        let raw = &raw[..raw.len().min(MAX_NAME_LEN)];
        if raw.is_empty() {
            return Err(EventError::InvalidName);
        }
        Ok(Self::copy_of(raw))
    }

    fn copy_of(raw: &[u8]) -> Self {
        let mut bytes = [0u8; MAX_NAME_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Self {
            bytes,
            len: raw.len() as u8,
        }
    }

    /// The name bytes, without terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// The name as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the name is empty. Never true for a constructed name.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn until_nul(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|&b| b == 0) {
        Some(end) => &raw[..end],
        None => raw,
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => {
                for b in self.as_bytes() {
                    write!(f, "\\x{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventName(\"{}\")", self)
    }
}

/// An event as stored in the ring: stamped with its firing time and sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoggedEvent {
    /// Milliseconds since the Unix epoch when the event was added.
    pub time: i64,
    /// Sequence index, strictly increasing across additions.
    pub index: u32,
    /// Name of the event.
    pub name: EventName,
}

/// Position of a consumer in the event stream.
///
/// An event is newer than the cursor when it was stamped no earlier than
/// `time` and carries an index greater than `index`. A cursor with no index
/// admits every index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventCursor {
    /// Earliest event time still of interest.
    pub time: i64,
    /// Index of the last event seen, if any.
    pub index: Option<u32>,
}

impl EventCursor {
    /// Cursor admitting every stored event.
    pub const START: EventCursor = EventCursor {
        time: 0,
        index: None,
    };

    /// Create a cursor from a time and last seen index.
    pub fn new(time: i64, index: Option<u32>) -> Self {
        Self { time, index }
    }

    /// Create a cursor from the native encoding, where a negative index means "none seen".
    pub fn from_native(time: i64, index: i32) -> Self {
        Self {
            time,
            index: u32::try_from(index).ok(),
        }
    }

    /// Whether `event` is newer than this cursor.
    pub fn admits(&self, event: &LoggedEvent) -> bool {
        event.time >= self.time && self.index.map_or(true, |last| event.index > last)
    }

    /// Move past `event`.
    pub fn advance(&mut self, event: &LoggedEvent) {
        self.time = event.time;
        self.index = Some(event.index);
    }
}

impl Default for EventCursor {
    fn default() -> Self {
        Self::START
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_bounds() {
        assert_eq!(EventName::new(""), Err(EventError::InvalidName));
        assert!(EventName::new("fifteen_chars__").is_ok());
        assert_eq!(
            EventName::new("sixteen_chars___"),
            Err(EventError::InvalidName)
        );
    }

    #[test]
    fn test_name_stops_at_nul() {
        let name = EventName::from_bytes(b"gpio\0garbage").unwrap();
        assert_eq!(name.as_str(), Some("gpio"));
        assert_eq!(EventName::from_bytes(b"\0abc"), Err(EventError::InvalidName));
    }

    #[test]
    fn test_truncated_keeps_prefix() {
        let name = EventName::truncated(b"a_very_long_event_name").unwrap();
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert_eq!(name.as_bytes(), b"a_very_long_eve");
        assert_eq!(EventName::truncated(b""), Err(EventError::InvalidName));
    }

    #[test]
    fn test_cursor_admits() {
        let name = EventName::new("tick").unwrap();
        let event = LoggedEvent {
            time: 100,
            index: 4,
            name,
        };

        assert!(EventCursor::START.admits(&event));
        assert!(EventCursor::new(100, Some(3)).admits(&event));
        assert!(!EventCursor::new(100, Some(4)).admits(&event));
        assert!(!EventCursor::new(101, None).admits(&event));

        let mut cursor = EventCursor::START;
        cursor.advance(&event);
        assert_eq!(cursor, EventCursor::new(100, Some(4)));
    }

    #[test]
    fn test_cursor_from_native() {
        assert_eq!(EventCursor::from_native(0, -1), EventCursor::START);
        assert_eq!(EventCursor::from_native(5, 2).index, Some(2));
    }
}
