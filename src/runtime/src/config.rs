//! Capacities and signal numbers, with their defaults.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of slots in the event ring.
pub const EVENT_LOG_CAPACITY: usize = 15;

/// Number of bridges the registry accepts before refusing new names.
pub const MAX_BRIDGES: usize = 64;

/// Buffer size of a bridge opened without an explicit size.
pub const DEFAULT_BRIDGE_BUFFER: usize = 1024;

/// Signal raised when an event is added while the consumer is blocked.
pub const EVENT_SIGNAL: u32 = 0x5254;

/// Largest event index; the counter restarts at zero after it so indices
/// stay non-negative as native `int`s, where `-1` means "no event".
pub const MAX_EVENT_INDEX: u32 = i32::MAX as u32;

/// Event log sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventLogConfig {
    /// Ring slots. Zero is treated as one.
    pub capacity: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: EVENT_LOG_CAPACITY,
        }
    }
}

/// Bridge registry sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeConfig {
    /// Maximum number of registered bridges.
    pub max_bridges: usize,
    /// Buffer size used by [`crate::ipc::NamedBridge::open`].
    pub default_buffer_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_bridges: MAX_BRIDGES,
            default_buffer_size: DEFAULT_BRIDGE_BUFFER,
        }
    }
}
