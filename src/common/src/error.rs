//! System-wide error types for porthal.

use core::fmt;

use crate::bridge::BridgeId;

/// Real-time event log error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventError {
    /// Event name is empty or longer than [`crate::MAX_NAME_LEN`] bytes
    InvalidName,
    /// No event newer than the cursor yet; retry after the event signal fires
    WouldBlock,
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::InvalidName => write!(f, "invalid event name"),
            EventError::WouldBlock => write!(f, "no event available, would block"),
        }
    }
}

/// IPC bridge error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BridgeError {
    /// No bridge registered under this id
    UnknownBridge(BridgeId),
    /// Existing bridge is smaller than the requested capacity
    CapacityMismatch {
        /// Capacity the bridge was created with
        existing: usize,
        /// Capacity asked for by the caller
        requested: usize,
    },
    /// Every registry slot is taken
    RegistryFull,
    /// Bridge buffer could not be allocated
    OutOfMemory,
    /// Requested buffer size is not usable
    InvalidCapacity,
    /// Message does not fit the bridge buffer
    MessageTooLong {
        /// Length of the rejected message
        len: usize,
        /// Capacity of the bridge
        capacity: usize,
    },
    /// Handle lacks the right for this direction
    PermissionDenied,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::UnknownBridge(id) => write!(f, "IPC buffer {} not found", id),
            BridgeError::CapacityMismatch {
                existing,
                requested,
            } => write!(
                f,
                "bridge capacity {} smaller than requested {}",
                existing, requested
            ),
            BridgeError::RegistryFull => write!(f, "bridge registry full"),
            BridgeError::OutOfMemory => write!(f, "out of memory allocating bridge buffer"),
            BridgeError::InvalidCapacity => write!(f, "invalid bridge capacity"),
            BridgeError::MessageTooLong { len, capacity } => write!(
                f,
                "message of {} bytes too long to fit IPC buffer of {}",
                len, capacity
            ),
            BridgeError::PermissionDenied => write!(f, "permission denied"),
        }
    }
}
