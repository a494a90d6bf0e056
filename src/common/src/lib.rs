//! Types shared between the porthal runtime and its native-call surface.

#![no_std]

pub mod bridge;
pub mod error;
pub mod event;

pub use bridge::{BridgeId, BridgeRights};
pub use error::{BridgeError, EventError};
pub use event::{EventCursor, EventName, LoggedEvent, MAX_NAME_LEN};
