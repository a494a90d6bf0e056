//! porthal runtime
//!
//! Native-side services of the embedded VM port: the real-time event log
//! consumed by the VM's event thread, and the named single-slot byte bridges
//! used for cross-isolate messaging.
//!
//! # Architecture
//!
//! - `realtime`: bounded event ring, cursor-based consumption, handler dispatch
//! - `ipc`: fixed-size registry of named mailboxes and the bridge handles over them
//! - `sync`: numbered wake signals that suspended callers wait on
//! - `task`: cooperative executor driving consumer loops
//! - `native`: process-wide instances and the integer-coded native-call surface
//!
//! This is a `#![no_std]` crate that needs `alloc`.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod clock;
pub mod config;
pub mod ipc;
pub mod native;
pub mod realtime;
pub mod sync;
pub mod task;

pub use porthal_common::{
    BridgeError, BridgeId, BridgeRights, EventCursor, EventError, EventName, LoggedEvent,
};
