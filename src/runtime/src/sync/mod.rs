//! Wake-up primitives for callers suspended outside the runtime.
//!
//! Native callers that receive a "would block" answer suspend themselves on a
//! numbered signal and retry once it fires. [`SignalTable`] keeps one epoch
//! counter per signal; a caller snapshots the epoch before checking its
//! condition and then waits for the epoch to move, so a signal raised between
//! the check and the wait is never lost.
//!
//! # Example
//!
//! ```ignore
//! use porthal_runtime::sync::SignalTable;
//!
//! let signals = SignalTable::new();
//! let seen = signals.epoch(7);
//! if !ready() {
//!     signals.wait(7, seen).await;
//! }
//! ```

mod signal;

pub use signal::{SignalTable, SignalWait};
