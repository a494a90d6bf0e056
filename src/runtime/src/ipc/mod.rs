//! Named single-slot IPC bridges.
//!
//! A bridge is a fixed-capacity byte buffer registered under a unique name.
//! It holds at most one unread message: a write into a full bridge and a read
//! from an empty one both transfer zero bytes, which callers treat as "retry
//! later" rather than as an error.
//!
//! The registry only grows. Registration is serialized by the registry lock;
//! transfers lock the single bridge they touch, so traffic on different
//! bridges never contends.

mod bridge;

pub use bridge::{Bridge, LocalBridge, NamedBridge};

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use log::{debug, trace, warn};
use porthal_common::{BridgeError, BridgeId};
use spin::Mutex;

use crate::config::BridgeConfig;

/// Buffer plus the length of the pending message, zero when empty.
struct Mailbox {
    buffer: Box<[u8]>,
    available: usize,
}

struct BridgeSlot {
    name: String,
    capacity: usize,
    mailbox: Mutex<Mailbox>,
}

/// Fixed-size registry of named bridges.
pub struct BridgeRegistry {
    config: BridgeConfig,
    slots: Mutex<Vec<Arc<BridgeSlot>>>,
}

impl BridgeRegistry {
    /// Create a registry with the default limits.
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Create a registry sized by `config`.
    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Buffer size used when a bridge is opened without one.
    pub fn default_buffer_size(&self) -> usize {
        self.config.default_buffer_size
    }

    /// Look up `name`, registering it with a zeroed buffer of `required` bytes
    /// if it does not exist yet.
    ///
    /// An existing bridge smaller than `required` cannot serve the caller and
    /// yields [`BridgeError::CapacityMismatch`]; a larger one is returned as is.
    pub fn get_or_create(&self, name: &str, required: usize) -> Result<BridgeId, BridgeError> {
        let result = self.register(name, required);
        match result {
            Ok((id, true)) => debug!("registered bridge {:?} as {} ({} bytes)", name, id, required),
            Ok((_, false)) => {}
            Err(BridgeError::CapacityMismatch { existing, .. }) => warn!(
                "bridge {:?} has capacity {}, {} requested",
                name, existing, required
            ),
            Err(e) => warn!("cannot register bridge {:?}: {}", name, e),
        }
        result.map(|(id, _)| id)
    }

    /// Lookup or insertion under the registry lock. The flag tells whether
    /// the bridge was created by this call.
    fn register(&self, name: &str, required: usize) -> Result<(BridgeId, bool), BridgeError> {
        let mut slots = self.slots.lock();

        if let Some(index) = slots.iter().position(|slot| slot.name == name) {
            let existing = slots[index].capacity;
            if existing < required {
                return Err(BridgeError::CapacityMismatch {
                    existing,
                    requested: required,
                });
            }
            return Ok((BridgeId(index as u32), false));
        }

        if slots.len() >= self.config.max_bridges {
            return Err(BridgeError::RegistryFull);
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(required)
            .map_err(|_| BridgeError::OutOfMemory)?;
        buffer.resize(required, 0u8);

        let id = BridgeId(slots.len() as u32);
        slots.push(Arc::new(BridgeSlot {
            name: String::from(name),
            capacity: required,
            mailbox: Mutex::new(Mailbox {
                buffer: buffer.into_boxed_slice(),
                available: 0,
            }),
        }));
        Ok((id, true))
    }

    /// Id of the bridge registered as `name`, if any.
    pub fn find(&self, name: &str) -> Option<BridgeId> {
        self.slots
            .lock()
            .iter()
            .position(|slot| slot.name == name)
            .map(|index| BridgeId(index as u32))
    }

    /// Number of registered bridges.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no bridge is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of bridge `id`.
    pub fn capacity_of(&self, id: BridgeId) -> Result<usize, BridgeError> {
        Ok(self.slot(id)?.capacity)
    }

    /// Length of the unread message in bridge `id`, zero if none.
    pub fn available(&self, id: BridgeId) -> Result<usize, BridgeError> {
        Ok(self.slot(id)?.mailbox.lock().available)
    }

    /// Take the pending message of bridge `id` into `out`.
    ///
    /// Copies at most `out.len()` bytes; whatever does not fit is discarded
    /// with the message. Returns 0 when nothing is pending.
    pub fn read(&self, id: BridgeId, out: &mut [u8]) -> Result<usize, BridgeError> {
        let slot = self.slot(id)?;
        let mut mailbox = slot.mailbox.lock();
        if mailbox.available == 0 {
            return Ok(0);
        }

        let len = out.len().min(mailbox.available);
        out[..len].copy_from_slice(&mailbox.buffer[..len]);
        mailbox.available = 0;
        trace!("bridge {} read {} bytes", id, len);
        Ok(len)
    }

    /// Place `data` as the pending message of bridge `id`.
    ///
    /// Returns 0 while a previous message is unread. A message longer than the
    /// bridge capacity is refused and leaves the bridge untouched.
    pub fn write(&self, id: BridgeId, data: &[u8]) -> Result<usize, BridgeError> {
        let slot = self.slot(id)?;
        let mut mailbox = slot.mailbox.lock();
        if mailbox.available != 0 {
            return Ok(0);
        }
        if data.len() > slot.capacity {
            drop(mailbox);
            warn!(
                "message of {} bytes too long for bridge {} ({} bytes)",
                data.len(),
                id,
                slot.capacity
            );
            return Err(BridgeError::MessageTooLong {
                len: data.len(),
                capacity: slot.capacity,
            });
        }

        mailbox.buffer[..data.len()].copy_from_slice(data);
        mailbox.available = data.len();
        trace!("bridge {} wrote {} bytes", id, data.len());
        Ok(data.len())
    }

    fn slot(&self, id: BridgeId) -> Result<Arc<BridgeSlot>, BridgeError> {
        let slot = self.slots.lock().get(id.index()).cloned();
        slot.ok_or_else(|| {
            warn!("IPC buffer {} not found", id);
            BridgeError::UnknownBridge(id)
        })
    }
}

impl Default for BridgeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot_semantics() {
        let registry = BridgeRegistry::new();
        let id = registry.get_or_create("pipe", 16).unwrap();

        assert_eq!(registry.write(id, b"ABC"), Ok(3));
        assert_eq!(registry.write(id, b"DEF"), Ok(0));

        let mut out = [0u8; 16];
        assert_eq!(registry.read(id, &mut out), Ok(3));
        assert_eq!(&out[..3], b"ABC");
        assert_eq!(registry.available(id), Ok(0));
        assert_eq!(registry.read(id, &mut out), Ok(0));
    }

    #[test]
    fn test_capacity_rejection() {
        let registry = BridgeRegistry::new();
        let first = registry.get_or_create("X", 10).unwrap();

        assert_eq!(
            registry.get_or_create("X", 20),
            Err(BridgeError::CapacityMismatch {
                existing: 10,
                requested: 20
            })
        );
        assert_eq!(registry.get_or_create("X", 10), Ok(first));
        assert_eq!(registry.get_or_create("X", 4), Ok(first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_oversized_write_rejected() {
        let registry = BridgeRegistry::new();
        let id = registry.get_or_create("small", 4).unwrap();

        assert_eq!(
            registry.write(id, b"too long"),
            Err(BridgeError::MessageTooLong {
                len: 8,
                capacity: 4
            })
        );
        assert_eq!(registry.available(id), Ok(0));
        assert_eq!(registry.write(id, b"fits"), Ok(4));
    }

    #[test]
    fn test_busy_checked_before_length() {
        let registry = BridgeRegistry::new();
        let id = registry.get_or_create("busy", 4).unwrap();

        registry.write(id, b"ab").unwrap();
        assert_eq!(registry.write(id, b"way too long"), Ok(0));
    }

    #[test]
    fn test_short_read_discards_rest() {
        let registry = BridgeRegistry::new();
        let id = registry.get_or_create("short", 8).unwrap();

        registry.write(id, b"abcdef").unwrap();
        let mut out = [0u8; 2];
        assert_eq!(registry.read(id, &mut out), Ok(2));
        assert_eq!(&out, b"ab");
        assert_eq!(registry.available(id), Ok(0));
    }

    #[test]
    fn test_unknown_id() {
        let registry = BridgeRegistry::new();
        let mut out = [0u8; 4];

        assert_eq!(
            registry.read(BridgeId(0), &mut out),
            Err(BridgeError::UnknownBridge(BridgeId(0)))
        );
        assert_eq!(
            registry.write(BridgeId(3), b"x"),
            Err(BridgeError::UnknownBridge(BridgeId(3)))
        );
    }

    #[test]
    fn test_registry_full() {
        let registry = BridgeRegistry::with_config(BridgeConfig {
            max_bridges: 2,
            ..BridgeConfig::default()
        });

        assert_eq!(registry.get_or_create("a", 1), Ok(BridgeId(0)));
        assert_eq!(registry.get_or_create("b", 1), Ok(BridgeId(1)));
        assert_eq!(registry.get_or_create("c", 1), Err(BridgeError::RegistryFull));
        assert_eq!(registry.get_or_create("a", 1), Ok(BridgeId(0)));
        assert_eq!(registry.find("c"), None);
    }
}
