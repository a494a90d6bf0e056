//! Bridge handles: named bridges over the registry and unnamed in-process ones.

use alloc::boxed::Box;
use alloc::vec;
use log::debug;
use porthal_common::{BridgeError, BridgeId, BridgeRights};
use spin::Mutex;

use super::BridgeRegistry;
use crate::config::DEFAULT_BRIDGE_BUFFER;

/// A one-message-at-a-time byte channel.
pub trait Bridge {
    /// Largest message a single write transfers.
    fn buffer_size(&self) -> usize;

    /// Send up to [`Bridge::buffer_size`] bytes of `data`.
    ///
    /// Returns the number of bytes sent, 0 if an earlier message is unread.
    fn write(&self, data: &[u8]) -> Result<usize, BridgeError>;

    /// Receive pending bytes into `out`. Returns 0 if nothing is pending.
    fn read(&self, out: &mut [u8]) -> Result<usize, BridgeError>;
}

/// Handle to a bridge in a [`BridgeRegistry`], shared by name between isolates.
#[derive(Clone, Copy)]
pub struct NamedBridge<'a> {
    registry: &'a BridgeRegistry,
    id: BridgeId,
    buffer_size: usize,
    rights: BridgeRights,
}

impl<'a> NamedBridge<'a> {
    /// Open `name` with the registry's default buffer size.
    pub fn open(registry: &'a BridgeRegistry, name: &str) -> Result<Self, BridgeError> {
        Self::open_with_size(registry, name, registry.default_buffer_size())
    }

    /// Open `name`, requiring a buffer of at least `size` bytes.
    pub fn open_with_size(
        registry: &'a BridgeRegistry,
        name: &str,
        size: usize,
    ) -> Result<Self, BridgeError> {
        if size == 0 {
            return Err(BridgeError::InvalidCapacity);
        }
        let id = registry.get_or_create(name, size)?;
        Ok(Self {
            registry,
            id,
            buffer_size: size,
            rights: BridgeRights::READ | BridgeRights::WRITE,
        })
    }

    /// Registry id of the bridge.
    pub fn id(&self) -> BridgeId {
        self.id
    }

    /// Directions this handle may transfer in.
    pub fn rights(&self) -> BridgeRights {
        self.rights
    }

    /// Write-only handle to the same bridge.
    pub fn sink(&self) -> Self {
        self.restrict(BridgeRights::WRITE)
    }

    /// Read-only handle to the same bridge.
    pub fn source(&self) -> Self {
        self.restrict(BridgeRights::READ)
    }

    fn restrict(&self, rights: BridgeRights) -> Self {
        Self {
            rights: self.rights & rights,
            ..*self
        }
    }

    fn check(&self, needed: BridgeRights) -> Result<(), BridgeError> {
        if self.rights.contains(needed) {
            Ok(())
        } else {
            Err(BridgeError::PermissionDenied)
        }
    }
}

impl Bridge for NamedBridge<'_> {
    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn write(&self, data: &[u8]) -> Result<usize, BridgeError> {
        self.check(BridgeRights::WRITE)?;
        let len = data.len().min(self.buffer_size);
        self.registry.write(self.id, &data[..len])
    }

    fn read(&self, out: &mut [u8]) -> Result<usize, BridgeError> {
        self.check(BridgeRights::READ)?;
        let len = out.len().min(self.buffer_size);
        self.registry.read(self.id, &mut out[..len])
    }
}

struct LocalState {
    buffer: Box<[u8]>,
    /// Length of the pending message.
    filled: usize,
    /// Bytes of the pending message already read.
    read_mark: usize,
}

/// Unnamed bridge between tasks of one isolate.
///
/// Unlike named bridges, a short read leaves the rest of the message pending;
/// the bridge accepts a new write only once the message is fully drained.
pub struct LocalBridge {
    state: Mutex<LocalState>,
}

impl LocalBridge {
    /// Create a bridge with a [`DEFAULT_BRIDGE_BUFFER`]-byte buffer.
    pub fn new() -> Self {
        Self::alloc(DEFAULT_BRIDGE_BUFFER)
    }

    /// Create a bridge with a `size`-byte buffer.
    pub fn with_size(size: usize) -> Result<Self, BridgeError> {
        if size == 0 {
            return Err(BridgeError::InvalidCapacity);
        }
        Ok(Self::alloc(size))
    }

    fn alloc(size: usize) -> Self {
        debug!("local bridge with {} byte buffer", size);
        Self {
            state: Mutex::new(LocalState {
                buffer: vec![0u8; size].into_boxed_slice(),
                filled: 0,
                read_mark: 0,
            }),
        }
    }

    /// Bytes of the pending message not read yet.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.filled - state.read_mark
    }
}

impl Default for LocalBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge for LocalBridge {
    fn buffer_size(&self) -> usize {
        self.state.lock().buffer.len()
    }

    fn write(&self, data: &[u8]) -> Result<usize, BridgeError> {
        let mut state = self.state.lock();
        if state.filled > 0 {
            return Ok(0);
        }
        let len = data.len().min(state.buffer.len());
        state.buffer[..len].copy_from_slice(&data[..len]);
        state.filled = len;
        Ok(len)
    }

    fn read(&self, out: &mut [u8]) -> Result<usize, BridgeError> {
        let mut state = self.state.lock();
        let start = state.read_mark;
        let len = out.len().min(state.filled - start);
        if len == 0 {
            return Ok(0);
        }

        out[..len].copy_from_slice(&state.buffer[start..start + len]);
        state.read_mark += len;
        if state.read_mark >= state.filled {
            state.read_mark = 0;
            state.filled = 0;
        }
        Ok(len)
    }
}
