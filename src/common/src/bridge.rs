//! Identifiers and access rights for named IPC bridges.

use core::fmt;

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Registry index of a bridge. Ids are assigned in registration order from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeId(pub u32);

impl BridgeId {
    /// Interpret a native id. Negative ids are never valid.
    pub fn from_native(id: i32) -> Option<Self> {
        u32::try_from(id).ok().map(BridgeId)
    }

    /// The id as handed back across the native boundary.
    pub fn as_i32(self) -> i32 {
        self.0 as i32
    }

    /// The id as a registry slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Directions a bridge handle may transfer in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
    pub struct BridgeRights: u32 {
        const READ  = 1 << 0; // source side
        const WRITE = 1 << 1; // sink side
    }
}
