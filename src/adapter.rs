//! Graphics adapter identities and descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::adapter::{FLAG_REMOTE, FLAG_SOFTWARE};

/// Locally-unique identifier of one graphics adapter instance.
///
/// Stable within a boot, not across reboots, driver reinstalls, or
/// enumeration-order changes. Serialized as a single integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterLuid(pub u64);

impl fmt::Display for AdapterLuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Inventory record for one graphics adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdapterDescriptor {
    pub adapter_luid: AdapterLuid,
    #[serde(default)]
    pub description: String,
    pub vendor_id: u32,
    pub device_id: u32,
    pub dedicated_video_memory: u64,
    pub flags: u32,
}

impl AdapterDescriptor {
    /// True for physical GPUs: not a software rasterizer, not a remote
    /// (terminal-services) adapter.
    pub fn is_hardware(&self) -> bool {
        self.flags & (FLAG_REMOTE | FLAG_SOFTWARE) == 0
    }

    /// Heuristic for "same adapter model": vendor, device, dedicated
    /// memory, and flags all equal. Two physically distinct but
    /// identically-modeled adapters compare equal under this.
    pub fn likely_same_model(&self, other: &AdapterDescriptor) -> bool {
        self.vendor_id == other.vendor_id
            && self.device_id == other.device_id
            && self.dedicated_video_memory == other.dedicated_video_memory
            && self.flags == other.flags
    }
}
