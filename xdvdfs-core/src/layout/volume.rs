use bincode::Options;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use super::DiskRegion;

pub const VOLUME_HEADER_MAGIC: [u8; 0x14] = *b"MICROSOFT*XBOX*MEDIA";

/// XDVDFS volume descriptor, located at sector 32 on the disk.
#[repr(C)]
#[repr(packed)]
#[derive(Deserialize, Serialize, Debug, Copy, Clone, Eq, PartialEq)]
pub struct VolumeDescriptor {
    magic0: [u8; 0x14],
    pub root_table: DiskRegion,
    pub filetime: u64,

    #[serde(with = "BigArray")]
    unused: [u8; 0x7c8],

    magic1: [u8; 0x14],
}

impl VolumeDescriptor {
    /// A descriptor is valid iff both 20-byte magic blocks match and the
    /// root directory table locator is non-empty. Both blocks are checked
    /// against the magic independently -- unlike the tool this was ported
    /// from, which compared the second block against the first block's own
    /// copy of the magic by mistake.
    pub fn is_valid(&self) -> bool {
        self.magic0 == VOLUME_HEADER_MAGIC
            && self.magic1 == VOLUME_HEADER_MAGIC
            && self.root_table.sector != 0
            && self.root_table.size != 0
    }

    pub fn deserialize(buf: &[u8; 0x800]) -> Result<Self, bincode::Error> {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .deserialize(buf)
    }

    #[cfg(test)]
    fn new_for_test(root_table: DiskRegion) -> Self {
        Self {
            magic0: VOLUME_HEADER_MAGIC,
            root_table,
            filetime: 0,
            unused: [0; 0x7c8],
            magic1: VOLUME_HEADER_MAGIC,
        }
    }

    #[cfg(test)]
    fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .serialize(self)
    }
}
