use bincode::Options;
use serde::{Deserialize, Serialize};

use super::{DirentAttributes, DiskRegion};

/// On-disk representation of a directory entry tree node header: the
/// intra-sector left/right sibling offsets and the entry's own payload
/// locator, attributes, and name length. Does not include the file name
/// bytes that follow it in the sector.
#[repr(C)]
#[repr(packed)]
#[derive(Deserialize, Serialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DirectoryEntryRecord {
    pub left_entry_offset: u16,
    pub right_entry_offset: u16,
    pub data: DiskRegion,
    pub attributes: DirentAttributes,
    pub filename_length: u8,
}

impl DirectoryEntryRecord {
    pub const SIZE: usize = 0xe;

    /// A record whose header bytes are all the same fill byte (0x00 or
    /// 0xff) is the subtree-absent sentinel, not a real entry.
    pub fn is_empty_sentinel(buf: &[u8; Self::SIZE]) -> bool {
        buf == &[0x00; Self::SIZE] || buf == &[0xff; Self::SIZE]
    }

    pub fn deserialize(buf: &[u8; Self::SIZE]) -> Result<Self, bincode::Error> {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .deserialize(buf)
    }

    #[cfg(test)]
    fn serialize(&self) -> Result<[u8; Self::SIZE], bincode::Error> {
        let mut buffer = [0u8; Self::SIZE];
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .serialize_into(&mut buffer[..], self)?;
        Ok(buffer)
    }
}
