use thiserror::Error;

use crate::blockdev::Stream;
use crate::layout::{VolumeDescriptor, SECTOR_SIZE_U64};

#[derive(Error, Debug)]
pub enum VolumeReadError {
    #[error("io error reading volume descriptor: {0}")]
    Io(#[from] std::io::Error),
    #[error("volume descriptor could not be deserialized: {0}")]
    Deserialize(#[from] bincode::Error),
}

/// Reads and parses the volume descriptor from sector 32 of `stream`, under
/// whatever partition shift is currently set. Does not check [`VolumeDescriptor::is_valid`];
/// that is the caller's job, so a malformed-but-readable descriptor can still
/// be inspected (e.g. to decide whether to retry at the game partition
/// offset).
pub fn parse_volume_descriptor(stream: &Stream) -> Result<VolumeDescriptor, VolumeReadError> {
    let mut buf = [0u8; 0x800];
    stream.read_exact(32 * SECTOR_SIZE_U64, &mut buf)?;
    Ok(VolumeDescriptor::deserialize(&buf)?)
}
