//! Reader for XDVDFS (Xbox DVD filesystem) disc images.
//!
//! This crate covers the parts of XDVDFS needed to mount an image read-only:
//! on-disc layout parsing ([`layout`]), a synchronous positioned-read
//! abstraction over the backing image ([`blockdev`]), and the directory
//! indexer that flattens the on-disc tree into a handle table ([`read`]).

pub mod blockdev;
pub mod layout;
pub mod read;
