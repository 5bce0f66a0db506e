use thiserror::Error;

use crate::blockdev::Stream;
use crate::layout::{DirectoryEntryRecord, DirentAttributes, SECTOR_SIZE_USZ};

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("io error reading directory entry: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory entry record could not be deserialized: {0}")]
    Deserialize(#[from] bincode::Error),
    #[error("directory entry name length {name_len} overruns its sector at offset {offset}")]
    NameExceedsSector { offset: u32, name_len: u8 },
}

/// A directory entry read off the disc: either a file or a subdirectory.
/// `start_sector`/`size` describe the entry's payload -- file bytes for a
/// file, the child directory table for a subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub start_sector: u32,
    pub size: u32,
    pub attributes: DirentAttributes,
    pub left_entry_offset: u16,
    pub right_entry_offset: u16,

    /// Sector the entry's own header lives in, needed to resolve
    /// `left_entry_offset`/`right_entry_offset` (which are relative to the
    /// start of that sector).
    pub header_sector: u32,
}

impl FileEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes.directory()
    }
}

/// Reads the directory entry tree node at `(sector, intra_offset)`.
///
/// Returns `Ok(None)` if the node is the empty-subtree sentinel. `intra_offset`
/// is in bytes from the start of `sector`, matching the unit the on-disc
/// left/right offsets are given in once multiplied by 4 (quad-word units).
pub fn parse_file_entry(
    stream: &Stream,
    sector: u32,
    intra_offset: u32,
) -> Result<Option<FileEntry>, EntryError> {
    let absolute = sector as u64 * crate::layout::SECTOR_SIZE_U64 + intra_offset as u64;

    let mut header = [0u8; DirectoryEntryRecord::SIZE];
    stream.read_exact(absolute, &mut header)?;

    if DirectoryEntryRecord::is_empty_sentinel(&header) {
        return Ok(None);
    }

    let record = DirectoryEntryRecord::deserialize(&header)?;

    let name_offset = intra_offset as usize + DirectoryEntryRecord::SIZE;
    if name_offset + record.filename_length as usize > SECTOR_SIZE_USZ {
        return Err(EntryError::NameExceedsSector {
            offset: intra_offset,
            name_len: record.filename_length,
        });
    }

    let mut name_buf = vec![0u8; record.filename_length as usize];
    stream.read_exact(absolute + DirectoryEntryRecord::SIZE as u64, &mut name_buf)?;
    let (name, _, _) = encoding_rs::WINDOWS_1252.decode(&name_buf);

    Ok(Some(FileEntry {
        name: name.into_owned(),
        start_sector: record.data.sector,
        size: record.data.size,
        attributes: record.attributes,
        left_entry_offset: record.left_entry_offset,
        right_entry_offset: record.right_entry_offset,
        header_sector: sector,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layout::DiskRegion;
    use std::io::Write;

    fn record_bytes(record: &DirectoryEntryRecord, name: &[u8]) -> Vec<u8> {
        use bincode::Options;
        let mut buf = vec![0u8; DirectoryEntryRecord::SIZE];
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .serialize_into(&mut buf[..], record)
            .unwrap();
        buf.extend_from_slice(name);
        buf
    }

    fn image_with(sector0: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let mut data = sector0.to_vec();
        data.resize(SECTOR_SIZE_USZ, 0);
        f.write_all(&data).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_parse_file_entry_empty_sentinel() {
        let f = image_with(&[0u8; SECTOR_SIZE_USZ]);
        let stream = Stream::open(f.path()).unwrap();
        assert_eq!(parse_file_entry(&stream, 0, 0).unwrap(), None);
    }

    #[test]
    fn test_parse_file_entry_basic_file() {
        let record = DirectoryEntryRecord {
            left_entry_offset: 0,
            right_entry_offset: 0,
            data: DiskRegion {
                sector: 40,
                size: 100,
            },
            attributes: DirentAttributes(0),
            filename_length: 5,
        };
        let bytes = record_bytes(&record, b"HI.TXT"[..5].as_ref());
        let f = image_with(&bytes);
        let stream = Stream::open(f.path()).unwrap();

        let entry = parse_file_entry(&stream, 0, 0).unwrap().unwrap();
        assert_eq!(entry.name, "HI.TX");
        assert_eq!(entry.start_sector, 40);
        assert_eq!(entry.size, 100);
        assert!(!entry.is_directory());
    }

    #[test]
    fn test_parse_file_entry_name_exceeds_sector_is_error() {
        let record = DirectoryEntryRecord {
            left_entry_offset: 0,
            right_entry_offset: 0,
            data: DiskRegion { sector: 1, size: 1 },
            attributes: DirentAttributes(0),
            filename_length: 255,
        };

        let mut bytes = vec![0u8; DirectoryEntryRecord::SIZE];
        {
            use bincode::Options;
            bincode::DefaultOptions::new()
                .with_fixint_encoding()
                .with_little_endian()
                .serialize_into(&mut bytes[..], &record)
                .unwrap();
        }
        let f = image_with(&bytes);
        let stream = Stream::open(f.path()).unwrap();

        let err = parse_file_entry(&stream, 0, 0).unwrap_err();
        assert!(matches!(err, EntryError::NameExceedsSector { .. }));
    }
}
