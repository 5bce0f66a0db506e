use std::path::Path;

use thiserror::Error;
use xdvdfs::blockdev::Stream;
use xdvdfs::layout::SECTOR_SIZE_U64;
use xdvdfs::read::{build, EntryHandle, FileEntry, FormatError, Index};

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("could not open image file: {0}")]
    FileOpen(#[from] std::io::Error),
    #[error("{0}")]
    Format(#[from] FormatError),
}

/// Aggregates the backing [`Stream`], the parsed volume metadata, and the
/// directory [`Index`] into the single object the filesystem adapter talks
/// to. Built once at mount time and shared (read-only) across every Dokan
/// callback thread.
pub struct Container {
    stream: Stream,
    index: Index,
    volume_modified: u64,
    volume_size: u64,
    volume_label: String,
}

impl Container {
    pub fn open(image_path: &Path) -> Result<Self, ContainerError> {
        let stream = Stream::open(image_path)?;
        let (index, vd) = build(&stream)?;
        let volume_size = stream.file_len()?;
        let volume_label = volume_label_from_path(image_path);

        log::info!(
            "indexed {} entries from {} ({} bytes)",
            index.len(),
            image_path.display(),
            volume_size
        );

        Ok(Self {
            stream,
            index,
            volume_modified: vd.filetime,
            volume_size,
            volume_label,
        })
    }

    pub fn get_entry_by_path(&self, path: &str) -> Option<(EntryHandle, &FileEntry)> {
        let handle = self.index.lookup(path)?;
        self.index.entry(handle).map(|entry| (handle, entry))
    }

    pub fn get_entry_by_handle(&self, handle: EntryHandle) -> Option<&FileEntry> {
        self.index.entry(handle)
    }

    pub fn is_root(&self, handle: EntryHandle) -> bool {
        handle == Index::ROOT
    }

    pub fn list_directory(&self, path: &str) -> Option<Vec<EntryHandle>> {
        let handle = self.index.lookup(path)?;
        Some(self.index.children_of(handle).to_vec())
    }

    /// Reads up to `buf.len()` bytes of `entry`'s payload starting at
    /// `offset`. Negative offsets, offsets at or past the entry's recorded
    /// size, and empty buffers all read zero bytes; the read is otherwise
    /// clamped to the entry's size, never the buffer.
    pub fn read_file(
        &self,
        entry: &FileEntry,
        offset: i64,
        buf: &mut [u8],
    ) -> std::io::Result<usize> {
        if offset < 0 || buf.is_empty() {
            return Ok(0);
        }

        let offset = offset as u64;
        let size = entry.size as u64;
        if offset >= size {
            return Ok(0);
        }

        let want = std::cmp::min(buf.len() as u64, size - offset) as usize;
        let absolute = entry.start_sector as u64 * SECTOR_SIZE_U64 + offset;
        self.stream.pread(absolute, &mut buf[..want])
    }

    pub fn volume_modified(&self) -> u64 {
        self.volume_modified
    }

    pub fn volume_size(&self) -> u64 {
        self.volume_size
    }

    pub fn volume_label(&self) -> &str {
        &self.volume_label
    }
}

fn volume_label_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "XISO".to_string())
}
