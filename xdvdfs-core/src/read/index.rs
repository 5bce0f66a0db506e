use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::blockdev::Stream;
use crate::layout::{ascii_fold_lower_str, DirentAttributes, VolumeDescriptor, GAME_PARTITION_OFFSET};
use crate::read::entry::{parse_file_entry, EntryError, FileEntry};
use crate::read::volume::{parse_volume_descriptor, VolumeReadError};

pub type EntryHandle = usize;
pub const INVALID_HANDLE: EntryHandle = usize::MAX;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("io error building directory index: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Volume(#[from] VolumeReadError),
    #[error("{0}")]
    Entry(#[from] EntryError),
    #[error("volume descriptor is not a valid XDVDFS image")]
    InvalidVolume,
}

/// One entry in the flat handle table, together with its parent handle.
pub struct IndexedEntry {
    pub entry: FileEntry,
    pub parent: EntryHandle,
}

/// Flat handle table built once at mount time by walking the on-disc
/// directory entry trees rooted at the volume's root directory table. Handles
/// are dense indices into the entry list, stable for the life of the mount.
pub struct Index {
    entries: Vec<IndexedEntry>,
    children: Vec<Vec<EntryHandle>>,
    path_map: HashMap<String, EntryHandle>,
}

impl Index {
    pub const ROOT: EntryHandle = 0;

    pub fn entry(&self, handle: EntryHandle) -> Option<&FileEntry> {
        self.entries.get(handle).map(|e| &e.entry)
    }

    pub fn parent_of(&self, handle: EntryHandle) -> Option<EntryHandle> {
        self.entries.get(handle).map(|e| e.parent)
    }

    pub fn children_of(&self, handle: EntryHandle) -> &[EntryHandle] {
        self.children
            .get(handle)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Looks up a handle by path. `path` may use `/` or `\` separators; the
    /// lookup key is folded with [`ascii_fold_lower_str`], matching how keys
    /// were built.
    pub fn lookup(&self, path: &str) -> Option<EntryHandle> {
        self.path_map.get(&normalize_key(path)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(path: &str) -> String {
    ascii_fold_lower_str(&path.replace('/', "\\"))
}

struct IndexBuilder {
    entries: Vec<IndexedEntry>,
    children: Vec<Vec<EntryHandle>>,
    path_map: HashMap<String, EntryHandle>,
    keys: Vec<String>,
    visited: HashSet<(u32, u32)>,
}

impl IndexBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            children: Vec::new(),
            path_map: HashMap::new(),
            keys: Vec::new(),
            visited: HashSet::new(),
        }
    }

    fn push_root(&mut self, sector: u32, size: u32) -> EntryHandle {
        let root = FileEntry {
            name: String::new(),
            start_sector: sector,
            size,
            attributes: DirentAttributes(0).with_directory(true),
            left_entry_offset: 0,
            right_entry_offset: 0,
            header_sector: 0,
        };

        let handle = self.entries.len();
        self.entries.push(IndexedEntry {
            entry: root,
            parent: INVALID_HANDLE,
        });
        self.children.push(Vec::new());
        self.keys.push("\\".to_string());
        self.path_map.insert("\\".to_string(), handle);
        handle
    }

    fn push(&mut self, entry: FileEntry, parent: EntryHandle) -> EntryHandle {
        let folded_name = ascii_fold_lower_str(&entry.name);
        let key = if self.keys[parent] == "\\" {
            format!("\\{folded_name}")
        } else {
            format!("{}\\{folded_name}", self.keys[parent])
        };

        let handle = self.entries.len();
        self.entries.push(IndexedEntry { entry, parent });
        self.children.push(Vec::new());
        self.children[parent].push(handle);
        self.keys.push(key.clone());

        if self.path_map.contains_key(&key) {
            log::warn!("duplicate case-insensitive directory entry {key:?}, keeping the first one seen");
        } else {
            self.path_map.insert(key, handle);
        }

        handle
    }

    /// Parses and visits the node at `(sector, intra_offset)` under `parent`,
    /// unless that location has already been visited -- guarding against a
    /// malformed disc whose sibling/child pointers form a cycle.
    fn enter(
        &mut self,
        stream: &Stream,
        sector: u32,
        intra_offset: u32,
        parent: EntryHandle,
    ) -> Result<(), FormatError> {
        if !self.visited.insert((sector, intra_offset)) {
            return Ok(());
        }

        if let Some(entry) = parse_file_entry(stream, sector, intra_offset)? {
            self.visit(stream, entry, parent)?;
        }

        Ok(())
    }

    fn visit(
        &mut self,
        stream: &Stream,
        entry: FileEntry,
        parent: EntryHandle,
    ) -> Result<(), FormatError> {
        let is_directory = entry.is_directory();
        let header_sector = entry.header_sector;
        let left = entry.left_entry_offset;
        let right = entry.right_entry_offset;
        let start_sector = entry.start_sector;

        let handle = self.push(entry, parent);

        if is_directory {
            self.enter(stream, start_sector, 0, handle)?;
        }

        if left != 0 {
            self.enter(stream, header_sector, left as u32 * 4, parent)?;
        }

        if right != 0 {
            self.enter(stream, header_sector, right as u32 * 4, parent)?;
        }

        Ok(())
    }

    fn finish(self) -> Index {
        Index {
            entries: self.entries,
            children: self.children,
            path_map: self.path_map,
        }
    }
}

/// Parses the volume descriptor (retrying at the game partition offset if
/// needed) and walks its directory trees into a flat [`Index`].
pub fn build(stream: &Stream) -> Result<(Index, VolumeDescriptor), FormatError> {
    let mut vd = parse_volume_descriptor(stream)?;

    if !vd.is_valid() {
        stream.set_partition_offset(GAME_PARTITION_OFFSET);
        vd = parse_volume_descriptor(stream)?;

        if !vd.is_valid() {
            return Err(FormatError::InvalidVolume);
        }
    }

    let mut builder = IndexBuilder::new();
    let root = builder.push_root(vd.root_table.sector, vd.root_table.size);
    builder.enter(stream, vd.root_table.sector, 0, root)?;

    Ok((builder.finish(), vd))
}
