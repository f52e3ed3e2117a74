//! Directory and file records held by the catalog arena

use crate::catalog::index::NameIndex;
use crate::types::{DirId, Digest, FileId};
use bitflags::bitflags;

bitflags! {
    /// Per-record status, accumulated over a run
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntryFlags: u8 {
        /// Confirmed present by this run's scan or tar stream
        const FOUND = 0b0001;
        /// Loaded from the persisted checksum file
        const FROM_FILE = 0b0010;
        /// Digest equals the recorded one
        const MATCHED = 0b0100;
        /// Digest differs from the recorded one
        const MISMATCHED = 0b1000;
    }
}

/// A directory in the catalog tree
#[derive(Debug, Clone)]
pub struct DirRecord {
    pub(crate) name: Box<[u8]>,
    /// Back-reference only; the parent owns this record through its index.
    pub(crate) parent: Option<DirId>,
    pub(crate) subdirs: NameIndex<DirId>,
    pub(crate) files: NameIndex<FileId>,
    pub(crate) flags: EntryFlags,
}

impl DirRecord {
    pub(crate) fn new(name: &[u8], parent: Option<DirId>, flags: EntryFlags) -> Self {
        Self {
            name: name.into(),
            parent,
            subdirs: NameIndex::new(),
            files: NameIndex::new(),
            flags,
        }
    }

    /// Segment name; empty only for the root.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    pub fn subdirs(&self) -> &NameIndex<DirId> {
        &self.subdirs
    }

    pub fn files(&self) -> &NameIndex<FileId> {
        &self.files
    }
}

/// A file in the catalog tree
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub(crate) name: Box<[u8]>,
    pub(crate) digest: Digest,
    pub(crate) flags: EntryFlags,
}

impl FileRecord {
    pub(crate) fn new(name: &[u8], digest: Digest, flags: EntryFlags) -> Self {
        Self {
            name: name.into(),
            digest,
            flags,
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// Loaded from the checksum file but not seen during this run.
    pub fn is_missing(&self) -> bool {
        self.flags.contains(EntryFlags::FROM_FILE) && !self.flags.contains(EntryFlags::FOUND)
    }
}
