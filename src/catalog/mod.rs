//! Digest Catalog
//!
//! In-memory hierarchy of directory and file records. Records live in two
//! arena vectors owned by the [`Catalog`] and refer to each other by index
//! handle, so the whole tree is released at once when the catalog drops.
//! Siblings are indexed by name (see [`index::NameIndex`]).

pub mod index;
pub mod path;
pub mod record;

pub use index::NameIndex;
pub use record::{DirRecord, EntryFlags, FileRecord};

use crate::types::{DirId, Digest, FileId};
use std::convert::Infallible;

/// Outcome of a lookup-or-create on a file record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created(FileId),
    Existing(FileId),
}

impl Upsert {
    pub fn id(self) -> FileId {
        match self {
            Upsert::Created(id) | Upsert::Existing(id) => id,
        }
    }
}

/// Totals over the catalog's file records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub directories: usize,
    pub files: usize,
    pub found: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub missing: usize,
}

/// Arena-backed tree of directories and files
#[derive(Debug, Clone)]
pub struct Catalog {
    dirs: Vec<DirRecord>,
    files: Vec<FileRecord>,
}

impl Catalog {
    /// Create a catalog holding only the unnamed root directory
    pub fn new() -> Self {
        Self {
            dirs: vec![DirRecord::new(b"", None, EntryFlags::empty())],
            files: Vec::new(),
        }
    }

    pub fn root(&self) -> DirId {
        DirId(0)
    }

    pub fn dir(&self, id: DirId) -> &DirRecord {
        &self.dirs[id.0]
    }

    pub fn file(&self, id: FileId) -> &FileRecord {
        &self.files[id.0]
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Look up `name` among `parent`'s children, creating it when absent.
    ///
    /// `flags` are OR-ed into the record either way.
    pub fn find_or_create_dir(&mut self, parent: DirId, name: &[u8], flags: EntryFlags) -> DirId {
        if let Some(existing) = self.dirs[parent.0].subdirs.find(name) {
            self.dirs[existing.0].flags |= flags;
            return existing;
        }

        let id = DirId(self.dirs.len());
        self.dirs.push(DirRecord::new(name, Some(parent), flags));
        self.dirs[parent.0].subdirs.insert(name, id);
        id
    }

    /// Walk the directory part of `path` from the root, creating records as
    /// needed, and return the final directory plus the file name.
    pub fn resolve_parent<'p>(&mut self, path: &'p [u8], flags: EntryFlags) -> (DirId, &'p [u8]) {
        let (dirs, file_name) = path::split_file_name(path);
        let mut dir = self.root();
        for segment in path::dir_segments(dirs) {
            dir = self.find_or_create_dir(dir, segment, flags);
        }
        (dir, file_name)
    }

    pub fn find_file(&self, dir: DirId, name: &[u8]) -> Option<FileId> {
        self.dirs[dir.0].files.find(name)
    }

    /// Insert a new file record. The name must not exist in `dir` yet.
    pub fn insert_file(
        &mut self,
        dir: DirId,
        name: &[u8],
        digest: Digest,
        flags: EntryFlags,
    ) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(FileRecord::new(name, digest, flags));
        self.dirs[dir.0].files.insert(name, id);
        id
    }

    /// Look up a file, creating it with `digest` when absent.
    ///
    /// An existing record keeps its digest; callers decide whether a differing
    /// digest is a conflict. `flags` are OR-ed in either way.
    pub fn find_or_create_file(
        &mut self,
        dir: DirId,
        name: &[u8],
        digest: Digest,
        flags: EntryFlags,
    ) -> Upsert {
        match self.find_file(dir, name) {
            Some(id) => {
                self.files[id.0].flags |= flags;
                Upsert::Existing(id)
            }
            None => Upsert::Created(self.insert_file(dir, name, digest, flags)),
        }
    }

    pub fn add_file_flags(&mut self, id: FileId, flags: EntryFlags) {
        self.files[id.0].flags |= flags;
    }

    pub fn set_digest(&mut self, id: FileId, digest: Digest) {
        self.files[id.0].digest = digest;
    }

    /// Full `a/b/` style prefix of a directory (empty for the root).
    pub fn dir_prefix(&self, dir: DirId) -> Vec<u8> {
        let mut chain = Vec::new();
        let mut cursor = Some(dir);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.dirs[id.0].parent;
        }

        let mut prefix = Vec::new();
        for id in chain.into_iter().rev() {
            path::push_dir(&mut prefix, &self.dirs[id.0].name);
        }
        prefix
    }

    /// Full path of a file in `dir`.
    pub fn file_path(&self, dir: DirId, name: &[u8]) -> Vec<u8> {
        let mut path = self.dir_prefix(dir);
        path.extend_from_slice(name);
        path
    }

    /// Visit every file record in checksum-file order.
    ///
    /// For each directory the complete output of its subdirectories (in name
    /// order) comes first, then its own files in name order. The callback
    /// receives the directory prefix and the record. Recursion depth is the
    /// tree depth, never the entry count.
    pub fn visit_files<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &FileRecord) -> Result<(), E>,
    {
        let mut prefix = Vec::new();
        self.visit_dir(self.root(), &mut prefix, &mut visit)
    }

    /// Infallible form of [`Catalog::visit_files`].
    pub fn for_each_file<F>(&self, mut visit: F)
    where
        F: FnMut(&[u8], &FileRecord),
    {
        let visited = self.visit_files::<Infallible, _>(|prefix, file| {
            visit(prefix, file);
            Ok(())
        });
        match visited {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    fn visit_dir<E, F>(&self, dir: DirId, prefix: &mut Vec<u8>, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&[u8], &FileRecord) -> Result<(), E>,
    {
        let record = &self.dirs[dir.0];
        for child in record.subdirs.ids() {
            let mark = prefix.len();
            path::push_dir(prefix, &self.dirs[child.0].name);
            self.visit_dir(child, prefix, visit)?;
            prefix.truncate(mark);
        }
        for file in record.files.ids() {
            visit(prefix, &self.files[file.0])?;
        }
        Ok(())
    }

    /// Paths of records loaded from the checksum file but not found this run.
    pub fn missing_paths(&self) -> Vec<Vec<u8>> {
        let mut missing = Vec::new();
        self.for_each_file(|prefix, file| {
            if file.is_missing() {
                let mut path = prefix.to_vec();
                path.extend_from_slice(file.name());
                missing.push(path);
            }
        });
        missing
    }

    pub fn counts(&self) -> CatalogCounts {
        let mut counts = CatalogCounts {
            directories: self.dirs.len(),
            files: self.files.len(),
            ..CatalogCounts::default()
        };
        for file in &self.files {
            if file.flags.contains(EntryFlags::FOUND) {
                counts.found += 1;
            }
            if file.flags.contains(EntryFlags::MATCHED) {
                counts.matched += 1;
            }
            if file.flags.contains(EntryFlags::MISMATCHED) {
                counts.mismatched += 1;
            }
            if file.is_missing() {
                counts.missing += 1;
            }
        }
        counts
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
