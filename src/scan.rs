//! Directory scanner
//!
//! Walks a live tree with `walkdir`, digests every regular file below the
//! modification-time ceiling and hands the result to reconciliation. The
//! walk keeps a stack of catalog directory handles indexed by depth, so each
//! entry's catalog parent is the handle one level up.

use crate::catalog::EntryFlags;
use crate::checker::Checker;
use crate::digest::{FileDigest, FileHasher, ReadSettings};
use crate::error::ScanError;
use crate::types::{display_bytes, DirId};
use filetime::FileTime;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::path::Path;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// One directory scan bound to a checker
pub struct Scanner<'c> {
    checker: &'c mut Checker,
    hasher: FileHasher,
}

impl<'c> Scanner<'c> {
    pub fn new(checker: &'c mut Checker) -> Self {
        let hasher = FileHasher::new(ReadSettings {
            mmap: checker.options.mmap,
            pause: checker.options.throttle.pause(),
        });
        Self { checker, hasher }
    }

    /// Scan everything below `root`. The root itself maps to the catalog
    /// root; entries are cataloged relative to it.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn run(mut self, root: &Path) -> Result<(), ScanError> {
        let root_meta = std::fs::metadata(root).map_err(|source| ScanError::Metadata {
            path: root.to_path_buf(),
            source,
        })?;
        let root_dev = if self.checker.options.one_file_system {
            match device_id(&root_meta) {
                Some(dev) if dev != 0 => Some(dev),
                _ => return Err(ScanError::InvalidRootDevice(root.to_path_buf())),
            }
        } else {
            None
        };

        let catalog_root = self.checker.catalog.root();
        let mut stack: Vec<DirId> = vec![catalog_root];
        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.checker.options.follow_symlinks)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|source| ScanError::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf()),
                source,
            })?;

            stack.truncate(entry.depth());
            let parent = stack.last().copied().unwrap_or(catalog_root);
            let name = name_bytes(entry.file_name());

            let metadata = entry.metadata().map_err(|source| ScanError::Walk {
                path: entry.path().to_path_buf(),
                source,
            })?;

            if let Some(root_dev) = root_dev {
                if device_id(&metadata) != Some(root_dev) {
                    self.checker.report.skipped_xdev += 1;
                    if self.checker.options.verbose {
                        info!(
                            path = %self.display_path(parent, &name),
                            kind = entry_kind(&metadata),
                            "skipping xdev"
                        );
                    }
                    if metadata.is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
            }

            if metadata.is_file() {
                self.scan_file(parent, &name, entry.path(), &metadata)?;
            } else if metadata.is_dir() {
                let dir = self
                    .checker
                    .catalog
                    .find_or_create_dir(parent, &name, EntryFlags::FOUND);
                debug!(path = %entry.path().display(), "Entering directory");
                stack.push(dir);
            } else {
                self.checker.report.ignored_special += 1;
                if self.checker.options.verbose {
                    info!(path = %self.display_path(parent, &name), "ignoring special");
                }
            }
        }

        Ok(())
    }

    fn scan_file(
        &mut self,
        parent: DirId,
        name: &[u8],
        path: &Path,
        metadata: &Metadata,
    ) -> Result<(), ScanError> {
        let mtime = FileTime::from_last_modification_time(metadata).unix_seconds();
        if mtime >= self.checker.ceiling {
            self.checker.report.skipped_recent += 1;
            if self.checker.options.verbose {
                info!(path = %self.display_path(parent, name), "skipping recently changed");
            }
            return Ok(());
        }

        self.checker.progress.show(name);
        let result = self.hasher.digest_file(path);
        self.checker.progress.clear();
        let result = result.map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match result {
            FileDigest::PermissionDenied => {
                self.checker.report.unreadable += 1;
                if self.checker.options.verbose {
                    info!(path = %self.display_path(parent, name), "unable to read");
                }
            }
            FileDigest::Computed { digest, bytes } => {
                self.checker.report.bytes_processed += bytes;
                self.checker.progress.advance(bytes);
                self.checker.reconcile(parent, name, digest, mtime);
            }
        }
        Ok(())
    }

    fn display_path(&self, dir: DirId, name: &[u8]) -> String {
        display_bytes(&self.checker.catalog.file_path(dir, name))
    }
}

fn entry_kind(metadata: &Metadata) -> &'static str {
    if metadata.is_file() {
        "file"
    } else if metadata.is_dir() {
        "dir"
    } else {
        "special"
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(unix)]
fn device_id(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
fn device_id(_metadata: &Metadata) -> Option<u64> {
    None
}
