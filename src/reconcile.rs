//! Entry reconciliation
//!
//! The one decision procedure shared by the directory scanner and the tar
//! decoder: given an entry's location, fresh digest and modification time,
//! update the catalog record and the run report.
//!
//! A differing digest is trusted when the file's modification time is at or
//! after the checksum file's; the file was edited since the last save.
//! Otherwise content changed under an old timestamp, which is what rot looks
//! like, and the stored digest is kept unless `save_changes` is set.

use crate::catalog::EntryFlags;
use crate::checker::Checker;
use crate::report::Mismatch;
use crate::types::{display_bytes, DirId, Digest};
use tracing::{info, warn};

/// What reconciliation did with one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    New,
    SkippedNew,
    Matched,
    /// Digest differed; `saved` tells whether the catalog took the new one
    Changed { saved: bool, suspicious: bool },
}

impl Checker {
    /// Reconcile a file named `name` inside catalog directory `dir`.
    pub(crate) fn reconcile(
        &mut self,
        dir: DirId,
        name: &[u8],
        digest: Digest,
        mtime: i64,
    ) -> Outcome {
        self.report.files_seen += 1;
        let verbose = self.options.verbose;

        let Some(id) = self.catalog.find_file(dir, name) else {
            if self.options.nothing_new {
                self.report.skipped_new += 1;
                if verbose {
                    info!(path = %self.display_path(dir, name), "skipping new file");
                }
                return Outcome::SkippedNew;
            }
            self.catalog.insert_file(dir, name, digest, EntryFlags::FOUND);
            self.report.new_files += 1;
            self.report.changes += 1;
            if verbose {
                info!(path = %self.display_path(dir, name), "new file");
            }
            return Outcome::New;
        };

        let stored = self.catalog.file(id).digest();
        if stored == digest {
            self.catalog
                .add_file_flags(id, EntryFlags::FOUND | EntryFlags::MATCHED);
            self.report.matched += 1;
            if verbose {
                info!(path = %self.display_path(dir, name), "matched");
            }
            return Outcome::Matched;
        }

        self.catalog
            .add_file_flags(id, EntryFlags::FOUND | EntryFlags::MISMATCHED);
        self.report.mismatched += 1;

        if mtime >= self.sumfile_mtime {
            self.catalog.set_digest(id, digest);
            self.report.changes += 1;
            if verbose {
                info!(path = %self.display_path(dir, name), "file changed");
            }
            return Outcome::Changed {
                saved: true,
                suspicious: false,
            };
        }

        let path = self.display_path(dir, name);
        let saved = self.options.save_changes;
        if saved {
            self.catalog.set_digest(id, digest);
            self.report.changes += 1;
            warn!(path = %path, old = %stored, new = %digest, "Updating new MD5");
        } else {
            warn!(path = %path, old = %stored, new = %digest, "MD5 has changed");
        }
        self.report.mismatches.push(Mismatch { path, saved });
        Outcome::Changed {
            saved,
            suspicious: true,
        }
    }

    /// Reconcile an entry given by its full `/`-separated path, creating the
    /// directory chain flagged `FOUND`.
    pub(crate) fn reconcile_path(&mut self, path: &[u8], digest: Digest, mtime: i64) -> Outcome {
        let (dir, name) = self.catalog.resolve_parent(path, EntryFlags::FOUND);
        self.reconcile(dir, name, digest, mtime)
    }

    fn display_path(&self, dir: DirId, name: &[u8]) -> String {
        display_bytes(&self.catalog.file_path(dir, name))
    }
}
