//! Run report returned at the end of a check

use serde::Serialize;

/// A suspicious digest mismatch: content changed while the file's
/// modification time stayed older than the checksum file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub path: String,
    /// Whether the new digest replaced the stored one
    pub saved: bool,
}

/// Counters and findings of one scan or tar decode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Catalog modifications that warrant rewriting the checksum file
    pub changes: u64,
    /// Content bytes digested
    pub bytes_processed: u64,
    /// Entries digested and reconciled
    pub files_seen: u64,
    pub matched: u64,
    pub mismatched: u64,
    pub new_files: u64,
    pub skipped_new: u64,
    pub skipped_recent: u64,
    pub skipped_xdev: u64,
    pub unreadable: u64,
    pub ignored_special: u64,
    /// Entries from the checksum file not seen this run
    pub missing: u64,
    pub mismatches: Vec<Mismatch>,
}

impl RunReport {
    /// True when a suspicious mismatch was left unsaved.
    pub fn has_unsaved_mismatches(&self) -> bool {
        self.mismatches.iter().any(|m| !m.saved)
    }
}
