//! Bitrot: Silent Corruption Detection for File Trees
//!
//! Keeps an md5sum-compatible catalog of per-file digests and checks it
//! against a live directory tree or a tar stream. Files whose content changed
//! while their modification time did not are reported as suspected rot.

pub mod catalog;
pub mod checker;
pub mod checksum_file;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod scan;
pub mod tar;
pub mod types;

pub use catalog::{Catalog, EntryFlags};
pub use checker::Checker;
pub use checksum_file::LoadOutcome;
pub use config::{BitrotConfig, CheckOptions, ConfigLoader, Throttle};
pub use error::{BitrotError, ChecksumFileError, ScanError, TarError};
pub use report::{Mismatch, RunReport};
pub use tar::{TarDecoder, TarEnd};
pub use types::{Digest, EMPTY_DIGEST};
