//! Error types for the bitrot checker.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or saving a checksum file
#[derive(Debug, Error)]
pub enum ChecksumFileError {
    #[error("{file}:{line}: input line is too long (limit {limit} bytes)")]
    LineTooLong {
        file: String,
        line: usize,
        limit: usize,
    },

    #[error("{file}:{line}: bad line \"{text}\"")]
    ShortLine {
        file: String,
        line: usize,
        text: String,
    },

    #[error("{file}:{line}: bad hash \"{text}\"")]
    BadHash {
        file: String,
        line: usize,
        text: String,
    },

    #[error("{file}:{line}: bad delimiter \"{text}\"")]
    BadDelimiter {
        file: String,
        line: usize,
        text: String,
    },

    #[error("{file}:{line}: duplicate file entry for \"{path}\"")]
    DuplicateEntry {
        file: String,
        line: usize,
        path: String,
    },

    #[error("Checksum file I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the tar stream decoder
#[derive(Debug, Error)]
pub enum TarError {
    #[error("Unsupported tar magic value/format: {0}")]
    UnsupportedMagic(String),

    #[error("Malformed numeric field '{field}' in tar header")]
    MalformedField { field: &'static str },

    #[error("Tar type L without recognized ././@LongLink name")]
    LongLinkName,

    #[error("Tar type L without size")]
    LongLinkEmpty,

    #[error("Tar type L size is too large: {0}")]
    LongLinkTooLarge(u64),

    #[error("Expected a second zero block at end of archive")]
    BadEndBlock,

    #[error("Error reading tar file, archive is short")]
    Truncated,

    #[error("Tar input I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while scanning a live directory tree
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to walk directory {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read metadata for {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Top directory {0:?} has a device id that cannot be used with --one-file-system")]
    InvalidRootDevice(PathBuf),
}

/// Top-level error for a checker run
#[derive(Debug, Error)]
pub enum BitrotError {
    #[error(transparent)]
    ChecksumFile(#[from] ChecksumFileError),

    #[error(transparent)]
    Tar(#[from] TarError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for BitrotError {
    fn from(err: config::ConfigError) -> Self {
        BitrotError::Config(err.to_string())
    }
}
