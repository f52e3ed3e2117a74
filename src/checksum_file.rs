//! Checksum-file codec
//!
//! Reads and writes the md5sum-compatible catalog format:
//!
//! ```text
//! # comment
//! d41d8cd98f00b204e9800998ecf8427e  dir/sub/empty.txt
//! ```
//!
//! Each record is 32 hex characters, two spaces and a `/`-separated path.
//! Blank and `#` lines are skipped. Output lists only records flagged
//! `FOUND`, which is how entries that vanished from the tree are pruned.

use crate::catalog::{Catalog, EntryFlags, Upsert};
use crate::error::ChecksumFileError;
use crate::types::{display_bytes, Digest, DIGEST_HEX_LEN};
use filetime::FileTime;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Longest accepted line, newline included.
pub const MAX_LINE_LEN: usize = 2048;

/// Two spaces between digest and path.
const DELIMITER: &[u8] = b"  ";

/// Shortest record line: digest, delimiter, one path byte.
const MIN_RECORD_LEN: usize = DIGEST_HEX_LEN + DELIMITER.len() + 1;

/// Result of loading a checksum file from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// File existed and was parsed
    Loaded {
        entries: usize,
        /// Modification time of the checksum file, seconds since the epoch
        mtime: i64,
    },
    /// No checksum file yet; the catalog starts empty
    NotFound,
}

/// Load `path` into `catalog`.
///
/// A missing file is not an error. Any other failure to open or read it is.
#[instrument(skip(catalog), fields(path = %path.display()))]
pub fn load(catalog: &mut Catalog, path: &Path) -> Result<LoadOutcome, ChecksumFileError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Checksum file not found, starting with an empty catalog");
            return Ok(LoadOutcome::NotFound);
        }
        Err(source) => {
            return Err(ChecksumFileError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let metadata = file.metadata().map_err(|source| ChecksumFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mtime = FileTime::from_last_modification_time(&metadata).unix_seconds();

    let source_name = path.display().to_string();
    let entries = read_from(catalog, BufReader::new(file), &source_name).map_err(|e| match e {
        ChecksumFileError::Io { source, .. } => ChecksumFileError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    info!(entries, mtime, "Loaded checksum file");
    Ok(LoadOutcome::Loaded { entries, mtime })
}

/// Parse checksum lines from `reader` into `catalog`.
///
/// `origin` names the input in error messages. Returns the number of record
/// lines accepted (duplicates with identical digests included).
pub fn read_from<R: BufRead>(
    catalog: &mut Catalog,
    mut reader: R,
    origin: &str,
) -> Result<usize, ChecksumFileError> {
    let mut line = Vec::with_capacity(256);
    let mut line_no = 0usize;
    let mut entries = 0usize;

    loop {
        line.clear();
        let read = reader
            .by_ref()
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut line)
            .map_err(|source| ChecksumFileError::Io {
                path: PathBuf::from(origin),
                source,
            })?;
        if read == 0 {
            break;
        }
        line_no += 1;

        if line.last() == Some(&b'\n') {
            line.pop();
        } else if read == MAX_LINE_LEN {
            return Err(ChecksumFileError::LineTooLong {
                file: origin.to_string(),
                line: line_no,
                limit: MAX_LINE_LEN,
            });
        }

        if line.is_empty() || line[0] == b'#' {
            continue;
        }

        let (digest, path) =
            parse_record(&line).map_err(|fault| fault.into_error(origin, line_no, &line))?;
        if !add_loaded_entry(catalog, path, digest) {
            return Err(ChecksumFileError::DuplicateEntry {
                file: origin.to_string(),
                line: line_no,
                path: display_bytes(path),
            });
        }
        entries += 1;
    }

    Ok(entries)
}

enum LineFault {
    Short,
    Hash,
    Delimiter,
}

impl LineFault {
    fn into_error(self, origin: &str, line: usize, text: &[u8]) -> ChecksumFileError {
        let file = origin.to_string();
        let text = display_bytes(text);
        match self {
            LineFault::Short => ChecksumFileError::ShortLine { file, line, text },
            LineFault::Hash => ChecksumFileError::BadHash { file, line, text },
            LineFault::Delimiter => ChecksumFileError::BadDelimiter { file, line, text },
        }
    }
}

fn parse_record(line: &[u8]) -> Result<(Digest, &[u8]), LineFault> {
    if line.len() < MIN_RECORD_LEN {
        return Err(LineFault::Short);
    }
    let digest = Digest::from_hex(&line[..DIGEST_HEX_LEN]).ok_or(LineFault::Hash)?;
    if &line[DIGEST_HEX_LEN..DIGEST_HEX_LEN + DELIMITER.len()] != DELIMITER {
        return Err(LineFault::Delimiter);
    }
    Ok((digest, &line[DIGEST_HEX_LEN + DELIMITER.len()..]))
}

/// Record one loaded line. Returns false when the path is already present
/// with a different digest.
fn add_loaded_entry(catalog: &mut Catalog, path: &[u8], digest: Digest) -> bool {
    let (dir, name) = catalog.resolve_parent(path, EntryFlags::FROM_FILE);
    match catalog.find_or_create_file(dir, name, digest, EntryFlags::FROM_FILE) {
        Upsert::Created(_) => true,
        Upsert::Existing(id) => catalog.file(id).digest() == digest,
    }
}

/// Write every `FOUND` record in canonical order. Returns the line count.
pub fn write_to<W: Write>(catalog: &Catalog, writer: &mut W) -> io::Result<usize> {
    let mut written = 0usize;
    catalog.visit_files::<io::Error, _>(|prefix, file| {
        if !file.flags().contains(EntryFlags::FOUND) {
            return Ok(());
        }
        writer.write_all(file.digest().to_hex().as_bytes())?;
        writer.write_all(DELIMITER)?;
        writer.write_all(prefix)?;
        writer.write_all(file.name())?;
        writer.write_all(b"\n")?;
        written += 1;
        Ok(())
    })?;
    Ok(written)
}

/// Replace the checksum file at `path` with the catalog's found records.
///
/// Output goes to a temporary file beside `path` which is renamed over it
/// once fully written. An existing file's permissions carry over.
#[instrument(skip(catalog), fields(path = %path.display()))]
pub fn save(catalog: &Catalog, path: &Path) -> Result<usize, ChecksumFileError> {
    let io_err = |source| ChecksumFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    if let Ok(existing) = std::fs::metadata(path) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(io_err)?;
    }
    let mut writer = BufWriter::new(temp);
    let written = write_to(catalog, &mut writer).map_err(io_err)?;
    let temp = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    info!(entries = written, "Saved checksum file");
    Ok(written)
}
