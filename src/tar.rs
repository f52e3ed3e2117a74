//! Incremental tar stream decoder
//!
//! Consumes a POSIX ustar or GNU tar byte stream in chunks of any size,
//! down to single bytes, and reconciles every regular file entry against the
//! catalog without buffering more than one header block and one long name.
//!
//! States that consume input are `Header`, `Slurp`, `Checksum`, `Skipping`
//! and `EndBlocks`. `Consider`, `EndSlurp` and `EndFile` are zero-width and
//! are settled as soon as they are entered, so the decoder never sits in one
//! between calls to [`TarDecoder::feed`].

use crate::checker::Checker;
use crate::digest::ContentHasher;
use crate::error::TarError;
use crate::types::{Digest, EMPTY_DIGEST};
use tracing::{trace, warn};

/// Tar block size; headers and padded content are multiples of it.
pub const BLOCK_SIZE: usize = 512;

/// Longest accepted GNU long-name payload.
pub const MAX_LONG_NAME: u64 = 4096;

const LONG_LINK_NAME: &[u8] = b"././@LongLink";
const POSIX_MAGIC: &[u8; 8] = b"ustar\x0000";
const GNU_MAGIC: &[u8; 8] = b"ustar  \x00";

const NAME: std::ops::Range<usize> = 0..100;
const SIZE: std::ops::Range<usize> = 124..136;
const MTIME: std::ops::Range<usize> = 136..148;
const TYPEFLAG: usize = 156;
const MAGIC: std::ops::Range<usize> = 257..265;
const PREFIX: std::ops::Range<usize> = 345..500;

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarEnd {
    /// Both end-of-archive zero blocks were seen
    Finished,
    /// Input stopped cleanly between entries without the end marker
    MissingEndMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Posix,
    Gnu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Consider,
    Slurp { data_left: u64, input_left: u64 },
    EndSlurp,
    Checksum { data_left: u64, input_left: u64 },
    EndFile(Digest),
    Skipping { input_left: u64 },
    EndBlocks,
    Finished,
}

/// Fields of the most recent header block
#[derive(Debug, Clone, Default)]
struct Entry {
    path: Vec<u8>,
    size: u64,
    mtime: i64,
}

/// Re-entrant tar decoder; see the module docs for the state layout
#[derive(Clone)]
pub struct TarDecoder {
    state: State,
    block: Box<[u8; BLOCK_SIZE]>,
    filled: usize,
    entry: Entry,
    /// Long name read from a GNU `L` entry, applied to the next header
    long_name: Option<Vec<u8>>,
    slurp: Vec<u8>,
    hasher: ContentHasher,
}

impl std::fmt::Debug for TarDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarDecoder")
            .field("state", &self.state)
            .field("filled", &self.filled)
            .field("entry", &self.entry)
            .finish()
    }
}

impl Default for TarDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TarDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Header,
            block: Box::new([0; BLOCK_SIZE]),
            filled: 0,
            entry: Entry::default(),
            long_name: None,
            slurp: Vec::new(),
            hasher: ContentHasher::new(),
        }
    }

    /// Both end-of-archive blocks have been consumed.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Consume one chunk. Entries completed by it are reconciled through
    /// `checker` before this returns.
    pub fn feed(&mut self, checker: &mut Checker, mut bytes: &[u8]) -> Result<(), TarError> {
        loop {
            self.settle(checker)?;
            if bytes.is_empty() || self.state == State::Finished {
                return Ok(());
            }
            let consumed = self.consume(checker, bytes)?;
            bytes = &bytes[consumed..];
        }
    }

    /// Classify the end of input.
    pub fn finish(self) -> Result<TarEnd, TarError> {
        match self.state {
            State::Finished => Ok(TarEnd::Finished),
            State::Header if self.filled == 0 => {
                warn!("Tar stream ended without an end-of-archive marker");
                Ok(TarEnd::MissingEndMarker)
            }
            _ => Err(TarError::Truncated),
        }
    }

    /// Run zero-width states until one that needs input.
    fn settle(&mut self, checker: &mut Checker) -> Result<(), TarError> {
        loop {
            match self.state {
                State::Consider => self.consider(checker)?,
                State::EndSlurp => self.end_slurp(),
                State::EndFile(digest) => self.end_file(checker, digest),
                _ => return Ok(()),
            }
        }
    }

    /// Advance a consuming state; returns the number of bytes taken.
    fn consume(&mut self, checker: &mut Checker, bytes: &[u8]) -> Result<usize, TarError> {
        match self.state {
            State::Header => self.fill_header(bytes),
            State::EndBlocks => self.fill_end_block(bytes),
            State::Slurp {
                data_left,
                input_left,
            } => {
                let (taken, data) = take_aligned(bytes, data_left, input_left);
                self.slurp.extend_from_slice(&bytes[..data]);
                self.state = if input_left == taken as u64 {
                    State::EndSlurp
                } else {
                    State::Slurp {
                        data_left: data_left - data as u64,
                        input_left: input_left - taken as u64,
                    }
                };
                Ok(taken)
            }
            State::Checksum {
                data_left,
                input_left,
            } => {
                let (taken, data) = take_aligned(bytes, data_left, input_left);
                self.hasher.update(&bytes[..data]);
                checker.progress.advance(data as u64);
                self.state = if input_left == taken as u64 {
                    State::EndFile(std::mem::take(&mut self.hasher).finalize())
                } else {
                    State::Checksum {
                        data_left: data_left - data as u64,
                        input_left: input_left - taken as u64,
                    }
                };
                Ok(taken)
            }
            State::Skipping { input_left } => {
                let taken = clamp(bytes.len(), input_left);
                self.state = if input_left == taken as u64 {
                    State::Header
                } else {
                    State::Skipping {
                        input_left: input_left - taken as u64,
                    }
                };
                Ok(taken)
            }
            // settled before consume is called
            State::Consider | State::EndSlurp | State::EndFile(_) | State::Finished => Ok(0),
        }
    }

    fn fill_header(&mut self, bytes: &[u8]) -> Result<usize, TarError> {
        let taken = self.fill_block(bytes);
        if self.filled < BLOCK_SIZE {
            return Ok(taken);
        }
        self.filled = 0;

        if is_zero_block(&self.block) {
            trace!("First end-of-archive block");
            self.state = State::EndBlocks;
        } else {
            self.entry = parse_header(&self.block)?;
            self.state = State::Consider;
        }
        Ok(taken)
    }

    fn fill_end_block(&mut self, bytes: &[u8]) -> Result<usize, TarError> {
        let taken = self.fill_block(bytes);
        if self.filled == BLOCK_SIZE {
            self.filled = 0;
            if !is_zero_block(&self.block) {
                return Err(TarError::BadEndBlock);
            }
            trace!("End of archive");
            self.state = State::Finished;
        }
        Ok(taken)
    }

    fn fill_block(&mut self, bytes: &[u8]) -> usize {
        let taken = bytes.len().min(BLOCK_SIZE - self.filled);
        self.block[self.filled..self.filled + taken].copy_from_slice(&bytes[..taken]);
        self.filled += taken;
        taken
    }

    fn consider(&mut self, checker: &mut Checker) -> Result<(), TarError> {
        let typeflag = self.block[TYPEFLAG];
        let size = self.entry.size;

        if is_regular(typeflag) && self.entry.mtime <= checker.ceiling {
            if let Some(long_name) = self.long_name.take() {
                self.entry.path = long_name;
            }
            if self.entry.path.last() == Some(&b'/') {
                trace!(path = %String::from_utf8_lossy(&self.entry.path), "Old-style directory entry");
                self.state = skip_state(size);
                return Ok(());
            }
            if size == 0 {
                self.state = State::EndFile(EMPTY_DIGEST);
            } else {
                self.hasher = ContentHasher::new();
                checker.progress.show(&self.entry.path);
                self.state = State::Checksum {
                    data_left: size,
                    input_left: padded(size),
                };
            }
        } else if typeflag == b'L' {
            if nul_terminated(&self.block[NAME]) != LONG_LINK_NAME {
                return Err(TarError::LongLinkName);
            }
            if size == 0 {
                return Err(TarError::LongLinkEmpty);
            }
            if size > MAX_LONG_NAME {
                return Err(TarError::LongLinkTooLarge(size));
            }
            self.slurp.clear();
            self.state = State::Slurp {
                data_left: size,
                input_left: padded(size),
            };
        } else {
            if self.entry.mtime > checker.ceiling && is_regular(typeflag) {
                checker.report.skipped_recent += 1;
            }
            self.long_name = None;
            self.state = skip_state(size);
        }
        Ok(())
    }

    fn end_slurp(&mut self) {
        let mut name = std::mem::take(&mut self.slurp);
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        name.truncate(end);
        trace!(name = %String::from_utf8_lossy(&name), "Long name");
        self.long_name = Some(name);
        self.state = State::Header;
    }

    fn end_file(&mut self, checker: &mut Checker, digest: Digest) {
        checker.progress.clear();
        checker.report.bytes_processed += self.entry.size;
        let path = std::mem::take(&mut self.entry.path);
        checker.reconcile_path(&path, digest, self.entry.mtime);
        self.state = State::Header;
    }
}

fn skip_state(size: u64) -> State {
    if size == 0 {
        State::Header
    } else {
        State::Skipping {
            input_left: padded(size),
        }
    }
}

/// Split the next `input_left` aligned bytes of a sized payload: returns
/// (bytes consumed, of which payload).
fn take_aligned(bytes: &[u8], data_left: u64, input_left: u64) -> (usize, usize) {
    let taken = clamp(bytes.len(), input_left);
    let data = clamp(taken, data_left);
    (taken, data)
}

fn clamp(len: usize, limit: u64) -> usize {
    usize::try_from(limit).map_or(len, |limit| len.min(limit))
}

/// Content size rounded up to whole blocks.
pub fn padded(size: u64) -> u64 {
    if size == 0 {
        0
    } else {
        ((size - 1) | (BLOCK_SIZE as u64 - 1)) + 1
    }
}

fn is_regular(typeflag: u8) -> bool {
    matches!(typeflag, b'0' | 0 | b'7')
}

fn is_zero_block(block: &[u8; BLOCK_SIZE]) -> bool {
    block.iter().all(|&b| b == 0)
}

fn nul_terminated(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

fn parse_header(block: &[u8; BLOCK_SIZE]) -> Result<Entry, TarError> {
    let magic = &block[MAGIC];
    let format = if magic == POSIX_MAGIC {
        Format::Posix
    } else if magic == GNU_MAGIC {
        Format::Gnu
    } else {
        return Err(TarError::UnsupportedMagic(hex::encode(magic)));
    };

    let size = parse_numeric(&block[SIZE], "size")?;
    let mtime = parse_numeric(&block[MTIME], "mtime")?;
    let mtime = i64::try_from(mtime).map_err(|_| TarError::MalformedField { field: "mtime" })?;

    let name = nul_terminated(&block[NAME]);
    let prefix: &[u8] = match format {
        Format::Posix => nul_terminated(&block[PREFIX]),
        Format::Gnu => &[],
    };
    let mut path = Vec::with_capacity(prefix.len() + 1 + name.len());
    if !prefix.is_empty() {
        path.extend_from_slice(prefix);
        path.push(b'/');
    }
    path.extend_from_slice(name);

    Ok(Entry { path, size, mtime })
}

/// Decode a numeric header field: ASCII octal after optional leading
/// spaces or NULs, ended by a space, NUL or the field end. A set high bit
/// in the first byte marks a big-endian base-256 value.
pub fn parse_numeric(field: &[u8], name: &'static str) -> Result<u64, TarError> {
    let malformed = || TarError::MalformedField { field: name };

    if let Some(&first) = field.first() {
        if first & 0x80 != 0 {
            if first & 0x40 != 0 {
                return Err(malformed());
            }
            let mut value = u64::from(first & 0x7f);
            for &byte in &field[1..] {
                value = value
                    .checked_mul(256)
                    .and_then(|v| v.checked_add(u64::from(byte)))
                    .ok_or_else(malformed)?;
            }
            return Ok(value);
        }
    }

    let mut value = 0u64;
    for &byte in field.iter().skip_while(|&&b| b == b' ' || b == 0) {
        match byte {
            b'0'..=b'7' => {
                value = value
                    .checked_mul(8)
                    .and_then(|v| v.checked_add(u64::from(byte - b'0')))
                    .ok_or_else(malformed)?;
            }
            b' ' | 0 => break,
            _ => return Err(malformed()),
        }
    }
    Ok(value)
}
