//! Content digests (MD5)
//!
//! Thin incremental wrapper over the RustCrypto `md-5` hasher plus the file
//! reader used by the directory scanner. Reads are sequential in
//! [`READ_CHUNK`] sized pieces, or walk a memory map in the same sized
//! pieces, with an optional pause after each chunk to cap the I/O rate.

use crate::types::{Digest, DIGEST_LEN};
use md5::{Digest as _, Md5};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

/// Bytes hashed between throttle pauses.
pub const READ_CHUNK: usize = 128 * 1024;

/// Incremental content hasher: init, update, finalize
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Md5,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self { inner: Md5::new() }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finalize(self) -> Digest {
        let out: [u8; DIGEST_LEN] = self.inner.finalize().into();
        Digest(out)
    }
}

/// Digest of an in-memory byte slice.
pub fn digest_bytes(bytes: &[u8]) -> Digest {
    let mut hasher = ContentHasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// How file content is read
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadSettings {
    pub mmap: bool,
    pub pause: Option<Duration>,
}

/// Result of digesting one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDigest {
    Computed { digest: Digest, bytes: u64 },
    /// Opening the file was refused (EACCES/EPERM)
    PermissionDenied,
}

/// Reusable digest reader; owns the read buffer across files
pub struct FileHasher {
    settings: ReadSettings,
    buffer: Vec<u8>,
}

impl FileHasher {
    pub fn new(settings: ReadSettings) -> Self {
        let buffer = if settings.mmap {
            Vec::new()
        } else {
            vec![0; READ_CHUNK]
        };
        Self { settings, buffer }
    }

    /// Digest the file at `path`.
    ///
    /// A permission error on open is reported as
    /// [`FileDigest::PermissionDenied`]; every other failure is an error.
    pub fn digest_file(&mut self, path: &Path) -> io::Result<FileDigest> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Ok(FileDigest::PermissionDenied)
            }
            Err(e) => return Err(e),
        };

        if self.settings.mmap {
            self.digest_mapped(&file)
        } else {
            self.digest_sequential(file)
        }
    }

    fn digest_sequential(&mut self, mut file: File) -> io::Result<FileDigest> {
        let mut hasher = ContentHasher::new();
        let mut total = 0u64;
        loop {
            let read = match file.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&self.buffer[..read]);
            total += read as u64;
            self.pause();
        }
        Ok(FileDigest::Computed {
            digest: hasher.finalize(),
            bytes: total,
        })
    }

    fn digest_mapped(&mut self, file: &File) -> io::Result<FileDigest> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(FileDigest::Computed {
                digest: crate::types::EMPTY_DIGEST,
                bytes: 0,
            });
        }

        // SAFETY: the map is read-only and dropped before returning. A file
        // truncated underneath us raises SIGBUS, same as any mmap reader.
        let map = unsafe { memmap2::Mmap::map(file)? };
        let mut hasher = ContentHasher::new();
        let mut chunks = map.chunks(READ_CHUNK).peekable();
        while let Some(chunk) = chunks.next() {
            hasher.update(chunk);
            if chunks.peek().is_some() {
                self.pause();
            }
        }
        Ok(FileDigest::Computed {
            digest: hasher.finalize(),
            bytes: map.len() as u64,
        })
    }

    fn pause(&self) {
        if let Some(pause) = self.settings.pause {
            std::thread::sleep(pause);
        }
    }
}
