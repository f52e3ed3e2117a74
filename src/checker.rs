//! Checker run driver
//!
//! A [`Checker`] owns everything one run touches: the catalog, the resolved
//! options, the checksum file's modification time and the running report.
//! The usual sequence is load, then either a directory scan or a tar decode,
//! then finish and persist.

use crate::catalog::Catalog;
use crate::checksum_file::{self, LoadOutcome};
use crate::config::CheckOptions;
use crate::digest::READ_CHUNK;
use crate::error::{ChecksumFileError, ScanError, TarError};
use crate::progress::ProgressLine;
use crate::report::RunReport;
use crate::scan::Scanner;
use crate::tar::{TarDecoder, TarEnd};
use crate::types::display_bytes;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info, instrument};

/// State of one verification run
#[derive(Debug)]
pub struct Checker {
    pub(crate) catalog: Catalog,
    pub(crate) options: CheckOptions,
    /// Entries modified past this are left out of the run
    pub(crate) ceiling: i64,
    /// Modification time of the loaded checksum file; 0 when there was none
    pub(crate) sumfile_mtime: i64,
    pub(crate) report: RunReport,
    pub(crate) progress: ProgressLine,
}

impl Checker {
    pub fn new(options: CheckOptions) -> Self {
        let ceiling = options.ceiling();
        let progress = ProgressLine::new(options.progress);
        Self {
            catalog: Catalog::new(),
            options,
            ceiling,
            sumfile_mtime: 0,
            report: RunReport::default(),
            progress,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    pub fn ceiling(&self) -> i64 {
        self.ceiling
    }

    pub fn sumfile_mtime(&self) -> i64 {
        self.sumfile_mtime
    }

    /// Report accumulated so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Load the checksum file at `path` into the catalog.
    pub fn load(&mut self, path: &Path) -> Result<LoadOutcome, ChecksumFileError> {
        let outcome = checksum_file::load(&mut self.catalog, path)?;
        match outcome {
            LoadOutcome::Loaded { mtime, .. } => self.sumfile_mtime = mtime,
            LoadOutcome::NotFound => {
                self.sumfile_mtime = 0;
                if self.options.verbose {
                    info!(path = %path.display(), "checksum file not found");
                }
            }
        }
        Ok(outcome)
    }

    /// Walk the live tree under `root` and reconcile every regular file.
    pub fn scan_dir(&mut self, root: &Path) -> Result<(), ScanError> {
        Scanner::new(self).run(root)
    }

    /// Fresh decoder for a tar stream.
    pub fn tar_decoder(&self) -> TarDecoder {
        TarDecoder::new()
    }

    /// Feed one chunk of a tar stream. Chunks may be of any size.
    pub fn feed_tar(&mut self, decoder: &mut TarDecoder, bytes: &[u8]) -> Result<(), TarError> {
        decoder.feed(self, bytes)
    }

    /// Signal end of input to `decoder`.
    pub fn finish_tar(&mut self, decoder: TarDecoder) -> Result<TarEnd, TarError> {
        self.progress.clear();
        decoder.finish()
    }

    /// Decode a whole tar stream from `reader`.
    ///
    /// Every chunk read is copied unchanged to `relay` before it is decoded.
    #[instrument(skip_all)]
    pub fn read_tar<R: Read>(
        &mut self,
        mut reader: R,
        mut relay: Option<&mut dyn Write>,
    ) -> Result<TarEnd, TarError> {
        let mut decoder = self.tar_decoder();
        let mut buffer = vec![0u8; READ_CHUNK];
        let pause = self.options.throttle.pause();

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TarError::Io(e)),
            };
            if let Some(out) = relay.as_mut() {
                out.write_all(&buffer[..read])?;
            }
            self.feed_tar(&mut decoder, &buffer[..read])?;
            if let Some(pause) = pause {
                std::thread::sleep(pause);
            }
        }

        if let Some(out) = relay.as_mut() {
            out.flush()?;
        }
        self.finish_tar(decoder)
    }

    /// Close the run: count entries loaded but never seen and return the
    /// final report.
    pub fn finish(&mut self) -> RunReport {
        self.progress.finish();

        let missing = self.catalog.missing_paths();
        self.report.missing = missing.len() as u64;
        if self.options.verbose {
            for path in &missing {
                info!(path = %display_bytes(path), "missing");
            }
        }

        debug!(
            changes = self.report.changes,
            bytes = self.report.bytes_processed,
            "Run finished"
        );
        self.report.clone()
    }

    /// Rewrite the checksum file when the run changed anything.
    ///
    /// Returns whether the file was written. Dry runs never write.
    pub fn persist(&self, path: &Path) -> Result<bool, ChecksumFileError> {
        if self.options.dry_run {
            debug!(changes = self.report.changes, "Dry run, checksum file left alone");
            return Ok(false);
        }
        if self.report.changes == 0 {
            debug!("No changes, checksum file left alone");
            return Ok(false);
        }
        checksum_file::save(&self.catalog, path)?;
        Ok(true)
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }
}
