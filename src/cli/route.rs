//! CLI route: run context built from parsed flags and layered config, and
//! the single run sequence (load, scan or decode, finish, persist, report).

use crate::checker::Checker;
use crate::cli::parse::{Cli, ReportFormat};
use crate::cli::presentation::{format_mismatches, format_report_json, format_report_text};
use crate::config::{BitrotConfig, ConfigLoader, Throttle};
use crate::error::BitrotError;
use crate::tar::TarEnd;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the run reads entries from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Directory(PathBuf),
    /// Tar archive on stdin; `relay` copies it to stdout
    TarStream { relay: bool },
}

/// Positional targets sorted by what they are on disk
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Targets {
    pub directory: Option<PathBuf>,
    pub checksum_file: Option<PathBuf>,
}

impl Targets {
    /// A directory is the scan root; a regular or not-yet-existing file is
    /// the checksum file. Two of either kind is a usage error.
    pub fn classify(paths: &[PathBuf]) -> Result<Self, BitrotError> {
        let mut targets = Targets::default();
        for path in paths {
            match std::fs::metadata(path) {
                Ok(meta) if meta.is_dir() => {
                    if let Some(first) = &targets.directory {
                        return Err(BitrotError::Usage(format!(
                            "two directories specified: {} and {}",
                            first.display(),
                            path.display()
                        )));
                    }
                    targets.directory = Some(path.clone());
                }
                Ok(meta) if !meta.is_file() => {
                    return Err(BitrotError::Usage(format!(
                        "special file specified: {}",
                        path.display()
                    )));
                }
                Ok(_) => targets.set_checksum_file(path)?,
                Err(e) if e.kind() == io::ErrorKind::NotFound => targets.set_checksum_file(path)?,
                Err(e) => return Err(BitrotError::Io(e)),
            }
        }
        Ok(targets)
    }

    fn set_checksum_file(&mut self, path: &Path) -> Result<(), BitrotError> {
        if let Some(first) = &self.checksum_file {
            return Err(BitrotError::Usage(format!(
                "two files specified: {} and {}",
                first.display(),
                path.display()
            )));
        }
        self.checksum_file = Some(path.to_path_buf());
        Ok(())
    }
}

/// Everything one invocation needs, resolved up front
#[derive(Debug, Clone)]
pub struct RunContext {
    config: BitrotConfig,
    source: Source,
    checksum_file: PathBuf,
    report: Option<ReportFormat>,
}

impl RunContext {
    /// Resolve config layers and positional targets for `cli`.
    pub fn new(cli: &Cli) -> Result<Self, BitrotError> {
        let mut config = ConfigLoader::load_with(cli.config.as_deref())?;
        apply_cli_overrides(&mut config, cli);

        let targets = Targets::classify(&cli.targets)?;
        let checksum_file = targets.checksum_file.ok_or_else(|| {
            BitrotError::Usage(
                "a filename is required, to read and store md5 checksums".to_string(),
            )
        })?;
        let source = if cli.tar {
            Source::TarStream {
                relay: cli.tar_stdout,
            }
        } else {
            Source::Directory(targets.directory.ok_or_else(|| {
                BitrotError::Usage("a directory is required, to know what to scan".to_string())
            })?)
        };

        Ok(Self {
            config,
            source,
            checksum_file,
            report: cli.report,
        })
    }

    pub fn config(&self) -> &BitrotConfig {
        &self.config
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn checksum_file(&self) -> &Path {
        &self.checksum_file
    }

    /// Stdout carries the relayed archive, so summaries go to stderr.
    pub fn stdout_is_relay(&self) -> bool {
        matches!(self.source, Source::TarStream { relay: true })
    }

    /// Run against the process's stdin and stdout.
    pub fn execute(&self) -> Result<RunOutput, BitrotError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        self.execute_with(stdin.lock(), &mut stdout)
    }

    /// Run with explicit tar input and relay output.
    pub fn execute_with<R: Read>(
        &self,
        input: R,
        relay_out: &mut dyn Write,
    ) -> Result<RunOutput, BitrotError> {
        let mut checker = Checker::new(self.config.check.clone());
        debug!(ceiling = checker.ceiling(), "Resolved modification-time ceiling");
        checker.load(&self.checksum_file)?;

        match &self.source {
            Source::Directory(root) => {
                info!(root = %root.display(), "Scanning directory");
                checker.scan_dir(root)?;
            }
            Source::TarStream { relay } => {
                info!("Reading tar stream");
                let relay_out = if *relay { Some(relay_out) } else { None };
                if checker.read_tar(input, relay_out)? == TarEnd::MissingEndMarker {
                    debug!("Accepted tar stream without end marker");
                }
            }
        }

        let report = checker.finish();
        let saved = checker.persist(&self.checksum_file)?;

        let summary = match self.report {
            None => String::new(),
            Some(ReportFormat::Text) => format_report_text(&report, saved),
            Some(ReportFormat::Json) => format_report_json(&report, saved),
        };
        Ok(RunOutput {
            summary,
            mismatches: format_mismatches(&report),
        })
    }
}

/// What a finished run has to say
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// Rendered report, empty when none was requested
    pub summary: String,
    /// Suspicious-change lines, always shown on stderr
    pub mismatches: Vec<String>,
}

/// Flags can only switch options on; config files and environment set the
/// baseline.
pub fn apply_cli_overrides(config: &mut BitrotConfig, cli: &Cli) {
    let check = &mut config.check;
    check.dry_run |= cli.dry_run;
    check.follow_symlinks |= cli.follow;
    check.nothing_new |= cli.nothing_new;
    check.not_today |= cli.not_today;
    check.one_file_system |= cli.one_file_system;
    check.progress |= cli.progress;
    check.save_changes |= cli.save_changes;
    check.mmap |= cli.mmap;
    check.verbose |= cli.verbose;

    if cli.slowest {
        check.throttle = Throttle::Slowest;
    } else if cli.slower {
        check.throttle = Throttle::Slower;
    } else if cli.slow {
        check.throttle = Throttle::Slow;
    }
}
