//! CLI parse: clap types for bitrot. No behavior; definitions only.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Bitrot - detect silent corruption in a file tree
#[derive(Parser, Debug)]
#[command(name = "bitrot", version)]
#[command(about = "Verify a directory tree or tar stream against an md5sum-style checksum file")]
pub struct Cli {
    /// Directory to scan and checksum file to read and update, in any order
    #[arg(value_name = "TARGET")]
    pub targets: Vec<PathBuf>,

    /// Never rewrite the checksum file
    #[arg(long)]
    pub dry_run: bool,

    /// Follow symbolic links
    #[arg(long)]
    pub follow: bool,

    /// Only verify files already in the checksum file
    #[arg(long = "nothingnew")]
    pub nothing_new: bool,

    /// Skip files modified in the last 24 hours
    #[arg(long = "nottoday")]
    pub not_today: bool,

    /// Do not cross into other filesystems
    #[arg(long)]
    pub one_file_system: bool,

    /// Show the file being checked
    #[arg(long)]
    pub progress: bool,

    /// Store new digests even when a file changed without a newer mtime
    #[arg(long = "savechanges")]
    pub save_changes: bool,

    /// Pause 10ms per 128KiB read (about 13MB/s)
    #[arg(long)]
    pub slow: bool,

    /// Pause 100ms per 128KiB read (about 1.3MB/s)
    #[arg(long)]
    pub slower: bool,

    /// Pause 1s per 128KiB read (about 130KB/s)
    #[arg(long)]
    pub slowest: bool,

    /// Map files into memory instead of buffered reads
    #[arg(long)]
    pub mmap: bool,

    /// Read a tar archive from stdin instead of scanning a directory
    #[arg(long)]
    pub tar: bool,

    /// Copy the tar input to stdout while checking it
    #[arg(long)]
    pub tar_stdout: bool,

    /// Report matches, new files and skips
    #[arg(long)]
    pub verbose: bool,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print a run summary when done
    #[arg(long, value_enum)]
    pub report: Option<ReportFormat>,
}

/// Run summary format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}
