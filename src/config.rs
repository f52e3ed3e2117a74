//! Configuration System
//!
//! Layered configuration for a checker run. Sources, lowest precedence
//! first: built-in defaults, the global config file, an explicit `--config`
//! file, `BITROT_*` environment variables. CLI flags are applied on top by
//! the binary.

use crate::error::BitrotError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Seconds in the "recent" window skipped by `not_today`.
pub const RECENT_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BitrotConfig {
    /// Options controlling scanning, decoding and reconciliation
    #[serde(default)]
    pub check: CheckOptions,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Read-rate limiting between content chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Throttle {
    #[default]
    None,
    /// About 13 MB/s
    Slow,
    /// About 1.3 MB/s
    Slower,
    /// About 130 KB/s
    Slowest,
}

impl Throttle {
    /// Pause after each content chunk, if any.
    pub fn pause(self) -> Option<Duration> {
        match self {
            Throttle::None => None,
            Throttle::Slow => Some(Duration::from_millis(10)),
            Throttle::Slower => Some(Duration::from_millis(100)),
            Throttle::Slowest => Some(Duration::from_millis(1000)),
        }
    }
}

/// Options for one checker run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Follow symbolic links while scanning
    pub follow_symlinks: bool,
    /// Stay on the device of the scan root
    pub one_file_system: bool,
    /// Report matches, new files and skips, not only mismatches
    pub verbose: bool,
    /// Never rewrite the checksum file
    pub dry_run: bool,
    /// Store new digests even for suspicious mismatches
    pub save_changes: bool,
    /// Only verify entries already in the checksum file
    pub nothing_new: bool,
    /// Skip files modified within the last 24 hours
    pub not_today: bool,
    pub throttle: Throttle,
    /// Show the file being digested on a transient status line
    pub progress: bool,
    /// Map files into memory instead of buffered reads
    pub mmap: bool,
    /// Explicit ceiling (seconds since epoch); overrides `not_today`
    pub ceiling_mtime: Option<i64>,
}

impl CheckOptions {
    /// Effective modification-time ceiling given the current time.
    ///
    /// Scanned files modified at or after it, and tar entries modified after
    /// it, are left out of the run.
    pub fn ceiling_at(&self, now: i64) -> i64 {
        match self.ceiling_mtime {
            Some(ceiling) => ceiling,
            None if self.not_today => now - RECENT_WINDOW_SECS,
            None => i64::MAX,
        }
    }

    /// Effective ceiling using the wall clock.
    pub fn ceiling(&self) -> i64 {
        self.ceiling_at(chrono::Utc::now().timestamp())
    }
}

impl BitrotConfig {
    /// Check combinations the loader cannot express in types.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ceiling) = self.check.ceiling_mtime {
            if ceiling < 0 {
                return Err(format!("ceiling_mtime must not be negative: {ceiling}"));
            }
        }
        self.logging.validate()
    }
}

/// Loads [`BitrotConfig`] from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, environment overrides.
    pub fn load() -> Result<BitrotConfig, BitrotError> {
        Self::load_with(None)
    }

    /// Like [`ConfigLoader::load`] with an explicit file layered above the
    /// global one. The explicit file must exist.
    pub fn load_with(explicit: Option<&Path>) -> Result<BitrotConfig, BitrotError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        if let Some(path) = explicit {
            builder = sources::explicit_file::add_to_builder(builder, path)?;
        }
        builder = sources::environment::add_to_builder(builder);

        let config: BitrotConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(BitrotError::Config)?;
        Ok(config)
    }

    /// Load only `path` on top of defaults (no global file, no environment).
    pub fn load_from_file(path: &Path) -> Result<BitrotConfig, BitrotError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::explicit_file::add_to_builder(builder, path)?;
        let config: BitrotConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(BitrotError::Config)?;
        Ok(config)
    }
}
