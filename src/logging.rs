//! Logging System
//!
//! `tracing` subscriber setup for the binary. Events go to stderr unless
//! configured otherwise, so stdout stays free for the run report and for
//! tar relaying.

use crate::error::BitrotError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directive override, e.g. `BITROT_LOG=bitrot::tar=trace`
const ENV_FILTER: &str = "BITROT_LOG";
const ENV_FORMAT: &str = "BITROT_LOG_FORMAT";
const ENV_OUTPUT: &str = "BITROT_LOG_OUTPUT";
/// Comma separated `module=level` pairs added to the filter
const ENV_MODULES: &str = "BITROT_LOG_MODULES";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stderr, stdout, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is "file"
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// ANSI colors for text output on a terminal stream
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels layered over `level`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("bitrot.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Reject unknown format or output names.
    pub fn validate(&self) -> Result<(), String> {
        LogFormat::parse(&self.format).map_err(|e| e.to_string())?;
        Destination::parse(&self.output).map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(name: &str) -> Result<Self, BitrotError> {
        match name {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(BitrotError::Config(format!(
                "Invalid log format: {other} (must be 'json' or 'text')"
            ))),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Stdout,
    Stderr,
    File,
}

impl Destination {
    fn parse(name: &str) -> Result<Self, BitrotError> {
        match name {
            "stdout" => Ok(Destination::Stdout),
            "stderr" => Ok(Destination::Stderr),
            "file" => Ok(Destination::File),
            other => Err(BitrotError::Config(format!(
                "Invalid log output: {other} (must be 'stdout', 'stderr', or 'file')"
            ))),
        }
    }

    fn writer(self, file: &Path) -> Result<BoxMakeWriter, BitrotError> {
        Ok(match self {
            Destination::Stdout => BoxMakeWriter::new(std::io::stdout),
            Destination::Stderr => BoxMakeWriter::new(std::io::stderr),
            Destination::File => BoxMakeWriter::new(Mutex::new(open_log_file(file)?)),
        })
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File, BitrotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| BitrotError::Config(format!("Failed to create log directory: {e}")))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| BitrotError::Config(format!("Failed to open log file {path:?}: {e}")))
}

/// Install the global subscriber.
///
/// `BITROT_LOG`, `BITROT_LOG_FORMAT` and `BITROT_LOG_OUTPUT` win over
/// `config`, which already carries CLI flags and config-file values.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), BitrotError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = build_env_filter(config)?;
    // an unusable BITROT_LOG_FORMAT falls back to the configured format
    let format = std::env::var(ENV_FORMAT)
        .ok()
        .and_then(|name| LogFormat::parse(&name).ok())
        .map_or_else(|| LogFormat::parse(&config.format), Ok)?;
    let destination = match std::env::var(ENV_OUTPUT) {
        Ok(name) => Destination::parse(&name)?,
        Err(_) => Destination::parse(&config.output)?,
    };
    let writer = destination.writer(&config.file)?;
    let ansi = config.color && destination != Destination::File;

    let registry = Registry::default().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };

    installed.map_err(|e| BitrotError::Config(format!("Failed to install log subscriber: {e}")))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, BitrotError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    let from_env = std::env::var(ENV_MODULES).unwrap_or_default();
    let env_pairs = from_env
        .split(',')
        .filter_map(|spec| spec.split_once('='))
        .map(|(module, level)| (module.trim(), level.trim()));
    let pairs = config
        .modules
        .iter()
        .map(|(module, level)| (module.as_str(), level.as_str()))
        .chain(env_pairs);

    for (module, level) in pairs {
        let directive = format!("{module}={level}")
            .parse()
            .map_err(|e| BitrotError::Config(format!("Invalid log directive {module}={level}: {e}")))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}
