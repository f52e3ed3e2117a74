//! Bitrot CLI Binary
//!
//! Command-line interface for the bitrot checker.

use bitrot::cli::{Cli, RunContext};
use bitrot::config::ConfigLoader;
use bitrot::logging::{init_logging, LoggingConfig};
use clap::Parser;
use std::process;
use tracing::{debug, error};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    debug!("bitrot starting");

    let context = match RunContext::new(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error preparing run: {}", e);
            eprintln!("{}", bitrot::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute() {
        Ok(output) => {
            debug!("Run completed successfully");
            for line in &output.mismatches {
                eprintln!("{}", line);
            }
            if output.summary.is_empty() {
                return;
            }
            if context.stdout_is_relay() {
                eprintln!("{}", output.summary);
            } else {
                println!("{}", output.summary);
            }
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("{}", bitrot::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = ConfigLoader::load_with(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.verbose && matches!(config.level.as_str(), "warn" | "error" | "off") {
        config.level = "info".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}
