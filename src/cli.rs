//! Command-line surface for the bitrot binary.
//! The run sequence itself lives in the checker; route only wires it up.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, ReportFormat};
pub use presentation::{format_mismatches, format_report_json, format_report_text};
pub use route::{apply_cli_overrides, RunContext, RunOutput, Source, Targets};
