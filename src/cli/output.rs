//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::BitrotError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &BitrotError) -> String {
    match e {
        BitrotError::Usage(message) => format!("{message}\nTry 'bitrot --help' for more information."),
        other => other.to_string(),
    }
}
