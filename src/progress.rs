//! Transient status line showing the entry being digested

use crate::types::display_bytes;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::time::Duration;

/// Longest name shown on the status line, in characters.
pub const MAX_SHOWN_CHARS: usize = 60;

/// Spinner on stderr, present only when progress display is enabled
#[derive(Default)]
pub struct ProgressLine {
    bar: Option<ProgressBar>,
}

impl fmt::Debug for ProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressLine")
            .field("enabled", &self.bar.is_some())
            .finish()
    }
}

impl ProgressLine {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template(" {spinner} {wide_msg} {binary_bytes_per_sec:>.dim} ")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    pub fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Show `name` until [`ProgressLine::clear`] is called.
    pub fn show(&self, name: &[u8]) {
        if let Some(bar) = &self.bar {
            bar.set_message(shorten(name));
        }
    }

    /// Count digested bytes toward the rate display.
    pub fn advance(&self, bytes: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(bytes);
        }
    }

    pub fn clear(&self) {
        if let Some(bar) = &self.bar {
            bar.set_message("");
        }
    }

    /// Remove the line from the terminal.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        self.finish();
    }
}

fn shorten(name: &[u8]) -> String {
    display_bytes(name).chars().take(MAX_SHOWN_CHARS).collect()
}
