//! Output context and mode detection.
//!
//! # Mode Selection Logic
//!
//! 1. `--json` flag → JSON mode (machine-readable)
//! 2. `--quiet` flag → Quiet mode (errors only)
//! 3. Otherwise → Text mode
//!
//! Progress bars are only drawn in text mode on a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::IsTerminal;
use tracing::warn;

const PROGRESS_TEMPLATE: &str = "{bar:30} {pos}/{len} cards ({msg}) [{elapsed_precise}]";
const FALLBACK_WIDTH: usize = 80;

/// Output mode determining formatting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Plain text for humans.
    #[default]
    Text,

    /// JSON output for machine consumption.
    Json,

    /// Quiet mode with minimal output.
    Quiet,
}

impl OutputMode {
    /// Returns true if this mode produces structured data (JSON).
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Json)
    }

    /// Returns true if this mode should minimize output.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Returns true if this mode is for human reading.
    #[must_use]
    pub const fn is_human_readable(&self) -> bool {
        matches!(self, Self::Text)
    }
}

/// Output context providing mode detection and terminal info.
#[derive(Debug, Clone)]
pub struct OutputContext {
    mode: OutputMode,
    width: usize,
    is_tty: bool,
}

impl Default for OutputContext {
    fn default() -> Self {
        Self::from_flags(false, false)
    }
}

impl OutputContext {
    /// Create a new output context with specified mode and dimensions.
    #[must_use]
    pub const fn new(mode: OutputMode, width: usize, is_tty: bool) -> Self {
        Self {
            mode,
            width,
            is_tty,
        }
    }

    /// Create context from CLI flags. `json` wins over `quiet`.
    #[must_use]
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Text
        };

        Self {
            mode,
            width: terminal_width(),
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.mode.is_structured()
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Print a line of human-readable output (text mode only).
    pub fn say(&self, line: impl AsRef<str>) {
        if self.mode.is_human_readable() {
            println!("{}", line.as_ref());
        }
    }

    /// Print a warning for humans; still shown in quiet mode, on stderr.
    pub fn warn(&self, line: impl AsRef<str>) {
        if !self.mode.is_structured() {
            eprintln!("{}", line.as_ref());
        }
    }

    /// Print a value as pretty JSON (JSON mode only).
    pub fn json_pretty<T: Serialize>(&self, value: &T) {
        if !self.is_json() {
            return;
        }
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(err) => warn!(error = %err, "Cannot serialize output"),
        }
    }

    /// Progress bar for `len` cards; hidden unless drawing makes sense.
    #[must_use]
    pub fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.mode.is_human_readable() || !self.is_tty {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        match ProgressStyle::with_template(PROGRESS_TEMPLATE) {
            Ok(style) => bar.set_style(style),
            Err(err) => warn!(error = %err, "Invalid progress template"),
        }
        bar
    }
}

/// Determine terminal width from `COLUMNS` or the terminal itself.
#[must_use]
pub fn terminal_width() -> usize {
    if let Ok(columns) = std::env::var("COLUMNS") {
        if let Ok(value) = columns.trim().parse::<usize>() {
            if value > 0 {
                return value;
            }
        }
    }

    if let Ok((cols, _)) = crossterm::terminal::size() {
        if cols > 0 {
            return cols as usize;
        }
    }

    FALLBACK_WIDTH
}
