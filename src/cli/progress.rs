//! Progress bar utilities for CLI output
//!
//! Key features:
//! - A percentage bar that follows the analysis phases, shown once an image
//!   is in hand so it never overlaps the terminal prompts
//! - Progress bars that suspend cleanly when logging
//! - Consistent console helpers for headers and status lines

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

use crate::core::session::Phase;

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the progress bar style for the analysis
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

/// Get the style for completed progress bars
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━━")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║ {} ║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a section divider
pub fn print_divider() {
    println!();
    println!("{}", "─".repeat(60));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Analysis progress
// ============================================================================

/// Progress display for one capture session
pub struct AnalysisProgress {
    bar: ProgressBar,
}

impl AnalysisProgress {
    /// Percentage bar for a session that has its image
    pub fn new() -> Self {
        let progress = Self::with_bar(ProgressBar::new(100));
        progress.bar.enable_steady_tick(Duration::from_millis(80));
        progress
    }

    /// Progress that draws nothing (JSON output, tests)
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_length(100);
        bar.set_style(progress_bar_style());
        Self { bar }
    }

    /// Show the phase's percentage and status line
    pub fn set_phase(&self, phase: Phase) {
        self.bar.set_position(u64::from(phase.progress_percent()));
        self.bar.set_message(phase.status_text());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Log a line without tearing the bar
    pub fn log_event(&self, msg: &str) {
        self.bar.suspend(|| {
            println!("  → {}", msg);
        });
    }

    /// Finish with the completed style
    pub fn finish(&self, msg: &str) {
        self.bar.set_style(completed_style());
        self.bar.set_position(100);
        self.bar.finish_with_message(msg.to_string());
    }

    /// Remove the bar, leaving a message
    pub fn abandon(&self, msg: &str) {
        self.bar.abandon_with_message(msg.to_string());
    }
}

impl Default for AnalysisProgress {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Log output
// ============================================================================

/// Writer that tees log output to stderr and a log file
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================
