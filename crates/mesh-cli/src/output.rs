//! Console output helpers shared by all commands.
//!
//! Human-readable lines go to stdout in text mode. In JSON mode only the
//! final result document is printed, so output stays machine-parseable.

use colored::Colorize;
use serde::Serialize;

use crate::OutputFormat;

/// Print a result document in JSON mode.
pub fn print<T: Serialize>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet || !matches!(format, OutputFormat::Json) {
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("{}: failed to serialize output: {}", "Error".red().bold(), e),
    }
}

/// Status line in text mode.
pub fn info(message: &str, format: OutputFormat, quiet: bool) {
    if !quiet && matches!(format, OutputFormat::Text) {
        println!("{} {}", "→".blue(), message);
    }
}

/// Success line in text mode.
pub fn success(message: &str, format: OutputFormat, quiet: bool) {
    if !quiet && matches!(format, OutputFormat::Text) {
        println!("{} {}", "✓".green().bold(), message);
    }
}

/// Warning line; shown in both modes on stderr.
pub fn warn(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }
}
