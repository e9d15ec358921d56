//! Console and formatting helpers.

use chrono::{DateTime, Local};
use colored::*;
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Display format for `last_updated`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format a timestamp for table output.
pub fn format_timestamp(stamp: &DateTime<Local>) -> String {
    stamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Render rows under `headers` as an aligned, ` | ` separated table.
///
/// Short rows are padded with empty cells; extra cells are dropped.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let columns = headers.len();
    let norm: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| {
            (0..columns)
                .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &norm {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let join = |cells: &[&str]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let rule_len = widths.iter().sum::<usize>() + 3 * columns.saturating_sub(1);
    let mut lines = Vec::with_capacity(norm.len() + 2);
    lines.push(join(headers));
    lines.push("-".repeat(rule_len));
    for row in &norm {
        lines.push(join(row.as_slice()));
    }
    lines
}

/// Check file permissions and return warnings.
pub fn check_file_permissions(path: &Path) -> Vec<String> {
    let mut warnings = Vec::new();

    #[cfg(unix)]
    {
        if let Ok(metadata) = fs::metadata(path) {
            let mode = metadata.permissions().mode();

            // Check if group or others have any permissions
            if mode & 0o077 != 0 {
                warnings.push(format!(
                    "File has insecure permissions: {:o}. Run 'chmod 600 {}' to fix.",
                    mode & 0o777,
                    path.display()
                ));
            }
        }
    }

    warnings
}

/// Print an error message and exit.
pub fn error_exit(message: &str, code: i32) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(code);
}

/// Print a failure message without exiting.
pub fn failure(message: &str) {
    println!("{} {}", "✗".red(), message);
}
