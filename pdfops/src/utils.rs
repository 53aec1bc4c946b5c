//! Small formatting and naming helpers shared by the engines and the CLI.

use std::time::{SystemTime, UNIX_EPOCH};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Format a byte count as a human-readable string.
///
/// ```
/// use pdfops::utils::format_file_size;
///
/// assert_eq!(format_file_size(512), "512 bytes");
/// assert_eq!(format_file_size(1536 * 1024), "1.50 MB");
/// ```
pub fn format_file_size(size: u64) -> String {
    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

/// Format a byte count in megabytes with one decimal, e.g. `"2.4 MB"`.
pub fn format_megabytes(size: u64) -> String {
    format!("{:.1} MB", size as f64 / MB as f64)
}

/// Milliseconds since the Unix epoch, used to name generated files.
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// File name without a trailing `.pdf` extension (case-insensitive).
pub fn file_stem(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4 && file_name.is_char_boundary(len - 4) && file_name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &file_name[..len - 4]
    } else {
        file_name
    }
}
