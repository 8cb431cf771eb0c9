//! Utility functions for text cleanup, log previews, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Stripping boilerplate section headings from generated text
//! - String truncation for logging
//! - File system validation for the output directory

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Explicit essay headings that text models like to emit on their own.
///
/// Only a capitalised heading at the start of a line, followed by a colon or
/// the end of the line, counts. The same words inside prose are left alone.
static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:Введение|Основная часть|Заключение)[ \t]*(?::[ \t]*|$)")
        .expect("valid heading regex")
});

static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid blank-line regex"));

/// Remove section headings such as `Введение:` and tidy the whitespace left behind.
///
/// Returns the trimmed input unchanged when cleanup would leave nothing.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_generated_text("Введение: Текст"), "Текст");
/// ```
pub fn clean_generated_text(text: &str) -> String {
    let stripped = SECTION_HEADING.replace_all(text, "");
    let collapsed = EXCESS_BLANK_LINES.replace_all(&stripped, "\n\n");
    let cleaned = collapsed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        debug!("Heading cleanup emptied the text; keeping original");
        text.trim().to_string()
    } else {
        cleaned
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended. Truncation respects UTF-8 boundaries.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
