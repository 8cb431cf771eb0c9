//! JSON and plain-text output for the site builder.
//!
//! The record is written as pretty-printed UTF-8 JSON with non-ASCII text kept
//! literal, and the body alone goes to a separate text file so downstream
//! tooling can consume either.

use super::{OutputError, OutputSettings, PersistedPaths};
use crate::record::ContentRecord;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `record` into `target_dir`, replacing any previous run's files.
///
/// # Output Path
///
/// `{target_dir}/{settings.json_file}` and `{target_dir}/{settings.text_file}`.
#[instrument(level = "info", skip_all, fields(target_dir = %target_dir.display()))]
pub async fn persist(
    record: &ContentRecord,
    target_dir: &Path,
    settings: &OutputSettings,
) -> Result<PersistedPaths, OutputError> {
    let json = serde_json::to_string_pretty(record)?;

    if let Err(e) = fs::create_dir_all(target_dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let json_path = target_dir.join(&settings.json_file);
    fs::write(&json_path, json).await?;
    info!(path = %json_path.display(), "Wrote JSON record");

    let text_path = target_dir.join(&settings.text_file);
    fs::write(&text_path, record.body()).await?;
    info!(path = %text_path.display(), bytes = record.body().len(), "Wrote article text");

    Ok(PersistedPaths {
        json_path,
        text_path,
    })
}
