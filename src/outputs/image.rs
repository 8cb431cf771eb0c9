//! Storage for generated image bytes.
//!
//! Generated images are either written next to the other outputs as
//! `ai_image_<YYYYmmdd_HHMMSS>.<ext>` or, when inlining is requested, turned
//! into a `data:` URI that the JSON and HTML can carry directly.

use super::OutputError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Guess `(extension, mime type)` from the leading magic bytes. Defaults to JPEG.
pub fn sniff_format(bytes: &[u8]) -> (&'static str, &'static str) {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => ("png", "image/png"),
        [b'G', b'I', b'F', b'8', ..] => ("gif", "image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ("webp", "image/webp"),
        _ => ("jpg", "image/jpeg"),
    }
}

/// Turn `bytes` into an image reference: a file name inside `target_dir`, or a data URI.
#[instrument(level = "info", skip_all, fields(bytes = bytes.len(), inline = inline))]
pub async fn store_image(
    bytes: &[u8],
    target_dir: &Path,
    now: DateTime<Local>,
    inline: bool,
) -> Result<String, OutputError> {
    let (ext, mime) = sniff_format(bytes);
    if inline {
        info!(mime, "Inlining image as data URI");
        return Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)));
    }

    let file_name = format!("ai_image_{}.{}", now.format("%Y%m%d_%H%M%S"), ext);
    fs::create_dir_all(target_dir).await?;
    let path = target_dir.join(&file_name);
    fs::write(&path, bytes).await?;
    info!(path = %path.display(), "Wrote generated image");
    Ok(file_name)
}
