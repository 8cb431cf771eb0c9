//! Output generation for the site builder.
//!
//! This module contains submodules responsible for writing a finished
//! [`crate::record::ContentRecord`] to disk:
//!
//! # Submodules
//!
//! - [`json`]: Writes the record as pretty JSON plus the bare article text
//! - [`html`]: Renders a self-contained styled HTML page
//! - [`image`]: Stores generated image bytes next to the other outputs
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── tilda_data.json              # full record
//! ├── article.txt                  # body only
//! ├── current-news.html            # rendered page
//! └── ai_image_20250506_143000.jpg # only when an image was generated
//! ```
//!
//! Every file is overwritten unconditionally on each run.

pub mod html;
pub mod image;
pub mod json;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File names written into the output directory.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    pub json_file: String,
    pub text_file: String,
    pub html_file: String,
    /// Embed generated images as `data:` URIs instead of writing image files.
    pub inline_images: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            json_file: "tilda_data.json".to_string(),
            text_file: "article.txt".to_string(),
            html_file: "current-news.html".to_string(),
            inline_images: false,
        }
    }
}

/// Where [`json::persist`] put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPaths {
    pub json_path: PathBuf,
    pub text_path: PathBuf,
}
