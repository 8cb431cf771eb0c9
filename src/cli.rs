//! Command-line interface definitions for News Forge.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every argument is optional, so running the binary bare performs one
//! pipeline run with the built-in defaults.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the News Forge application.
///
/// # Examples
///
/// ```sh
/// # One run with defaults, writing into the current directory
/// news_forge
///
/// # Custom providers and a fixed fallback seed
/// news_forge -o ./site -c providers.yaml --seed 7
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory that receives the JSON, text, HTML and image files
    #[arg(short, long, env = "NEWS_FORGE_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hugging Face API token; providers needing it are skipped when absent
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    pub hf_api_token: Option<String>,

    /// Do not render the HTML page
    #[arg(long)]
    pub no_html: bool,

    /// Fixed seed for the local fallback article
    #[arg(long, env = "NEWS_FORGE_SEED")]
    pub seed: Option<u64>,
}
