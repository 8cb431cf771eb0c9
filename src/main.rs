//! # News Forge
//!
//! Produces one short AI-news article with an illustration for a site
//! builder, using whichever inference provider happens to be up.
//!
//! ## Features
//!
//! - Tries remote text-generation models in order, polling models that are
//!   still loading (HTTP 503) within a bounded budget
//! - Falls back to locally synthesized articles, so a run always has a body
//! - Tries image-generation models and static image URLs, with an optional default
//! - Writes a JSON record, the plain article text and a styled HTML page
//!
//! ## Usage
//!
//! ```sh
//! HF_API_TOKEN=hf_xxx news_forge -o ./site
//! ```
//!
//! ## Architecture
//!
//! 1. **Providers**: one HTTP client per configured endpoint ([`provider`])
//! 2. **Fallback**: ordered resolution with local synthesis last ([`chain`], [`synth`])
//! 3. **Record**: normalized, immutable output unit ([`record`])
//! 4. **Output**: JSON, text, image and HTML files ([`outputs`])

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod chain;
mod cli;
mod config;
mod models;
mod outputs;
mod pipeline;
mod provider;
mod record;
mod synth;
mod utils;

use cli::Cli;
use config::PipelineConfig;
use pipeline::RunOptions;
use synth::SeedPolicy;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "news_forge starting up");

    let args = Cli::parse();
    debug!(output_dir = %args.output_dir.display(), config = ?args.config, "Parsed CLI arguments");
    info!(
        token_configured = args.hf_api_token.as_deref().is_some_and(|t| !t.trim().is_empty()),
        "API token check"
    );

    let mut config = match PipelineConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    if let Some(seed) = args.seed {
        config.synth.seed = SeedPolicy::Fixed(seed);
    }

    let options = RunOptions {
        output_dir: args.output_dir,
        token: args.hf_api_token,
        html: !args.no_html,
    };
    let summary = match pipeline::run(&config, &options).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Pipeline run failed");
            return Err(e);
        }
    };

    println!("{}", summary);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
