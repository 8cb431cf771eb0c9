//! One end-to-end run: providers → record → files.
//!
//! 1. **Check**: make sure the output directory is writable
//! 2. **Text**: resolve the article body through the text chain
//! 3. **Image**: resolve an illustration through the image chain
//! 4. **Record**: assemble the immutable [`ContentRecord`]
//! 5. **Output**: JSON + text, and optionally the HTML page
//!
//! Provider failures are absorbed along the way. The run only fails on
//! configuration or filesystem errors.

use crate::chain::FallbackChain;
use crate::config::{ConfigError, PipelineConfig, ProviderSpec};
use crate::models::ResolvedImage;
use crate::outputs::{PersistedPaths, html, image, json};
use crate::provider::ProviderClient;
use crate::record::{ContentRecord, RecordBuilder};
use crate::synth::LocalSynthesizer;
use crate::utils::{clean_generated_text, ensure_writable_dir, truncate_for_log};
use chrono::{DateTime, Local};
use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

const PREVIEW_CHARS: usize = 200;

/// Per-run inputs that do not belong in the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub token: Option<String>,
    pub html: bool,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub record: ContentRecord,
    pub paths: PersistedPaths,
    pub html_path: Option<PathBuf>,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = &self.record;
        writeln!(f, "Title:          {}", record.title())?;
        writeln!(f, "Date:           {}", record.created_at())?;
        writeln!(f, "Article length: {} chars", record.body().chars().count())?;
        writeln!(f, "Source:         {}", record.source_provider())?;
        writeln!(f, "AI generated:   {}", record.generated_with_ai())?;
        let image = match record.image_reference() {
            Some(reference) if reference.starts_with("data:") => truncate_for_log(reference, 48),
            Some(reference) => reference.to_string(),
            None => "none".to_string(),
        };
        writeln!(f, "Image:          {}", image)?;
        writeln!(f, "Tags:           {}", record.tags().join(", "))?;
        writeln!(f, "Description:    {}", record.short_description())?;
        writeln!(f, "JSON:           {}", self.paths.json_path.display())?;
        writeln!(f, "Text:           {}", self.paths.text_path.display())?;
        if let Some(path) = &self.html_path {
            writeln!(f, "HTML:           {}", path.display())?;
        }
        writeln!(f, "Elapsed:        {:.1}s", self.elapsed.as_secs_f64())?;
        writeln!(f)?;
        writeln!(f, "Preview:")?;
        let preview: String = record.body().chars().take(PREVIEW_CHARS).collect();
        let cut = record.body().chars().count() > PREVIEW_CHARS;
        write!(f, "{}{}", preview, if cut { "..." } else { "" })
    }
}

fn build_clients(
    specs: &[ProviderSpec],
    token: Option<&String>,
    http: &Client,
) -> Result<Vec<ProviderClient>, ConfigError> {
    specs
        .iter()
        .map(|spec| ProviderClient::new(spec.clone(), token.cloned(), http.clone()))
        .collect()
}

/// Turn a resolved image into something the record can reference.
async fn image_reference(
    resolved: Option<ResolvedImage>,
    config: &PipelineConfig,
    options: &RunOptions,
    now: DateTime<Local>,
) -> Option<String> {
    match resolved? {
        ResolvedImage::Url { url, .. } => Some(url),
        ResolvedImage::Bytes { provider, bytes } => {
            match image::store_image(&bytes, &options.output_dir, now, config.output.inline_images).await {
                Ok(reference) => Some(reference),
                Err(e) => {
                    warn!(%provider, error = %e, "Failed to store generated image; using default");
                    config.default_image_url.clone()
                }
            }
        }
    }
}

/// Run the pipeline once.
#[instrument(level = "info", skip_all, fields(output_dir = %options.output_dir.display()))]
pub async fn run(config: &PipelineConfig, options: &RunOptions) -> Result<RunSummary, Box<dyn Error>> {
    let t0 = Instant::now();
    ensure_writable_dir(&options.output_dir).await?;

    let token = options.token.as_ref().filter(|t| !t.trim().is_empty());
    if token.is_none() {
        warn!("No API token configured; providers that need one will be skipped");
    }

    let http = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let text_providers = build_clients(&config.text_providers, token, &http)?;
    let image_providers = build_clients(&config.image_providers, token, &http)?;
    let chain = FallbackChain::new(config.retry_policy());

    let now = Local::now();
    let seed = config.synth.seed.resolve(now);
    let resolved = chain
        .resolve_text(
            &text_providers,
            &config.text_prompt,
            &config.text_params,
            &LocalSynthesizer::new(),
            seed,
        )
        .await;
    let body = clean_generated_text(&resolved.text);
    info!(
        source = %resolved.source_provider,
        chars = body.chars().count(),
        preview = %truncate_for_log(&body, 80),
        "Article body ready"
    );

    let image = chain
        .resolve_image(
            &image_providers,
            &config.image_prompt,
            &config.image_params,
            config.default_image_url.as_deref(),
        )
        .await;
    let image_ref = image_reference(image, config, options, now).await;

    let record =
        RecordBuilder::new(config.record.clone()).build(&body, image_ref, &resolved.source_provider)?;

    let paths = json::persist(&record, &options.output_dir, &config.output).await?;
    let html_path = if options.html {
        let path = options.output_dir.join(&config.output.html_file);
        html::write_html(&record, &path).await?;
        Some(path)
    } else {
        None
    };

    let elapsed = t0.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "Pipeline run complete");
    Ok(RunSummary {
        record,
        paths,
        html_path,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthRequirement, EndpointKind};
    use crate::models::LOCAL_PROVIDER;
    use crate::synth::SeedPolicy;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec(server: &MockServer, name: &str, kind: EndpointKind) -> ProviderSpec {
        ProviderSpec {
            name: name.to_string(),
            kind,
            url: format!("{}/models/{}", server.uri(), name),
            auth: AuthRequirement::BearerToken,
            timeout_secs: 5,
            max_poll_attempts: 1,
            poll_interval_ms: 1,
        }
    }

    fn options(dir: &std::path::Path, token: Option<&str>, html: bool) -> RunOptions {
        RunOptions {
            output_dir: dir.to_path_buf(),
            token: token.map(str::to_string),
            html,
        }
    }

    #[tokio::test]
    async fn test_all_providers_failing_still_publishes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = PipelineConfig {
            text_providers: vec![spec(&server, "gpt2", EndpointKind::Text)],
            image_providers: vec![spec(&server, "sd", EndpointKind::Image)],
            synth: crate::synth::SynthSettings {
                seed: SeedPolicy::Fixed(11),
            },
            ..PipelineConfig::default()
        };
        let tmp = tempfile::tempdir().unwrap();
        let summary = run(&config, &options(tmp.path(), Some("t"), true)).await.unwrap();

        assert_eq!(summary.record.source_provider(), LOCAL_PROVIDER);
        assert_eq!(summary.record.image_reference(), None);
        assert_eq!(
            summary.record.body(),
            clean_generated_text(&LocalSynthesizer::new().synthesize_text(11))
        );
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary.paths.json_path).unwrap())
                .unwrap();
        assert!(value["image_path"].is_null());
        let page = std::fs::read_to_string(summary.html_path.unwrap()).unwrap();
        assert!(page.contains("image-placeholder"));
    }

    #[tokio::test]
    async fn test_remote_text_and_generated_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gpt2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"generated_text": "Введение: Модели стали быстрее."}])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/sd"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G', 7]))
            .mount(&server)
            .await;

        let config = PipelineConfig {
            text_providers: vec![spec(&server, "gpt2", EndpointKind::Text)],
            image_providers: vec![spec(&server, "sd", EndpointKind::Image)],
            ..PipelineConfig::default()
        };
        let tmp = tempfile::tempdir().unwrap();
        let summary = run(&config, &options(tmp.path(), Some("t"), false)).await.unwrap();

        assert_eq!(summary.record.body(), "Модели стали быстрее.");
        assert_eq!(summary.record.source_provider(), "gpt2");
        let image_ref = summary.record.image_reference().unwrap();
        assert!(image_ref.starts_with("ai_image_") && image_ref.ends_with(".png"));
        assert!(tmp.path().join(image_ref).exists());
        assert!(summary.html_path.is_none());
        assert!(!tmp.path().join("current-news.html").exists());
        assert_eq!(
            std::fs::read_to_string(&summary.paths.text_path).unwrap(),
            "Модели стали быстрее."
        );
    }

    #[tokio::test]
    async fn test_missing_token_degrades_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/banner.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8]))
            .expect(1)
            .mount(&server)
            .await;

        let banner = format!("{}/banner.jpg", server.uri());
        let config = PipelineConfig {
            text_providers: vec![spec(&server, "gpt2", EndpointKind::Text)],
            image_providers: vec![
                spec(&server, "sd", EndpointKind::Image),
                ProviderSpec::static_image("banner", &banner),
            ],
            ..PipelineConfig::default()
        };
        let tmp = tempfile::tempdir().unwrap();
        let summary = run(&config, &options(tmp.path(), None, true)).await.unwrap();

        assert_eq!(summary.record.source_provider(), LOCAL_PROVIDER);
        assert_eq!(summary.record.image_reference(), Some(banner.as_str()));
        let rendered = summary.to_string();
        assert!(rendered.contains("Source:         local"));
        assert!(rendered.contains(&banner));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_default_image_when_everything_fails() {
        let config = PipelineConfig {
            text_providers: Vec::new(),
            image_providers: Vec::new(),
            default_image_url: Some("https://example.com/fallback.jpg".into()),
            ..PipelineConfig::default()
        };
        let tmp = tempfile::tempdir().unwrap();
        let summary = run(&config, &options(tmp.path(), None, false)).await.unwrap();
        assert_eq!(
            summary.record.image_reference(),
            Some("https://example.com/fallback.jpg")
        );
        assert!(summary.to_string().contains("Image:          https://example.com/fallback.jpg"));
    }
}
