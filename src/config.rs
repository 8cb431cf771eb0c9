//! Pipeline configuration.
//!
//! Everything the pipeline needs to know about its providers, prompts and
//! outputs lives in [`PipelineConfig`]. It is built from defaults that mirror
//! the historical Hugging Face setup, optionally overridden by a YAML file:
//!
//! ```yaml
//! text_prompt: "Современные достижения в области искусственного интеллекта:"
//! text_providers:
//!   - name: gpt2
//!     kind: text
//!     url: gpt2
//!     auth: bearer_token
//!     max_poll_attempts: 2
//! default_image_url: https://example.com/fallback.jpg
//! ```
//!
//! Any field left out keeps its default. The API token is *not* part of the
//! file; it is handed to each [`crate::provider::ProviderClient`] explicitly.

use crate::chain::RetryPolicy;
use crate::outputs::OutputSettings;
use crate::record::RecordSettings;
use crate::synth::SynthSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Base URL of the hosted inference API; bare model ids are resolved against it.
pub const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models/";

const PLACEHOLDER_IMAGE_BASE: &str = "https://via.placeholder.com/800x400/2c3e50/ecf0f1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("provider `{name}` has an invalid url: {source}")]
    Url {
        name: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What a provider endpoint produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Text-generation endpoint (POST, list-of-objects JSON response).
    Text,
    /// Image-generation endpoint (POST, raw image bytes response).
    Image,
    /// Plain URL that serves an image on GET.
    StaticImage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequirement {
    #[default]
    None,
    BearerToken,
}

/// Static description of one external provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderSpec {
    pub name: String,
    pub kind: EndpointKind,
    /// Either a full URL or a model id such as `microsoft/DialoGPT-large`.
    pub url: String,
    #[serde(default)]
    pub auth: AuthRequirement,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on readiness probes after a 503. Zero disables polling.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_poll_attempts() -> u32 {
    4
}

fn default_poll_interval_ms() -> u64 {
    30_000
}

impl ProviderSpec {
    /// A hosted text-generation model reached with the bearer token.
    pub fn hf_text(model_id: &str) -> Self {
        Self {
            name: model_id.to_string(),
            kind: EndpointKind::Text,
            url: model_id.to_string(),
            auth: AuthRequirement::BearerToken,
            timeout_secs: default_timeout_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// A hosted text-to-image model reached with the bearer token.
    pub fn hf_image(model_id: &str) -> Self {
        Self {
            kind: EndpointKind::Image,
            timeout_secs: 120,
            ..Self::hf_text(model_id)
        }
    }

    /// An unauthenticated image URL.
    pub fn static_image(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EndpointKind::StaticImage,
            url: url.to_string(),
            auth: AuthRequirement::None,
            timeout_secs: 30,
            max_poll_attempts: 0,
            poll_interval_ms: 0,
        }
    }

    /// Resolve `url` into the endpoint that requests are sent to.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let parsed = if self.url.contains("://") {
            Url::parse(&self.url)
        } else {
            Url::parse(HF_INFERENCE_BASE).and_then(|base| base.join(self.url.trim_start_matches('/')))
        };
        parsed.map_err(|source| ConfigError::Url {
            name: self.name.clone(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Request parameters for text generation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TextParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    pub temperature: f32,
    pub do_sample: bool,
    pub return_full_text: bool,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            max_length: Some(300),
            max_new_tokens: None,
            temperature: 0.9,
            do_sample: true,
            return_full_text: false,
        }
    }
}

/// Request parameters for image generation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageParams {
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 256,
            num_inference_steps: 20,
            guidance_scale: None,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub text_prompt: String,
    pub image_prompt: String,
    pub text_params: TextParams,
    pub image_params: ImageParams,
    /// Tried in order; the local synthesizer follows the last one.
    pub text_providers: Vec<ProviderSpec>,
    /// Tried in order; `default_image_url` (if any) follows the last one.
    pub image_providers: Vec<ProviderSpec>,
    pub default_image_url: Option<String>,
    /// Poll readiness and retry a provider once after it answers 503.
    pub retry_transient_once: bool,
    /// Pause before that retry, in milliseconds.
    pub transient_retry_wait_ms: u64,
    pub record: RecordSettings,
    pub output: OutputSettings,
    pub synth: SynthSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_prompt: "Современные достижения в области искусственного интеллекта:".to_string(),
            image_prompt: "artificial intelligence neural network futuristic technology digital art"
                .to_string(),
            text_params: TextParams::default(),
            image_params: ImageParams::default(),
            text_providers: vec![
                ProviderSpec::hf_text("gpt2"),
                ProviderSpec::hf_text("microsoft/DialoGPT-large"),
            ],
            image_providers: vec![
                ProviderSpec::hf_image("CompVis/stable-diffusion-v1-4"),
                ProviderSpec::static_image("placeholder", &placeholder_image_url("AI Neural Networks News")),
            ],
            default_image_url: None,
            retry_transient_once: true,
            transient_retry_wait_ms: 0,
            record: RecordSettings::default(),
            output: OutputSettings::default(),
            synth: SynthSettings::default(),
        }
    }
}

/// Placeholder-service URL rendering `caption` on a dark banner.
pub fn placeholder_image_url(caption: &str) -> String {
    format!("{}?text={}", PLACEHOLDER_IMAGE_BASE, urlencoding::encode(caption))
}

impl PipelineConfig {
    /// Load the configuration, falling back to defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => {
                info!("No config file given; using built-in defaults");
                Self::default()
            }
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded configuration");
                config
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// How the fallback chains treat a provider that answers 503.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_transient_once: self.retry_transient_once,
            transient_retry_wait: Duration::from_millis(self.transient_retry_wait_ms),
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Check provider lists and record settings for obvious mistakes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for spec in self.text_providers.iter().chain(&self.image_providers) {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Invalid("provider name must not be empty".into()));
            }
            spec.endpoint()?;
        }
        if let Some(spec) = self.text_providers.iter().find(|s| s.kind != EndpointKind::Text) {
            return Err(ConfigError::Invalid(format!(
                "text provider `{}` must have kind `text`",
                spec.name
            )));
        }
        if let Some(spec) = self.image_providers.iter().find(|s| s.kind == EndpointKind::Text) {
            return Err(ConfigError::Invalid(format!(
                "image provider `{}` must have kind `image` or `static_image`",
                spec.name
            )));
        }
        if let Some(url) = &self.default_image_url {
            Url::parse(url).map_err(|source| ConfigError::Url {
                name: "default_image_url".into(),
                source,
            })?;
        }
        if self.record.description_budget == 0 {
            return Err(ConfigError::Invalid("record.description_budget must be positive".into()));
        }
        if self.record.titles.is_empty() {
            return Err(ConfigError::Invalid("record.titles must contain at least one title".into()));
        }
        Ok(())
    }
}
