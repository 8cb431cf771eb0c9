//! Data models shared between providers and the fallback chain.
//!
//! This module defines the values that flow out of a single provider call and
//! out of a fully resolved chain:
//! - [`GenerationAttempt`]: one request against one provider, with its outcome
//! - [`AttemptOutcome`]: `success | transient_unavailable | hard_error`
//! - [`ResolvedText`] / [`ResolvedImage`]: what the chain settled on
//!
//! The persisted unit of output, [`crate::record::ContentRecord`], lives next to
//! its builder.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Source name recorded when the body came from the local synthesizer.
pub const LOCAL_PROVIDER: &str = "local";

/// Source name recorded when the configured default image was used.
pub const DEFAULT_IMAGE_PROVIDER: &str = "default";

/// Why a provider attempt failed without being retryable.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider needs a bearer token and none was configured.
    #[error("no API token configured")]
    MissingToken,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Raw result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Human-oriented size for logging: chars for text, bytes for binary.
    pub fn size(&self) -> usize {
        match self {
            Payload::Text(text) => text.chars().count(),
            Payload::Bytes(bytes) => bytes.len(),
        }
    }
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Payload),
    /// HTTP 503: the backing model is still loading.
    TransientUnavailable,
    HardError(ProviderError),
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => "success",
            AttemptOutcome::TransientUnavailable => "transient_unavailable",
            AttemptOutcome::HardError(_) => "hard_error",
        }
    }
}

/// One request against one provider.
#[derive(Debug)]
pub struct GenerationAttempt {
    pub provider_name: String,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

/// One element of the `[{"generated_text": "..."}]` response shape.
#[derive(Debug, Deserialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

/// Article text chosen by the chain, tagged with whoever produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedText {
    pub text: String,
    pub source_provider: String,
}

/// Image chosen by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// Freshly generated bytes that still need a home on disk.
    Bytes { provider: String, bytes: Vec<u8> },
    /// A URL that can be referenced as-is.
    Url { provider: String, url: String },
}

impl fmt::Display for ResolvedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedImage::Bytes { provider, bytes } => {
                write!(f, "{} bytes from {}", bytes.len(), provider)
            }
            ResolvedImage::Url { provider, url } => write!(f, "{} ({})", url, provider),
        }
    }
}
