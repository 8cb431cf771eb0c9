//! Ordered, best-effort resolution across providers.
//!
//! [`FallbackChain`] walks a fixed list of providers and keeps the first
//! well-formed success. Failures never escape: a `HardError` moves on at
//! once, a `TransientUnavailable` may poll readiness and retry the same
//! provider one time. Text always resolves (the [`LocalSynthesizer`] is the
//! last link); images may resolve to the configured default or to nothing.

use crate::config::{EndpointKind, ImageParams, TextParams};
use crate::models::{
    AttemptOutcome, DEFAULT_IMAGE_PROVIDER, GenerationAttempt, LOCAL_PROVIDER, Payload,
    ResolvedImage, ResolvedText,
};
use crate::provider::Provider;
use crate::synth::LocalSynthesizer;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// A single request to send to each provider in turn.
#[derive(Debug, Clone, Copy)]
enum Request<'a> {
    Text {
        prompt: &'a str,
        params: &'a TextParams,
    },
    Image {
        prompt: &'a str,
        params: &'a ImageParams,
    },
}

impl Request<'_> {
    async fn send<P: Provider>(&self, provider: &P) -> GenerationAttempt {
        match *self {
            Request::Text { prompt, params } => provider.fetch_text(prompt, params).await,
            Request::Image { prompt, params } => provider.fetch_image(prompt, params).await,
        }
    }
}

/// Poll `provider` until it reports ready or its poll budget runs out.
///
/// Waits one `poll_interval` before each probe. Returns `false` immediately
/// when the budget is zero.
#[instrument(level = "info", skip_all, fields(provider = %provider.name()))]
pub async fn await_readiness<P: Provider>(provider: &P) -> bool {
    let (max_attempts, interval) = provider.readiness_budget();
    for attempt in 1..=max_attempts {
        sleep(interval).await;
        if provider.is_ready().await {
            info!(attempt, max_attempts, "Provider reports ready");
            return true;
        }
        debug!(attempt, max_attempts, "Provider not ready yet");
    }
    warn!(max_attempts, "Readiness poll exhausted");
    false
}

/// What to do when a provider answers 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Poll readiness and retry the same provider one time.
    pub retry_transient_once: bool,
    /// Extra pause between a successful readiness poll and the retry.
    pub transient_retry_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_transient_once: true,
            transient_retry_wait: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FallbackChain {
    policy: RetryPolicy,
}

impl FallbackChain {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Ask one provider, with at most one retry after a 503 once it is ready.
    async fn attempt<P: Provider>(&self, provider: &P, request: Request<'_>) -> Option<Payload> {
        let first = request.send(provider).await;
        debug!(
            provider = %first.provider_name,
            outcome = first.outcome.label(),
            elapsed_ms = first.elapsed.as_millis() as u64,
            "Attempt finished"
        );
        match first.outcome {
            AttemptOutcome::Success(payload) => Some(payload),
            AttemptOutcome::HardError(_) => None,
            AttemptOutcome::TransientUnavailable => {
                if !self.policy.retry_transient_once || !await_readiness(provider).await {
                    return None;
                }
                if !self.policy.transient_retry_wait.is_zero() {
                    debug!(wait_ms = self.policy.transient_retry_wait.as_millis() as u64, "Waiting before retry");
                    sleep(self.policy.transient_retry_wait).await;
                }
                let retry = request.send(provider).await;
                match retry.outcome {
                    AttemptOutcome::Success(payload) => Some(payload),
                    other => {
                        warn!(provider = %retry.provider_name, outcome = other.label(), "Retry after readiness failed");
                        None
                    }
                }
            }
        }
    }

    /// Resolve the article body from the first provider that returns usable text.
    ///
    /// Providers are tried in order and later providers are never contacted once
    /// one succeeds. A 503 triggers at most one readiness poll and retry, as the
    /// [`RetryPolicy`] allows.
    ///
    /// # Arguments
    ///
    /// * `providers` - Text providers in priority order
    /// * `prompt` - Prompt sent to every provider
    /// * `params` - Generation parameters sent alongside the prompt
    /// * `synth` - Local fallback used when every provider fails
    /// * `seed` - Seed handed to `synth`
    ///
    /// # Returns
    ///
    /// The trimmed text and the name of the provider that produced it, or
    /// `"local"` for synthesized text. This operation never fails.
    #[instrument(level = "info", skip_all, fields(providers = providers.len()))]
    pub async fn resolve_text<P: Provider>(
        &self,
        providers: &[P],
        prompt: &str,
        params: &TextParams,
        synth: &LocalSynthesizer,
        seed: u64,
    ) -> ResolvedText {
        let request = Request::Text { prompt, params };
        for provider in providers {
            match self.attempt(provider, request).await {
                Some(Payload::Text(text)) if !text.trim().is_empty() => {
                    info!(provider = %provider.name(), chars = text.chars().count(), "Text resolved");
                    return ResolvedText {
                        text: text.trim().to_string(),
                        source_provider: provider.name().to_string(),
                    };
                }
                Some(_) => warn!(provider = %provider.name(), "Provider returned no usable text"),
                None => debug!(provider = %provider.name(), "Moving to next text provider"),
            }
        }

        warn!(seed, "All text providers exhausted; synthesizing locally");
        ResolvedText {
            text: synth.synthesize_text(seed),
            source_provider: LOCAL_PROVIDER.to_string(),
        }
    }

    /// Resolve the illustration from the first provider that returns a non-empty image.
    ///
    /// # Arguments
    ///
    /// * `providers` - Image providers in priority order
    /// * `prompt` - Prompt sent to generating providers
    /// * `params` - Image generation parameters
    /// * `default_url` - Reference used once every provider has failed
    ///
    /// # Returns
    ///
    /// * `Some(ResolvedImage::Bytes)` - A generating provider returned image data
    /// * `Some(ResolvedImage::Url)` - A static source responded, or the default was used
    /// * `None` - Every provider failed and no default is configured
    #[instrument(level = "info", skip_all, fields(providers = providers.len()))]
    pub async fn resolve_image<P: Provider>(
        &self,
        providers: &[P],
        prompt: &str,
        params: &ImageParams,
        default_url: Option<&str>,
    ) -> Option<ResolvedImage> {
        let request = Request::Image { prompt, params };
        for provider in providers {
            match self.attempt(provider, request).await {
                Some(Payload::Bytes(bytes)) if !bytes.is_empty() => {
                    let provider_name = provider.name().to_string();
                    let resolved = if provider.kind() == EndpointKind::StaticImage {
                        ResolvedImage::Url {
                            provider: provider_name,
                            url: provider.endpoint().to_string(),
                        }
                    } else {
                        ResolvedImage::Bytes {
                            provider: provider_name,
                            bytes,
                        }
                    };
                    info!(image = %resolved, "Image resolved");
                    return Some(resolved);
                }
                Some(_) => warn!(provider = %provider.name(), "Provider returned no usable image"),
                None => debug!(provider = %provider.name(), "Moving to next image provider"),
            }
        }

        match default_url {
            Some(url) => {
                warn!(%url, "All image providers exhausted; using default image");
                Some(ResolvedImage::Url {
                    provider: DEFAULT_IMAGE_PROVIDER.to_string(),
                    url: url.to_string(),
                })
            }
            None => {
                warn!("All image providers exhausted; no image");
                None
            }
        }
    }
}
