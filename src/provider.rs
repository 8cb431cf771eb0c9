//! HTTP client for a single inference provider.
//!
//! A [`ProviderClient`] wraps one [`ProviderSpec`]: a text-generation endpoint,
//! an image-generation endpoint, or a static image URL. Each call sends exactly
//! one request and reports what happened as a [`GenerationAttempt`]; nothing
//! here returns an `Err` or touches the disk.
//!
//! # Status mapping
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 200 | `Success` (parsed text or raw bytes) |
//! | 503 | `TransientUnavailable` (model still loading) |
//! | other status | `HardError(Status)` |
//! | transport error / timeout | `HardError(Network)` |
//! | unparsable 200 body | `HardError(Malformed)` |
//!
//! The [`Provider`] trait is the seam the fallback chain is generic over.

use crate::config::{AuthRequirement, ConfigError, EndpointKind, ImageParams, ProviderSpec, TextParams};
use crate::models::{AttemptOutcome, GeneratedText, GenerationAttempt, Payload, ProviderError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Something the fallback chain can ask for text or images.
pub trait Provider {
    fn name(&self) -> &str;

    fn kind(&self) -> EndpointKind;

    /// Where the provider lives; static image providers are referenced by it.
    fn endpoint(&self) -> &Url;

    /// `(max_poll_attempts, poll_interval)` for readiness polling after a 503.
    fn readiness_budget(&self) -> (u32, Duration);

    async fn fetch_text(&self, prompt: &str, params: &TextParams) -> GenerationAttempt;

    async fn fetch_image(&self, prompt: &str, params: &ImageParams) -> GenerationAttempt;

    /// Lightweight probe: is the backing model loaded?
    async fn is_ready(&self) -> bool;
}

/// JSON body shared by text and image generation requests.
#[derive(Debug, Serialize)]
struct GenerationRequest<'a, P: Serialize> {
    inputs: &'a str,
    parameters: &'a P,
}

/// Client for one configured provider.
#[derive(Clone)]
pub struct ProviderClient {
    spec: ProviderSpec,
    endpoint: Url,
    token: Option<String>,
    http: Client,
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("name", &self.spec.name)
            .field("kind", &self.spec.kind)
            .field("endpoint", &self.endpoint.as_str())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl ProviderClient {
    /// Build a client for one configured provider.
    ///
    /// # Arguments
    ///
    /// * `spec` - Endpoint, auth and timing settings for the provider
    /// * `token` - API token; a blank token counts as absent
    /// * `http` - Shared HTTP client (connection pool, user agent)
    ///
    /// # Returns
    ///
    /// A client ready to send generation and readiness requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Url`] if the spec's URL or model id does not
    /// resolve to a valid endpoint.
    pub fn new(spec: ProviderSpec, token: Option<String>, http: Client) -> Result<Self, ConfigError> {
        let endpoint = spec.endpoint()?;
        Ok(Self {
            spec,
            endpoint,
            token: token.filter(|t| !t.trim().is_empty()),
            http,
        })
    }

    fn missing_token(&self) -> bool {
        self.spec.auth == AuthRequirement::BearerToken && self.token.is_none()
    }

    /// Attach the bearer header when the provider wants one and a token exists.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match (self.spec.auth, &self.token) {
            (AuthRequirement::BearerToken, Some(token)) => request.bearer_auth(token),
            _ => request,
        }
    }

    fn post_json<P: Serialize>(&self, prompt: &str, parameters: &P) -> RequestBuilder {
        let body = GenerationRequest {
            inputs: prompt,
            parameters,
        };
        self.authorize(self.http.post(self.endpoint.clone()).json(&body))
            .timeout(self.spec.timeout())
    }

    /// Send the request and read the full body, mapping status codes.
    async fn exchange(&self, request: RequestBuilder) -> Result<Vec<u8>, AttemptOutcome> {
        let response = request
            .send()
            .await
            .map_err(|e| AttemptOutcome::HardError(e.into()))?;
        match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| AttemptOutcome::HardError(e.into()))?;
                Ok(body.to_vec())
            }
            StatusCode::SERVICE_UNAVAILABLE => Err(AttemptOutcome::TransientUnavailable),
            other => Err(AttemptOutcome::HardError(ProviderError::Status(other.as_u16()))),
        }
    }

    async fn request_text(&self, prompt: &str, params: &TextParams) -> AttemptOutcome {
        if self.spec.kind != EndpointKind::Text {
            return AttemptOutcome::HardError(ProviderError::Malformed(format!(
                "provider kind {:?} cannot generate text",
                self.spec.kind
            )));
        }
        if self.missing_token() {
            return AttemptOutcome::HardError(ProviderError::MissingToken);
        }

        let body = match self.exchange(self.post_json(prompt, params)).await {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };
        match serde_json::from_slice::<Vec<GeneratedText>>(&body) {
            Ok(items) => match items.into_iter().next() {
                Some(first) => AttemptOutcome::Success(Payload::Text(first.generated_text)),
                None => AttemptOutcome::HardError(ProviderError::Malformed(
                    "empty generation list".into(),
                )),
            },
            Err(e) => AttemptOutcome::HardError(ProviderError::Malformed(e.to_string())),
        }
    }

    async fn request_image(&self, prompt: &str, params: &ImageParams) -> AttemptOutcome {
        if self.missing_token() {
            return AttemptOutcome::HardError(ProviderError::MissingToken);
        }
        let request = match self.spec.kind {
            EndpointKind::Image => self.post_json(prompt, params),
            EndpointKind::StaticImage => self
                .authorize(self.http.get(self.endpoint.clone()))
                .timeout(self.spec.timeout()),
            EndpointKind::Text => {
                return AttemptOutcome::HardError(ProviderError::Malformed(
                    "text provider cannot produce images".into(),
                ));
            }
        };
        match self.exchange(request).await {
            Ok(bytes) => AttemptOutcome::Success(Payload::Bytes(bytes)),
            Err(outcome) => outcome,
        }
    }

    fn finish(&self, outcome: AttemptOutcome, t0: Instant) -> GenerationAttempt {
        let elapsed = t0.elapsed();
        match &outcome {
            AttemptOutcome::Success(payload) => debug!(
                provider = %self.spec.name,
                elapsed_ms = elapsed.as_millis() as u64,
                size = payload.size(),
                "Provider call succeeded"
            ),
            AttemptOutcome::TransientUnavailable => warn!(
                provider = %self.spec.name,
                elapsed_ms = elapsed.as_millis() as u64,
                "Provider model is still loading (503)"
            ),
            AttemptOutcome::HardError(e) => warn!(
                provider = %self.spec.name,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Provider call failed"
            ),
        }
        GenerationAttempt {
            provider_name: self.spec.name.clone(),
            outcome,
            elapsed,
        }
    }
}

impl Provider for ProviderClient {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn kind(&self) -> EndpointKind {
        self.spec.kind
    }

    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn readiness_budget(&self) -> (u32, Duration) {
        (self.spec.max_poll_attempts, self.spec.poll_interval())
    }

    #[instrument(level = "info", skip_all, fields(provider = %self.spec.name))]
    async fn fetch_text(&self, prompt: &str, params: &TextParams) -> GenerationAttempt {
        let t0 = Instant::now();
        let outcome = self.request_text(prompt, params).await;
        self.finish(outcome, t0)
    }

    #[instrument(level = "info", skip_all, fields(provider = %self.spec.name))]
    async fn fetch_image(&self, prompt: &str, params: &ImageParams) -> GenerationAttempt {
        let t0 = Instant::now();
        let outcome = self.request_image(prompt, params).await;
        self.finish(outcome, t0)
    }

    #[instrument(level = "debug", skip_all, fields(provider = %self.spec.name))]
    async fn is_ready(&self) -> bool {
        if self.missing_token() {
            return false;
        }
        let probe = self
            .authorize(self.http.get(self.endpoint.clone()))
            .timeout(self.spec.timeout());
        match probe.send().await {
            Ok(response) => response.status() != StatusCode::SERVICE_UNAVAILABLE,
            Err(e) => {
                debug!(error = %e, "Readiness probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text_spec(server: &MockServer, route: &str) -> ProviderSpec {
        ProviderSpec {
            name: route.trim_start_matches('/').to_string(),
            kind: EndpointKind::Text,
            url: format!("{}{}", server.uri(), route),
            auth: AuthRequirement::BearerToken,
            timeout_secs: 5,
            max_poll_attempts: 2,
            poll_interval_ms: 0,
        }
    }

    fn client(spec: ProviderSpec, token: Option<&str>) -> ProviderClient {
        ProviderClient::new(spec, token.map(str::to_string), Client::new()).unwrap()
    }

    #[tokio::test]
    async fn test_text_success_parses_first_generation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gpt2"))
            .and(header("Authorization", "Bearer hf_test"))
            .and(body_json(json!({
                "inputs": "prompt",
                "parameters": {
                    "max_length": 300,
                    "temperature": 0.9,
                    "do_sample": true,
                    "return_full_text": false
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"generated_text": "Hello world"},
                {"generated_text": "ignored"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = client(text_spec(&server, "/models/gpt2"), Some("hf_test"));
        let attempt = provider.fetch_text("prompt", &TextParams::default()).await;
        assert_eq!(attempt.provider_name, "models/gpt2");
        match attempt.outcome {
            AttemptOutcome::Success(Payload::Text(text)) => assert_eq!(text, "Hello world"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_503_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = client(text_spec(&server, "/models/slow"), Some("t"));
        let attempt = provider.fetch_text("p", &TextParams::default()).await;
        assert!(matches!(attempt.outcome, AttemptOutcome::TransientUnavailable));
    }

    #[tokio::test]
    async fn test_other_status_is_hard_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = client(text_spec(&server, "/models/broken"), Some("t"));
        let attempt = provider.fetch_text("p", &TextParams::default()).await;
        assert!(matches!(
            attempt.outcome,
            AttemptOutcome::HardError(ProviderError::Status(500))
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_hard_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let provider = client(text_spec(&server, "/models/odd"), Some("t"));
        let attempt = provider.fetch_text("p", &TextParams::default()).await;
        assert!(matches!(
            attempt.outcome,
            AttemptOutcome::HardError(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = client(text_spec(&server, "/models/gpt2"), Some("   "));
        let attempt = provider.fetch_text("p", &TextParams::default()).await;
        assert!(matches!(
            attempt.outcome,
            AttemptOutcome::HardError(ProviderError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_unauthenticated_provider_sends_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/banner.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .expect(1)
            .mount(&server)
            .await;

        let spec = ProviderSpec::static_image("banner", &format!("{}/banner.png", server.uri()));
        let provider = client(spec, Some("secret"));
        let attempt = provider.fetch_image("ignored", &ImageParams::default()).await;
        match attempt.outcome {
            AttemptOutcome::Success(Payload::Bytes(bytes)) => assert_eq!(bytes.len(), 4),
            other => panic!("unexpected outcome: {:?}", other),
        }
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_image_generation_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/sd"))
            .and(body_json(json!({
                "inputs": "a robot",
                "parameters": {"width": 512, "height": 256, "num_inference_steps": 20}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
            .mount(&server)
            .await;

        let spec = ProviderSpec {
            kind: EndpointKind::Image,
            ..text_spec(&server, "/models/sd")
        };
        let provider = client(spec, Some("t"));
        let attempt = provider.fetch_image("a robot", &ImageParams::default()).await;
        match attempt.outcome {
            AttemptOutcome::Success(Payload::Bytes(bytes)) => {
                assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0])
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_hard_error() {
        let server = MockServer::start().await;
        let provider = client(text_spec(&server, "/models/gpt2"), Some("t"));
        let attempt = provider.fetch_image("p", &ImageParams::default()).await;
        assert!(matches!(
            attempt.outcome,
            AttemptOutcome::HardError(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_is_ready_tracks_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/loading"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/models/loaded"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;

        let loading = client(text_spec(&server, "/models/loading"), Some("t"));
        let loaded = client(text_spec(&server, "/models/loaded"), Some("t"));
        assert!(!loading.is_ready().await);
        assert!(loaded.is_ready().await);
    }

    #[test]
    fn test_debug_hides_token() {
        let spec = ProviderSpec::hf_text("gpt2");
        let provider = ProviderClient::new(spec, Some("hf_secret".into()), Client::new()).unwrap();
        let rendered = format!("{:?}", provider);
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("has_token: true"));
    }
}
