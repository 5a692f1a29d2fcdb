//! Replicate hosted-model backend.
//!
//! A call creates a prediction with streaming enabled, then follows the
//! prediction's stream URL and concatenates its `output` events.

use super::{
    build_client, check_status, drain,
    factory::{validate_common, ProviderFactory},
    secrets::{ApiCredential, CredentialSource},
    sse::{response_body, text_stream, Chunk, SseEvent},
    transport_error, LlmProvider, ProviderError, TextStream,
};
use crate::config::{ProviderConfig, ProviderKind, SamplingParams};
use crate::prompts::SYSTEM_PROMPT;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Environment variable holding the Replicate API token.
pub const REPLICATE_API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

pub const REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";

/// Replicate backend.
///
/// Model identifiers are either `owner/name` (latest version, created
/// through the model's predictions endpoint) or `owner/name:version`.
pub struct ReplicateProvider {
    credential: ApiCredential,
    base_url: String,
    model: String,
    sampling: SamplingParams,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl std::fmt::Debug for ReplicateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl ReplicateProvider {
    /// Build from configuration, reading `REPLICATE_API_TOKEN`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(REPLICATE_API_TOKEN_ENV, "Replicate API token")?;
        Self::with_credential(config, credential)
    }

    pub fn with_token(config: &ProviderConfig, token: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_credential(
            config,
            ApiCredential::new(token, CredentialSource::Programmatic, "Replicate API token"),
        )
    }

    fn with_credential(config: &ProviderConfig, credential: ApiCredential) -> Result<Self, ProviderError> {
        Ok(Self {
            credential,
            base_url: config
                .endpoint_base()
                .unwrap_or(REPLICATE_API_BASE)
                .to_string(),
            model: config.model.clone(),
            sampling: config.sampling.clone(),
            timeout: config.timeout,
            client: build_client(config.timeout)?,
        })
    }

    /// Prediction endpoint and optional pinned version for the model.
    fn prediction_target(&self) -> (String, Option<&str>) {
        match self.model.split_once(':') {
            Some((_, version)) => (format!("{}/predictions", self.base_url), Some(version)),
            None => (
                format!("{}/models/{}/predictions", self.base_url, self.model),
                None,
            ),
        }
    }

    fn prediction_request<'a>(&'a self, prompt: &'a str, version: Option<&'a str>) -> PredictionRequest<'a> {
        PredictionRequest {
            version,
            input: PredictionInput {
                system_prompt: SYSTEM_PROMPT,
                prompt,
                temperature: self.sampling.effective_temperature(),
                top_p: self.sampling.top_p,
                max_new_tokens: self.sampling.max_new_tokens,
                min_new_tokens: self.sampling.min_new_tokens,
            },
            stream: true,
        }
    }

    /// Create the prediction and open its event stream.
    pub async fn stream(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        let (url, version) = self.prediction_target();
        let request = self.prediction_request(prompt, version);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.credential.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let prediction: Prediction = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let stream_url = prediction.urls.stream.ok_or_else(|| {
            ProviderError::StreamError(format!("prediction {} has no stream URL", prediction.id))
        })?;
        tracing::debug!(prediction = %prediction.id, "Following prediction stream");

        let response = self
            .client
            .get(&stream_url)
            .bearer_auth(self.credential.expose())
            .header("accept", "text/event-stream")
            .header("cache-control", "no-store")
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let response = check_status(response).await?;
        Ok(text_stream(response_body(response), replicate_event))
    }
}

fn replicate_event(event: SseEvent) -> Result<Chunk, ProviderError> {
    match event.event.as_deref() {
        Some("output") => Ok(Chunk::Text(event.data)),
        Some("error") => Err(ProviderError::StreamError(event.data)),
        Some("done") => {
            let reason = serde_json::from_str::<DoneEvent>(&event.data)
                .ok()
                .and_then(|done| done.reason);
            match reason.as_deref() {
                Some("canceled") => Err(ProviderError::StreamError(
                    "prediction was canceled".to_string(),
                )),
                _ => Ok(Chunk::End),
            }
        }
        _ => Ok(Chunk::Skip),
    }
}

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: PredictionInput<'a>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    system_prompt: &'a str,
    prompt: &'a str,
    temperature: f32,
    top_p: f32,
    max_new_tokens: u32,
    min_new_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    urls: PredictionUrls,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    stream: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoneEvent {
    #[serde(default)]
    reason: Option<String>,
}

#[async_trait]
impl LlmProvider for ReplicateProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let started = Instant::now();
        let text = drain(self.stream(prompt).await?).await?;
        tracing::debug!(
            provider = "replicate",
            model = %self.model,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "replicate"
    }
}

/// Factory for [`ReplicateProvider`].
pub struct ReplicateProviderFactory;

impl ProviderFactory for ReplicateProviderFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }

    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(ReplicateProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        validate_common(config)?;

        if !config.model.contains('/') {
            return Err(ProviderError::NotConfigured(format!(
                "Replicate model must look like owner/name or owner/name:version, got '{}'",
                config.model
            )));
        }

        if !ApiCredential::is_available(REPLICATE_API_TOKEN_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Replicate API token required: set {} environment variable",
                REPLICATE_API_TOKEN_ENV
            )));
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Replicate hosted models (streaming predictions)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: &str) -> ReplicateProvider {
        let config = ProviderConfig::new(ProviderKind::Replicate, model);
        ReplicateProvider::with_token(&config, "r8_test").unwrap()
    }

    #[test]
    fn test_model_endpoint_without_version() {
        let p = provider("meta/llama-2-70b-chat");
        let (url, version) = p.prediction_target();
        assert_eq!(
            url,
            "https://api.replicate.com/v1/models/meta/llama-2-70b-chat/predictions"
        );
        assert!(version.is_none());
    }

    #[test]
    fn test_version_endpoint() {
        let p = provider("meta/llama-2-70b-chat:02e509c7");
        let (url, version) = p.prediction_target();
        assert_eq!(url, "https://api.replicate.com/v1/predictions");
        assert_eq!(version, Some("02e509c7"));
    }

    #[test]
    fn test_request_body_shape() {
        let p = provider("meta/llama-2-70b-chat");
        let body = serde_json::to_value(p.prediction_request("Is it?", None)).unwrap();

        assert_eq!(body["stream"], true);
        assert!(body.get("version").is_none());
        assert_eq!(body["input"]["system_prompt"], "You are a helpful assistant.");
        assert_eq!(body["input"]["prompt"], "Is it?");
        assert_eq!(body["input"]["max_new_tokens"], 500);
        assert_eq!(body["input"]["min_new_tokens"], -1);
        let temperature = body["input"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_event_interpretation() {
        let event = |name: &str, data: &str| SseEvent {
            event: Some(name.to_string()),
            data: data.to_string(),
            id: None,
        };

        assert_eq!(
            replicate_event(event("output", "Hello")).unwrap(),
            Chunk::Text("Hello".to_string())
        );
        assert_eq!(replicate_event(event("done", "{}")).unwrap(), Chunk::End);
        assert_eq!(replicate_event(event("ping", "")).unwrap(), Chunk::Skip);
        assert!(replicate_event(event("error", "boom")).is_err());
        assert!(replicate_event(event("done", r#"{"reason":"canceled"}"#)).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let p = provider("meta/llama-2-70b-chat");
        let debug = format!("{:?}", p);
        assert!(!debug.contains("r8_test"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_factory_rejects_bare_model_name() {
        let config = ProviderConfig::new(ProviderKind::Replicate, "llama");
        assert!(matches!(
            ReplicateProviderFactory.validate_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
