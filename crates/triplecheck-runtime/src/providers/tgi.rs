//! Hugging Face text-generation-inference backend.

use super::{
    build_client, check_status, drain,
    factory::{validate_common, ProviderFactory},
    secrets::ApiCredential,
    sse::{response_body, text_stream, Chunk, SseEvent},
    transport_error, LlmProvider, ProviderError, TextStream,
};
use crate::config::{ProviderConfig, ProviderKind, SamplingParams};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Optional bearer token for protected endpoints.
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";

/// TGI backend reached at a user-supplied endpoint.
pub struct TgiProvider {
    credential: Option<ApiCredential>,
    endpoint: String,
    model: String,
    sampling: SamplingParams,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl std::fmt::Debug for TgiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TgiProvider")
            .field("credential", &self.credential)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl TgiProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let endpoint = config
            .endpoint_base()
            .ok_or_else(|| ProviderError::NotConfigured("TGI requires an endpoint URL".to_string()))?
            .to_string();

        Ok(Self {
            credential: ApiCredential::from_env_optional(HF_TOKEN_ENV, "Hugging Face token"),
            endpoint,
            model: config.model.clone(),
            sampling: config.sampling.clone(),
            timeout: config.timeout,
            client: build_client(config.timeout)?,
        })
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            inputs: prompt,
            stream: true,
            parameters: GenerateParameters {
                max_new_tokens: self.sampling.max_new_tokens,
                temperature: self.sampling.effective_temperature(),
                top_p: self.sampling.top_p,
            },
        }
    }

    /// Open the token stream for `prompt`.
    ///
    /// Posts to the endpoint URL itself with `stream: true`; a TGI root
    /// routes that to its streaming handler.
    pub async fn stream(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("accept", "text/event-stream")
            .json(&self.request(prompt));

        if let Some(credential) = &self.credential {
            request = request.bearer_auth(credential.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let response = check_status(response).await?;

        Ok(text_stream(response_body(response), tgi_event))
    }
}

fn tgi_event(event: SseEvent) -> Result<Chunk, ProviderError> {
    if event.data.trim().is_empty() {
        return Ok(Chunk::Skip);
    }

    let message: StreamResponse =
        serde_json::from_str(&event.data).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    if let Some(error) = message.error {
        return Err(ProviderError::StreamError(match message.error_type {
            Some(kind) => format!("{}: {}", kind, error),
            None => error,
        }));
    }

    match message.token {
        Some(token) if !token.special => Ok(Chunk::Text(token.text)),
        _ => Ok(Chunk::Skip),
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    stream: bool,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    token: Option<StreamToken>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamToken {
    text: String,
    #[serde(default)]
    special: bool,
}

#[async_trait]
impl LlmProvider for TgiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let started = Instant::now();
        let text = drain(self.stream(prompt).await?).await?;
        tracing::debug!(
            provider = "tgi",
            endpoint = %self.endpoint,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "tgi"
    }
}

/// Factory for [`TgiProvider`].
pub struct TgiProviderFactory;

impl ProviderFactory for TgiProviderFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tgi
    }

    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(TgiProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        validate_common(config)
    }

    fn description(&self) -> &'static str {
        "Hugging Face text-generation-inference (token streaming)"
    }
}
