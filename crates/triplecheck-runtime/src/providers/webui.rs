//! text-generation-webui backend through its OpenAI-compatible API.
//!
//! Non-streaming: one chat completion request with a single user message.

use super::{
    build_client, check_status,
    factory::{validate_common, ProviderFactory},
    secrets::ApiCredential,
    transport_error, LlmProvider, ProviderError,
};
use crate::config::{ProviderConfig, ProviderKind, SamplingParams};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token for the OpenAI-compatible endpoint. Most local servers accept anything.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const PLACEHOLDER_KEY: &str = "-";

pub struct WebuiProvider {
    credential: ApiCredential,
    endpoint: String,
    model: String,
    sampling: SamplingParams,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl std::fmt::Debug for WebuiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebuiProvider")
            .field("credential", &self.credential)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl WebuiProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let endpoint = config
            .endpoint_base()
            .ok_or_else(|| {
                ProviderError::NotConfigured("WEBUI requires an endpoint URL".to_string())
            })?
            .to_string();

        Ok(Self {
            credential: ApiCredential::from_env_or(OPENAI_API_KEY_ENV, PLACEHOLDER_KEY, "OpenAI API key"),
            endpoint,
            model: config.model.clone(),
            sampling: config.sampling.clone(),
            timeout: config.timeout,
            client: build_client(config.timeout)?,
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.sampling.effective_temperature(),
            max_tokens: self.sampling.max_new_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_choice(response: ChatResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| ProviderError::ParseError("response has no choices".to_string()))
}

#[async_trait]
impl LlmProvider for WebuiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let started = Instant::now();

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(self.credential.expose())
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let body: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        let text = first_choice(body)?;

        tracing::debug!(
            provider = "webui",
            endpoint = %self.endpoint,
            chars = text.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "webui"
    }
}

/// Factory for [`WebuiProvider`].
pub struct WebuiProviderFactory;

impl ProviderFactory for WebuiProviderFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Webui
    }

    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(WebuiProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        validate_common(config)
    }

    fn description(&self) -> &'static str {
        "text-generation-webui (OpenAI-compatible chat completions)"
    }
}
