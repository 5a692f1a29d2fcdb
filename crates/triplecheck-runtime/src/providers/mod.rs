//! Inference backends.
//!
//! Every backend is reduced to one capability: take a prompt, return the
//! full generated text. Streaming backends are drained before returning.
//!
//! ## Security
//!
//! API tokens are held in [`ApiCredential`] and never appear in logs.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

mod factory;
mod replicate;
pub mod secrets;
pub mod sse;
mod tgi;
mod webui;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use replicate::{ReplicateProvider, ReplicateProviderFactory, REPLICATE_API_TOKEN_ENV};
pub use secrets::{ApiCredential, CredentialSource};
pub use tgi::{TgiProvider, TgiProviderFactory, HF_TOKEN_ENV};
pub use webui::{WebuiProvider, WebuiProviderFactory, OPENAI_API_KEY_ENV};

/// Errors from inference backends.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Incremental text produced by a streaming backend.
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

/// Trait for inference backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a single user prompt.
    ///
    /// Returns the concatenation of every chunk the backend produced, in
    /// arrival order. An empty string is a valid completion.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Concatenate a text stream. The first error ends the call.
pub async fn drain(mut stream: TextStream) -> Result<String, ProviderError> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

/// HTTP client with the configured per-request timeout.
pub(crate) fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        "triplecheck/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| ProviderError::HttpError(e.to_string()))
}

pub(crate) fn transport_error(e: reqwest::Error, timeout: Option<Duration>) -> ProviderError {
    match timeout {
        Some(t) if e.is_timeout() => ProviderError::Timeout(t),
        _ => ProviderError::HttpError(e.to_string()),
    }
}

/// Map non-success statuses. Bodies of error responses are kept short.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ProviderError::RateLimited { retry_after });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthError);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(500).collect();
        return Err(ProviderError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}
