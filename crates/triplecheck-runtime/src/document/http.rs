//! Live HTTP document source.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;

use triplecheck_core::Passage;

use super::{paragraph_texts, DocumentError, DocumentSource, NOT_ARCHIVED_MARKER};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches pages over HTTP and extracts their paragraphs.
///
/// Transport failures are retried with exponential backoff (three attempts
/// in total). HTTP error statuses are not: the body is still parsed, and an
/// error page simply yields no passages.
#[derive(Debug, Clone)]
pub struct HttpDocumentSource {
    client: reqwest::Client,
    attempts: usize,
    min_delay: Duration,
}

impl HttpDocumentSource {
    pub fn new() -> Result<Self, DocumentError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DocumentError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("triplecheck/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| DocumentError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            attempts: 3,
            min_delay: Duration::from_millis(500),
        })
    }

    /// Override the retry schedule.
    pub fn with_retry(mut self, attempts: usize, min_delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.min_delay = min_delay;
        self
    }

    async fn get_text(&self, url: &str) -> Result<String, DocumentError> {
        let http_error = |e: reqwest::Error| DocumentError::HttpError {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Document request returned an error status");
        }
        response.text().await.map_err(http_error)
    }

    /// Fetch the raw page body, retrying transport failures.
    pub async fn fetch_html(&self, url: &str) -> Result<String, DocumentError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_times(self.attempts - 1);

        (|| self.get_text(url))
            .retry(backoff)
            .when(DocumentError::is_transient)
            .notify(|err: &DocumentError, delay: Duration| {
                tracing::warn!(error = %err, delay_ms = delay.as_millis() as u64, "Retrying document fetch");
            })
            .await
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, url: &str) -> Result<Vec<Passage>, DocumentError> {
        let html = self.fetch_html(url).await?;
        let texts = paragraph_texts(&html);

        if texts.iter().any(|text| text.contains(NOT_ARCHIVED_MARKER)) {
            return Err(DocumentError::NotArchived {
                url: url.to_string(),
            });
        }

        let passages: Vec<Passage> = texts.into_iter().filter_map(Passage::checked).collect();
        tracing::debug!(url, bytes = html.len(), passages = passages.len(), "Document parsed");
        Ok(passages)
    }
}
