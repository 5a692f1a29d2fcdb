//! Passage sources.
//!
//! A [`DocumentSource`] turns a URL into the ordered list of passages the
//! judge reads. [`FallbackSource`] adds the archive fallback on top of any
//! source: when the live page yields nothing usable, the same page is tried
//! once more through the Wayback Machine.

use async_trait::async_trait;
use thiserror::Error;

use triplecheck_core::Passage;

mod html;
mod http;

pub use html::{extract_paragraphs, paragraph_texts};
pub use http::HttpDocumentSource;

/// Prefix of archived copies.
pub const ARCHIVE_PREFIX: &str = "https://web.archive.org/web/";

/// Text the archive serves for pages it never captured.
pub const NOT_ARCHIVED_MARKER: &str = "The Wayback Machine has not archived that URL.";

/// Errors from fetching and splitting a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("HTTP request failed for {url}: {message}")]
    HttpError { url: String, message: String },

    #[error("HTTP client could not be built: {0}")]
    ClientError(String),

    #[error("The Wayback Machine has not archived {url}")]
    NotArchived { url: String },

    #[error("No paragraph of at least {min_chars} characters found at {url}")]
    NoParagraphs { url: String, min_chars: usize },
}

impl DocumentError {
    /// Transport failures are worth retrying; content problems are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, DocumentError::HttpError { .. })
    }
}

/// Produces passages for a URL, in document order.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// An empty list is a valid answer here; [`FallbackSource`] decides
    /// whether that is fatal.
    async fn fetch(&self, url: &str) -> Result<Vec<Passage>, DocumentError>;
}

/// Archive URL for `url`.
pub fn archive_url(url: &str) -> String {
    format!("{}{}", ARCHIVE_PREFIX, url)
}

pub fn is_archive_url(url: &str) -> bool {
    url.starts_with(ARCHIVE_PREFIX) || url.starts_with("http://web.archive.org/web/")
}

/// Wraps a source with the "at least one passage" rule and the bounded
/// archive retry.
pub struct FallbackSource<S> {
    inner: S,
    archive: bool,
}

impl<S: DocumentSource> FallbackSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            archive: true,
        }
    }

    /// Enable or disable the archive retry.
    pub fn with_archive(mut self, enabled: bool) -> Self {
        self.archive = enabled;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: DocumentSource> DocumentSource for FallbackSource<S> {
    async fn fetch(&self, url: &str) -> Result<Vec<Passage>, DocumentError> {
        let passages = self.inner.fetch(url).await?;
        if !passages.is_empty() {
            tracing::info!(url, passages = passages.len(), "Passages extracted");
            return Ok(passages);
        }

        if !self.archive || is_archive_url(url) {
            return Err(DocumentError::NoParagraphs {
                url: url.to_string(),
                min_chars: Passage::MIN_CHARS,
            });
        }

        let archived = archive_url(url);
        tracing::warn!(url, archive = %archived, "No usable paragraphs, trying the web archive");

        let passages = self.inner.fetch(&archived).await?;
        if passages.is_empty() {
            return Err(DocumentError::NoParagraphs {
                url: archived,
                min_chars: Passage::MIN_CHARS,
            });
        }

        tracing::info!(url = %archived, passages = passages.len(), "Passages extracted from archive");
        Ok(passages)
    }
}
