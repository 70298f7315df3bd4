//! Error types for content fetching and page state

use thiserror::Error;

/// Errors raised while talking to the content source or updating page state
#[derive(Debug, Error)]
pub enum BlogError {
    /// Transport failure, non-2xx status, or an undecodable body
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// No document matched the requested identifier
    #[error("no {doc_type} document found for '{key}'")]
    NotFound { doc_type: String, key: String },

    /// The source answered with something we cannot use at all
    #[error("malformed content: {0}")]
    MalformedContent(String),

    /// A load-more request is already outstanding for this listing
    #[error("a page load is already in progress")]
    LoadInProgress,

    /// The listing has no next cursor
    #[error("no more pages to load")]
    NoMorePages,
}

impl BlogError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(doc_type: &str, key: &str) -> Self {
        Self::NotFound {
            doc_type: doc_type.to_string(),
            key: key.to_string(),
        }
    }

    /// Whether this error means the document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, BlogError>;
