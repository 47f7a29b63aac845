//! Transport error types for page and asset fetching
//!
//! Every variant is a "hard" failure from the pipeline's point of view: the
//! document could not be obtained at all. Missing fields inside a fetched
//! document are never represented here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Connection failed: {url} - {message}")]
    Connect { url: String, message: String },

    #[error("HTTP request failed: {status} - {url}")]
    Status { status: u16, url: String, retry_after_seconds: Option<u64> },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("URL resolution failed: {url}")]
    InvalidUrl { url: String },
}

impl FetchError {
    /// Check if this error is worth retrying
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } | Self::Body { .. } => true,
            Self::Status { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            Self::InvalidUrl { .. } => false,
        }
    }

    /// Server-provided delay hint for 429/503 responses
    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::Status { retry_after_seconds, .. } => *retry_after_seconds,
            _ => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Status { url, .. }
            | Self::Body { url, .. }
            | Self::InvalidUrl { url } => url,
        }
    }

    pub(crate) fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { url: url.to_string() }
        } else if let Some(status) = error.status() {
            Self::Status {
                status: status.as_u16(),
                url: url.to_string(),
                retry_after_seconds: None,
            }
        } else if error.is_body() || error.is_decode() {
            Self::Body {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            Self::Connect {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
