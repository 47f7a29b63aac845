//! Network seam for the pipeline
//!
//! The pipeline only talks to the network through [`PageSource`], so tests can
//! substitute an in-memory implementation and count requests.

use async_trait::async_trait;

use super::fetch_error::FetchResult;

/// Binary asset returned by [`PageSource::fetch_asset`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    /// `Content-Type` header value, if the server sent one
    pub content_type: Option<String>,
}

/// Fetches documents and assets by absolute URL
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a document body as text
    async fn fetch_text(&self, url: &str) -> FetchResult<String>;

    /// Fetch a binary asset such as a card image
    async fn fetch_asset(&self, url: &str) -> FetchResult<FetchedAsset>;
}
