//! In-memory page source for application tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::infrastructure::{FetchError, FetchResult, FetchedAsset, PageSource};

/// Serves canned pages by URL and records every request
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<String, String>,
    assets: HashMap<String, FetchedAsset>,
    requests: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_asset(mut self, url: &str, bytes: &[u8]) -> Self {
        self.assets.insert(
            url.to_string(),
            FetchedAsset {
                bytes: bytes.to_vec(),
                content_type: Some("image/jpeg".to_string()),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::Status {
            status: 404,
            url: url.to_string(),
            retry_after_seconds: None,
        }
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch_text(&self, url: &str) -> FetchResult<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }

    async fn fetch_asset(&self, url: &str) -> FetchResult<FetchedAsset> {
        self.requests.lock().unwrap().push(url.to_string());
        self.assets.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }
}

/// Minimal detail page for a Pokémon card
pub fn detail_page(number: &str, name: &str, type_token: &str) -> String {
    format!(
        r#"<html><head><title>#{number} {name}</title></head><body>
        <table><tr><td><font size="2">{name}</font></td><td>{number}</td>
        <td><img src="/card/image/{type_token}.png"></td></tr></table></body></html>"#
    )
}
