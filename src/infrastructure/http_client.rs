//! HTTP client for card page and image fetching
//!
//! Wraps `reqwest` with a finite timeout, a descriptive user agent, an
//! optional politeness limiter and a bounded retry policy for transient
//! failures (timeouts, connection errors, 408/429/5xx).

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use governor::{clock::DefaultClock, state::{direct::NotKeyed, InMemoryState}, Quota, RateLimiter};
use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder, Response};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::config::HttpConfig;
use super::fetch_error::{FetchError, FetchResult};
use super::page_source::{FetchedAsset, PageSource};

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum requests per second, 0 disables limiting
    pub max_requests_per_second: u32,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// First backoff delay; doubled on every further attempt
    pub retry_base_delay: Duration,
    /// User agent string
    pub user_agent: String,
    /// Whether to follow redirects
    pub follow_redirects: bool,
}

impl HttpClientConfig {
    /// Create HttpClientConfig from the `[http]` config section
    #[must_use]
    pub fn from_http_config(http: &HttpConfig) -> Self {
        Self {
            max_requests_per_second: http.max_requests_per_second,
            timeout_seconds: http.timeout_seconds,
            max_retries: http.max_retries,
            retry_base_delay: Duration::from_millis(http.retry_base_delay_ms),
            user_agent: http.user_agent.clone(),
            follow_redirects: http.follow_redirects,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_http_config(&HttpConfig::default())
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP client with built-in rate limiting and retry handling
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    rate_limiter: Option<Arc<DirectLimiter>>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .gzip(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Single GET without retries; non-2xx statuses become errors
    async fn send_once(&self, url: &str) -> FetchResult<Response> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!("🌐 HTTP GET: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_seconds = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                retry_after_seconds,
            });
        }

        Ok(response)
    }

    async fn fetch_text_once(&self, url: &str) -> FetchResult<String> {
        let response = self.send_once(url).await?;
        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_asset_once(&self, url: &str) -> FetchResult<FetchedAsset> {
        let response = self.send_once(url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    /// Runs `attempt` until it succeeds, fails permanently, or retries run out
    async fn with_retry<T, F, Fut>(&self, url: &str, attempt: F) -> FetchResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        Url::parse(url).map_err(|_| FetchError::InvalidUrl { url: url.to_string() })?;

        let mut tries = 0u32;
        loop {
            match attempt().await {
                Ok(value) => {
                    if tries > 0 {
                        info!("Successfully fetched {} on attempt {}", url, tries + 1);
                    }
                    return Ok(value);
                }
                Err(error) if error.is_retryable() && tries < self.config.max_retries => {
                    let backoff = self
                        .config
                        .retry_base_delay
                        .checked_mul(2_u32.saturating_pow(tries))
                        .unwrap_or(Duration::MAX);
                    let delay = error
                        .retry_after_seconds()
                        .map_or(backoff, |hint| backoff.max(Duration::from_secs(hint)));
                    warn!(
                        "Failed to fetch {} (attempt {}), retrying in {:?}: {}",
                        url,
                        tries + 1,
                        delay,
                        error
                    );
                    sleep(delay).await;
                    tries += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_text(&self, url: &str) -> FetchResult<String> {
        self.with_retry(url, || self.fetch_text_once(url)).await
    }

    async fn fetch_asset(&self, url: &str) -> FetchResult<FetchedAsset> {
        self.with_retry(url, || self.fetch_asset_once(url)).await
    }
}
