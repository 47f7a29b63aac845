//! Configuration infrastructure
//!
//! Layered configuration for the card acquisition pipeline:
//! 1. Built-in defaults (see [`defaults`])
//! 2. Optional config file (TOML/JSON/YAML, picked by extension)
//! 3. Environment variables prefixed with `CARD_HARVEST`, `__` as separator
//!    (e.g. `CARD_HARVEST_HTTP__TIMEOUT_SECONDS=10`)

#![allow(clippy::uninlined_format_args)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Source site settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL used to resolve relative detail, listing and image links
    pub base_url: String,

    /// Set used when a reference cannot be matched to a set URL
    pub default_set_id: String,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Descriptive client identifier sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds (must be finite and non-zero)
    pub timeout_seconds: u64,

    /// Retries for transient failures; 0 means a failure is final
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries
    pub retry_base_delay_ms: u64,

    /// Politeness limiter, 0 disables it
    pub max_requests_per_second: u32,

    pub follow_redirects: bool,
}

/// Image cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory; images land in `<root>/<set_id>/`
    pub root: PathBuf,
}

/// Pipeline orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset CSV destination
    pub output_path: PathBuf,

    /// Width of the bounded image download pool
    pub image_concurrency: usize,

    /// Sort records by card number before writing
    pub sort_by_number: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for the log file; defaults to `<data_local_dir>/card-harvest/logs`
    pub log_dir: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: serebii::BASE_URL.to_string(),
            default_set_id: serebii::DEFAULT_SET_ID.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            retry_base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            follow_redirects: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: defaults::cache_root(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(defaults::DATASET_PATH),
            image_concurrency: defaults::IMAGE_CONCURRENCY,
            sort_by_number: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    Validation { message: String },
}

impl AppConfig {
    /// Loads defaults, then the optional file, then `CARD_HARVEST_*` env vars
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let built_in = config::Config::try_from(&Self::default())?;
        let mut builder = config::Config::builder().add_source(built_in);

        if let Some(path) = path {
            info!("Loading configuration from: {:?}", path);
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "http.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "http.user_agent must not be empty".to_string(),
            });
        }

        if self.pipeline.image_concurrency == 0 {
            return Err(ConfigError::Validation {
                message: "pipeline.image_concurrency must be greater than 0".to_string(),
            });
        }

        match url::Url::parse(&self.site.base_url) {
            Ok(parsed) if parsed.has_host() => {}
            _ => {
                return Err(ConfigError::Validation {
                    message: format!("site.base_url must be an absolute URL, got '{}'", self.site.base_url),
                });
            }
        }

        if self.site.default_set_id.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "site.default_set_id must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Serebii card section URLs and identifiers
pub mod serebii {
    /// Base URL for the Serebii website
    pub const BASE_URL: &str = "https://www.serebii.net";

    /// Set used when a reference does not name one
    pub const DEFAULT_SET_ID: &str = "journeytogether";

    /// Landing page path for a set, relative to [`BASE_URL`]
    #[must_use]
    pub fn set_landing_path(set_id: &str) -> String {
        format!("/card/{set_id}/")
    }
}

/// Default configuration values
pub mod defaults {
    use std::path::PathBuf;

    /// Environment variable prefix for overrides
    pub const ENV_PREFIX: &str = "CARD_HARVEST";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default retry attempts for transient failures
    pub const MAX_RETRIES: u32 = 0;

    /// Default base retry delay in milliseconds
    pub const RETRY_BASE_DELAY_MS: u64 = 500;

    /// Default politeness limit
    pub const MAX_REQUESTS_PER_SECOND: u32 = 5;

    /// Default width of the image download pool
    pub const IMAGE_CONCURRENCY: usize = 4;

    /// Default dataset location
    pub const DATASET_PATH: &str = "data/pokemon_cards_data.csv";

    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;

    /// Application directory name under the platform data dir
    pub const APP_DIR_NAME: &str = "card-harvest";

    #[must_use]
    pub fn user_agent() -> String {
        format!("card-harvest/{} (+card dataset builder)", env!("CARGO_PKG_VERSION"))
    }

    /// `<data_local_dir>/card-harvest/images`, or `./images` when unavailable
    #[must_use]
    pub fn cache_root() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join("images"))
            .unwrap_or_else(|| PathBuf::from("images"))
    }

    /// `<data_local_dir>/card-harvest/logs`, or `./logs` when unavailable
    #[must_use]
    pub fn log_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }
}

/// URL building helper functions
pub mod utils {
    use url::Url;

    /// Resolve a possibly relative reference against the base URL
    ///
    /// Absolute references are returned as-is; `None` when either side is malformed.
    #[must_use]
    pub fn resolve_url(base_url: &str, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Ok(absolute) = Url::parse(reference) {
            return Some(absolute.to_string());
        }
        let base = Url::parse(base_url).ok()?;
        base.join(reference).ok().map(|joined| joined.to_string())
    }
}
