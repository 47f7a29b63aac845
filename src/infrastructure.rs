//! Infrastructure layer: configuration, logging, network access, parsing and storage
//!
//! Everything that touches the outside world lives here. The application
//! layer only sees the [`PageSource`] seam, the parsers and the two on-disk
//! stores (image cache and dataset file).

pub mod config; // Configuration loading, constants and URL helpers
pub mod dataset_writer;
pub mod fetch_error;
pub mod http_client;
pub mod image_cache;
pub mod logging;
pub mod page_source;
pub mod parsing; // Selector-driven HTML extraction

// Re-export commonly used items
pub use config::{serebii, AppConfig, ConfigError};
pub use dataset_writer::{read_dataset, write_dataset, DatasetError, DATASET_HEADER};
pub use fetch_error::{FetchError, FetchResult};
pub use http_client::{HttpClient, HttpClientConfig};
pub use image_cache::{ImageCache, ImageOutcome};
pub use logging::{get_log_directory, init_logging_with_config};
pub use page_source::{FetchedAsset, PageSource};
pub use parsing::{CardDetailParser, ParsingConfig, ParsingError, ParsingResult, SetLandingParser, SetListingParser};
