//! Card Harvest - trading card set acquisition
//!
//! Resolves a card set, walks its detail pages (or its listing table),
//! caches card images on disk and writes a fixed-schema CSV dataset.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the entry points used by the binary and integration tests
pub use application::{CardPipeline, PipelineError, PipelineReport, PipelineSettings};
pub use domain::{CardRecord, SetDescriptor};
pub use infrastructure::{AppConfig, HttpClient, HttpClientConfig};
