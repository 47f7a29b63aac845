//! Run diagnostics, errors and the final report
//!
//! Only [`PipelineError`] crosses the orchestrator boundary. Everything that
//! merely degrades the run becomes a [`Diagnostic`] in the report.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::SetDescriptor;
use crate::infrastructure::{ConfigError, DatasetError, FetchError, ParsingError};

/// Pipeline stage a diagnostic was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    SetResolution,
    DetailFetch,
    SchemeSwitch,
    Acceptance,
    ListingRow,
    ImageCache,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetResolution => "set_resolution",
            Self::DetailFetch => "detail_fetch",
            Self::SchemeSwitch => "scheme_switch",
            Self::Acceptance => "acceptance",
            Self::ListingRow => "listing_row",
            Self::ImageCache => "image_cache",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem, tied to the item it affected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Card identifier, number, row position or set id
    pub identifier: String,
    pub stage: Stage,
    pub cause: String,
}

impl Diagnostic {
    /// Build a diagnostic and emit it as a structured warning
    pub fn emit(identifier: impl Into<String>, stage: Stage, cause: impl Into<String>) -> Self {
        let diagnostic = Self {
            identifier: identifier.into(),
            stage,
            cause: cause.into(),
        };
        warn!(
            identifier = %diagnostic.identifier,
            stage = %diagnostic.stage,
            cause = %diagnostic.cause,
            "⚠️ Non-fatal pipeline issue"
        );
        diagnostic
    }
}

/// How the card list was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStrategy {
    /// Detail pages addressed by number; `switched_at_index` when `H<n>` took over
    RangeDriven { expected_count: u32, switched_at_index: Option<u32> },
    /// Listing table on the landing page
    TableDriven,
}

/// Fatal errors; any of these means no dataset was written
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to fetch set landing page {url}: {source}")]
    LandingPage {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to write dataset {}: {source}", path.display())]
    Dataset {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },

    #[error("Parser setup failed: {0}")]
    Parser(#[from] ParsingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run cancelled before the dataset was written")]
    Cancelled,
}

/// Summary of one acquisition run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub set: SetDescriptor,
    pub strategy: FetchStrategy,
    pub records_written: usize,
    pub dropped_without_number: usize,
    pub image_hits: usize,
    pub images_fetched: usize,
    pub images_unavailable: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub dataset_path: PathBuf,
}

impl PipelineReport {
    /// Diagnostics raised in one stage
    pub fn diagnostics_in(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |diagnostic| diagnostic.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_with_stage_names() {
        let report = PipelineReport {
            set: SetDescriptor::new("journeytogether", "https://www.serebii.net/card/journeytogether/", Some(3)),
            strategy: FetchStrategy::RangeDriven {
                expected_count: 3,
                switched_at_index: Some(2),
            },
            records_written: 2,
            dropped_without_number: 0,
            image_hits: 1,
            images_fetched: 1,
            images_unavailable: 0,
            diagnostics: vec![Diagnostic::emit("002", Stage::SchemeSwitch, "HTTP request failed: 404")],
            dataset_path: PathBuf::from("data/pokemon_cards_data.csv"),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnostics"][0]["stage"], "SchemeSwitch");
        assert_eq!(json["set"]["expectedCount"], 3);
        assert_eq!(report.diagnostics_in(Stage::SchemeSwitch).count(), 1);
        assert_eq!(report.diagnostics_in(Stage::ImageCache).count(), 0);
    }

    #[test]
    fn landing_page_error_names_url() {
        let error = PipelineError::LandingPage {
            url: "https://www.serebii.net/card/x/".to_string(),
            source: FetchError::Timeout {
                url: "https://www.serebii.net/card/x/".to_string(),
            },
        };
        assert!(error.to_string().contains("https://www.serebii.net/card/x/"));
    }
}
