//! Card collection strategies
//!
//! With a known card count, detail pages are walked by number and the cursor
//! switches to `H<n>` identifiers at the first hard failure. Without a count,
//! the landing page listing table is parsed instead.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::diagnostics::{Diagnostic, FetchStrategy, PipelineError, Stage};
use super::set_resolver::ResolvedSet;
use crate::domain::{CardIdentifier, CardRecord, FailureOutcome, NumberingCursor};
use crate::infrastructure::config::utils::resolve_url;
use crate::infrastructure::parsing::{CardDetailParser, DetailParseContext, ListingParseContext, SetListingParser};
use crate::infrastructure::PageSource;

/// Records gathered for one set, in fetch order
#[derive(Debug, Clone)]
pub struct CollectedCards {
    pub records: Vec<CardRecord>,
    pub strategy: FetchStrategy,
    /// Identifiers requested, in order, including failed ones (range-driven only)
    pub visited: Vec<CardIdentifier>,
    /// Identifiers whose detail page was fetched
    pub fetched: Vec<CardIdentifier>,
    pub dropped_without_number: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectedCards {
    fn new(strategy: FetchStrategy) -> Self {
        Self {
            records: Vec::new(),
            strategy,
            visited: Vec::new(),
            fetched: Vec::new(),
            dropped_without_number: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Acceptance gate: only records with a card number are kept
    fn accept(&mut self, record: CardRecord, identifier: &str) {
        if record.is_acceptable() {
            debug!("Accepted card {} '{}'", record.number, record.name);
            self.records.push(record);
        } else {
            self.dropped_without_number += 1;
            self.diagnostics
                .push(Diagnostic::emit(identifier, Stage::Acceptance, "record has no card number"));
        }
    }
}

pub struct NumberingResolver {
    source: Arc<dyn PageSource>,
    detail_parser: CardDetailParser,
    listing_parser: SetListingParser,
    base_url: String,
}

impl NumberingResolver {
    pub fn new(
        source: Arc<dyn PageSource>,
        detail_parser: CardDetailParser,
        listing_parser: SetListingParser,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            detail_parser,
            listing_parser,
            base_url: base_url.into(),
        }
    }

    /// Collect the set's cards with the strategy its descriptor calls for
    pub async fn collect(&self, set: &ResolvedSet, cancel: &CancellationToken) -> Result<CollectedCards, PipelineError> {
        match set.descriptor.range_count() {
            Some(count) => self.collect_range(&set.descriptor.id, count, cancel).await,
            None => {
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                Ok(self.collect_table(&set.descriptor.id, &set.landing_html))
            }
        }
    }

    /// Walk `1..=expected_count`, switching to `H<n>` at the first hard failure
    pub async fn collect_range(
        &self,
        set_id: &str,
        expected_count: u32,
        cancel: &CancellationToken,
    ) -> Result<CollectedCards, PipelineError> {
        info!("📋 Fetching {} detail pages for set {}", expected_count, set_id);
        let mut cursor = NumberingCursor::new(expected_count);
        let mut collected = CollectedCards::new(FetchStrategy::RangeDriven {
            expected_count,
            switched_at_index: None,
        });

        while let Some(identifier) = cursor.current() {
            if cancel.is_cancelled() {
                info!("Cancellation requested at {}", identifier);
                return Err(PipelineError::Cancelled);
            }

            let path = identifier.detail_path(set_id);
            let url = resolve_url(&self.base_url, &path).unwrap_or(path);
            collected.visited.push(identifier);

            match self.source.fetch_text(&url).await {
                Ok(body) => {
                    collected.fetched.push(identifier);
                    let context = DetailParseContext::new(url.clone(), set_id, self.base_url.clone());
                    match self.detail_parser.parse_str(&body, &context) {
                        Some(record) => collected.accept(record, &identifier.to_string()),
                        None => {
                            collected.dropped_without_number += 1;
                            collected.diagnostics.push(Diagnostic::emit(
                                identifier.to_string(),
                                Stage::Acceptance,
                                format!("no card data at {}", url),
                            ));
                        }
                    }
                    cursor.advance();
                }
                Err(e) => match cursor.record_failure() {
                    FailureOutcome::SchemeSwitched { at_index } => {
                        collected.diagnostics.push(Diagnostic::emit(
                            identifier.to_string(),
                            Stage::SchemeSwitch,
                            format!("{}; switching to H{} numbering", e, at_index),
                        ));
                    }
                    FailureOutcome::Skipped { .. } => {
                        collected
                            .diagnostics
                            .push(Diagnostic::emit(identifier.to_string(), Stage::DetailFetch, e.to_string()));
                    }
                },
            }
        }

        collected.strategy = FetchStrategy::RangeDriven {
            expected_count,
            switched_at_index: cursor.switched_at_index(),
        };
        info!(
            "✅ Collected {} cards for {} ({} dropped)",
            collected.records.len(),
            set_id,
            collected.dropped_without_number
        );
        Ok(collected)
    }

    /// Parse the landing page listing table
    #[must_use]
    pub fn collect_table(&self, set_id: &str, landing_html: &str) -> CollectedCards {
        info!("📋 Parsing listing table for set {}", set_id);
        let mut collected = CollectedCards::new(FetchStrategy::TableDriven);
        let context = ListingParseContext::new(set_id, self.base_url.clone());
        let listing = self.listing_parser.parse_str(landing_html, &context);

        if !listing.table_found {
            collected.diagnostics.push(Diagnostic::emit(
                set_id,
                Stage::SetResolution,
                "landing page has neither a card count nor a listing table",
            ));
        }

        for skipped in listing.skipped {
            collected.diagnostics.push(Diagnostic::emit(
                format!("row {}", skipped.position),
                Stage::ListingRow,
                skipped.reason.to_string(),
            ));
        }

        for record in listing.records {
            let identifier = record.number.clone();
            collected.accept(record, &identifier);
        }

        info!("✅ Collected {} cards from listing table for {}", collected.records.len(), set_id);
        collected
    }
}
