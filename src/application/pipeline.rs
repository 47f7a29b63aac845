//! Acquisition pipeline orchestrator
//!
//! Set resolution -> card collection -> image caching -> dataset. The dataset
//! is written once, at the end, from the fully materialized record list.

#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::diagnostics::{Diagnostic, PipelineError, PipelineReport, Stage};
use super::numbering_resolver::NumberingResolver;
use super::set_resolver::SetResolver;
use crate::domain::CardRecord;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::parsing::{CardDetailParser, SetLandingParser, SetListingParser};
use crate::infrastructure::{write_dataset, ImageCache, ImageOutcome, PageSource};

/// Pipeline settings not owned by a single stage
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub base_url: String,
    pub default_set_id: String,
    pub cache_root: PathBuf,
    pub output_path: PathBuf,
    pub image_concurrency: usize,
    pub sort_by_number: bool,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            default_set_id: config.site.default_set_id.clone(),
            cache_root: config.cache.root.clone(),
            output_path: config.pipeline.output_path.clone(),
            image_concurrency: config.pipeline.image_concurrency,
            sort_by_number: config.pipeline.sort_by_number,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

#[derive(Debug, Default)]
struct ImageTally {
    hits: usize,
    fetched: usize,
    unavailable: usize,
}

/// Runs one set acquisition end to end
pub struct CardPipeline {
    source: Arc<dyn PageSource>,
    set_resolver: SetResolver,
    numbering_resolver: NumberingResolver,
    image_cache: ImageCache,
    settings: PipelineSettings,
}

impl CardPipeline {
    /// Build the pipeline with default parser configuration
    pub fn new(source: Arc<dyn PageSource>, settings: PipelineSettings) -> Result<Self, PipelineError> {
        let set_resolver = SetResolver::new(
            source.clone(),
            SetLandingParser::new()?,
            settings.base_url.clone(),
            settings.default_set_id.clone(),
        );
        let numbering_resolver = NumberingResolver::new(
            source.clone(),
            CardDetailParser::new()?,
            SetListingParser::new()?,
            settings.base_url.clone(),
        );
        let image_cache = ImageCache::new(settings.cache_root.clone(), settings.base_url.clone());

        Ok(Self {
            source,
            set_resolver,
            numbering_resolver,
            image_cache,
            settings,
        })
    }

    /// Acquire one set; only a fatal error or cancellation leaves no dataset behind
    pub async fn run(&self, set_reference: &str, cancel: CancellationToken) -> Result<PipelineReport, PipelineError> {
        info!("🚀 Starting card acquisition for '{}'", set_reference);

        let resolved = self.set_resolver.resolve(set_reference).await?;
        let mut diagnostics = resolved.diagnostics.clone();

        let collected = self.numbering_resolver.collect(&resolved, &cancel).await?;
        diagnostics.extend(collected.diagnostics);

        let set_id = resolved.descriptor.id.clone();
        let (mut records, tally) = self
            .cache_images(&set_id, collected.records, &cancel, &mut diagnostics)
            .await?;

        if self.settings.sort_by_number {
            // Stable: cards without a numeric position keep their relative order at the end
            records.sort_by_key(|record| record.numeric_position().unwrap_or(u32::MAX));
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let dataset_path = self.settings.output_path.clone();
        write_dataset(&dataset_path, &records).map_err(|source| PipelineError::Dataset {
            path: dataset_path.clone(),
            source,
        })?;

        let report = PipelineReport {
            set: resolved.descriptor,
            strategy: collected.strategy,
            records_written: records.len(),
            dropped_without_number: collected.dropped_without_number,
            image_hits: tally.hits,
            images_fetched: tally.fetched,
            images_unavailable: tally.unavailable,
            diagnostics,
            dataset_path,
        };

        info!(
            "🎉 Set {} done: {} cards written, images {} cached / {} fetched / {} unavailable, {} diagnostics",
            report.set.id,
            report.records_written,
            report.image_hits,
            report.images_fetched,
            report.images_unavailable,
            report.diagnostics.len()
        );
        Ok(report)
    }

    /// Materialize every record's image through a bounded, order-preserving pool
    async fn cache_images(
        &self,
        set_id: &str,
        records: Vec<CardRecord>,
        cancel: &CancellationToken,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(Vec<CardRecord>, ImageTally), PipelineError> {
        let width = self.settings.image_concurrency.max(1);
        info!("🖼️ Caching {} card images (concurrency {})", records.len(), width);

        let outcomes: Vec<(CardRecord, Option<ImageOutcome>)> = stream::iter(records)
            .map(|record| async move {
                if cancel.is_cancelled() {
                    return (record, None);
                }
                let outcome = self
                    .image_cache
                    .materialize(
                        self.source.as_ref(),
                        record.image_url.as_deref(),
                        set_id,
                        &record.number,
                        &record.name,
                    )
                    .await;
                (record, Some(outcome))
            })
            .buffered(width)
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut tally = ImageTally::default();
        let mut records = Vec::with_capacity(outcomes.len());
        for (mut record, outcome) in outcomes {
            match outcome {
                Some(ImageOutcome::Hit(path)) => {
                    tally.hits += 1;
                    record.local_image_path = Some(path.to_string_lossy().into_owned());
                }
                Some(ImageOutcome::Fetched(path)) => {
                    tally.fetched += 1;
                    record.local_image_path = Some(path.to_string_lossy().into_owned());
                }
                Some(ImageOutcome::Unavailable { cause }) => {
                    tally.unavailable += 1;
                    diagnostics.push(Diagnostic::emit(record.number.clone(), Stage::ImageCache, cause));
                }
                None => return Err(PipelineError::Cancelled),
            }
            records.push(record);
        }
        Ok((records, tally))
    }
}
