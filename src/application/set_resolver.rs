//! Set resolution: reference -> identifier, landing page and card count

use std::sync::Arc;

use tracing::info;

use super::diagnostics::{Diagnostic, PipelineError, Stage};
use crate::domain::SetDescriptor;
use crate::infrastructure::parsing::{ListingParseContext, ReferenceKind, SetLandingParser};
use crate::infrastructure::PageSource;

/// A resolved set together with the landing page it was read from
#[derive(Debug, Clone)]
pub struct ResolvedSet {
    pub descriptor: SetDescriptor,
    /// Landing page body, reused by the table-driven strategy
    pub landing_html: String,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct SetResolver {
    source: Arc<dyn PageSource>,
    parser: SetLandingParser,
    base_url: String,
    default_set_id: String,
}

impl SetResolver {
    pub fn new(
        source: Arc<dyn PageSource>,
        parser: SetLandingParser,
        base_url: impl Into<String>,
        default_set_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            parser,
            base_url: base_url.into(),
            default_set_id: default_set_id.into(),
        }
    }

    /// Resolve a set URL or bare id; fails only when the landing page cannot be fetched
    pub async fn resolve(&self, reference: &str) -> Result<ResolvedSet, PipelineError> {
        let mut diagnostics = Vec::new();
        let resolved = self
            .parser
            .resolve_reference(reference, &self.base_url, &self.default_set_id);

        if resolved.kind == ReferenceKind::Default {
            diagnostics.push(Diagnostic::emit(
                reference,
                Stage::SetResolution,
                format!("unrecognised set reference, using default set '{}'", resolved.set_id),
            ));
        }

        info!("🔍 Resolving set {} from {}", resolved.set_id, resolved.landing_url);
        let landing_html = self
            .source
            .fetch_text(&resolved.landing_url)
            .await
            .map_err(|source| PipelineError::LandingPage {
                url: resolved.landing_url.clone(),
                source,
            })?;

        let context = ListingParseContext::new(resolved.set_id.clone(), self.base_url.clone());
        let expected_count = self.parser.parse_str(&landing_html, &context);
        match expected_count {
            Some(count) => info!("Set {} advertises {} cards", resolved.set_id, count),
            None => diagnostics.push(Diagnostic::emit(
                resolved.set_id.clone(),
                Stage::SetResolution,
                "no card count on landing page, using listing table",
            )),
        }

        Ok(ResolvedSet {
            descriptor: SetDescriptor::new(resolved.set_id, resolved.landing_url, expected_count),
            landing_html,
            diagnostics,
        })
    }
}
