//! Set landing page parser
//!
//! Resolves a set reference to its identifier and landing URL, and reads the
//! advertised card count from the landing page. Both steps are best effort.

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::context::ListingParseContext;
use super::error::ParsingResult;
use super::markup::{self, element_text, elements_after, find_text, MarkupPatterns};
use super::ContextualParser;
use crate::infrastructure::config::{serebii, utils::resolve_url};

/// Where a set reference was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Url,
    BareId,
    Default,
}

/// Set identifier and landing page derived from a reference, before any fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub set_id: String,
    pub landing_url: String,
    pub kind: ReferenceKind,
}

pub struct SetLandingParser {
    heading_selector: Selector,
    paragraph_selector: Selector,
    count_label: Regex,
    patterns: MarkupPatterns,
}

impl SetLandingParser {
    pub fn new() -> ParsingResult<Self> {
        let config = super::config::ParsingConfig::default();
        Self::with_config(&config.set_landing_selectors)
    }

    pub fn with_config(selectors: &super::config::SetLandingSelectors) -> ParsingResult<Self> {
        let label = r"(?i)Amount of Cards";
        Ok(Self {
            heading_selector: markup::compile_selector(&selectors.heading)?,
            paragraph_selector: markup::compile_selector(&selectors.paragraph)?,
            count_label: Regex::new(label).map_err(|e| super::ParsingError::invalid_pattern(label, e))?,
            patterns: MarkupPatterns::compile()?,
        })
    }

    /// Derive the set id from a URL, a bare id, or fall back to `default_set_id`
    #[must_use]
    pub fn resolve_reference(&self, reference: &str, base_url: &str, default_set_id: &str) -> ResolvedReference {
        let reference = reference.trim();

        if let Some(set_id) = self
            .patterns
            .set_url
            .captures(reference)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string())
        {
            let landing_url = resolve_url(base_url, reference).unwrap_or_else(|| reference.to_string());
            return ResolvedReference {
                set_id,
                landing_url,
                kind: ReferenceKind::Url,
            };
        }

        if self.patterns.bare_set_id.is_match(reference) {
            return ResolvedReference {
                set_id: reference.to_string(),
                landing_url: landing_url(base_url, reference),
                kind: ReferenceKind::BareId,
            };
        }

        debug!("Set reference '{}' not recognised, using default set {}", reference, default_set_id);
        ResolvedReference {
            set_id: default_set_id.to_string(),
            landing_url: landing_url(base_url, default_set_id),
            kind: ReferenceKind::Default,
        }
    }

    #[must_use]
    pub fn parse_str(&self, html: &str, context: &ListingParseContext) -> Option<u32> {
        self.parse_with_context(&Html::parse_document(html), context)
    }

    fn count_in(&self, text: &str) -> Option<u32> {
        self.patterns
            .card_count
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|count| count.as_str().parse().ok())
            .filter(|count| *count > 0)
    }

    /// Count from the text node carrying the label
    fn labeled_count(&self, html: &Html) -> Option<u32> {
        let (text, _) = find_text(html.root_element(), &self.count_label)?;
        self.count_in(text)
    }

    /// Count from the first paragraph following the primary heading
    fn heading_paragraph_count(&self, html: &Html) -> Option<u32> {
        let root = html.root_element();
        let heading = html.select(&self.heading_selector).next()?;
        let paragraph = elements_after(root, heading).find(|element| self.paragraph_selector.matches(element))?;
        self.count_in(&element_text(paragraph))
    }
}

fn landing_url(base_url: &str, set_id: &str) -> String {
    let path = serebii::set_landing_path(set_id);
    resolve_url(base_url, &path).unwrap_or(path)
}

impl ContextualParser for SetLandingParser {
    type Output = Option<u32>;
    type Context = ListingParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> Self::Output {
        let count = self
            .labeled_count(html)
            .or_else(|| self.heading_paragraph_count(html));
        debug!("Detected card count for {}: {:?}", context.set_id, count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const BASE: &str = "https://www.serebii.net";

    fn parser() -> SetLandingParser {
        SetLandingParser::new().unwrap()
    }

    #[rstest]
    #[case("https://www.serebii.net/card/journeytogether/", "journeytogether", ReferenceKind::Url)]
    #[case("https://www.serebii.net/card/Surgingsparks", "Surgingsparks", ReferenceKind::Url)]
    #[case("/card/prismaticevolutions/", "prismaticevolutions", ReferenceKind::Url)]
    #[case("stellarcrown", "stellarcrown", ReferenceKind::BareId)]
    #[case("not a set!", "journeytogether", ReferenceKind::Default)]
    fn resolves_references(#[case] reference: &str, #[case] set_id: &str, #[case] kind: ReferenceKind) {
        let resolved = parser().resolve_reference(reference, BASE, "journeytogether");
        assert_eq!(resolved.set_id, set_id);
        assert_eq!(resolved.kind, kind);
        assert!(resolved.landing_url.starts_with("https://www.serebii.net/card/"));
    }

    #[test]
    fn bare_id_builds_landing_url() {
        let resolved = parser().resolve_reference("stellarcrown", BASE, "journeytogether");
        assert_eq!(resolved.landing_url, "https://www.serebii.net/card/stellarcrown/");
    }

    fn count(html: &str) -> Option<u32> {
        parser().parse_str(html, &ListingParseContext::new("journeytogether", BASE))
    }

    #[test]
    fn count_from_label_text() {
        assert_eq!(count("<table><tr><td>Amount of Cards: 190</td></tr></table>"), Some(190));
    }

    #[test]
    fn count_from_paragraph_after_heading() {
        let html = "<h1>Journey Together</h1><p>Amount of Cards: <b>190</b></p>";
        assert_eq!(count(html), Some(190));
    }

    #[test]
    fn missing_count_is_not_an_error() {
        assert_eq!(count("<h1>Journey Together</h1><p>Released 2025</p>"), None);
        assert_eq!(count("<p>Amount of Cards: 0</p>"), None);
    }
}
