//! Set listing table parser
//!
//! Used when the landing page gives no card count. Every listing row carries
//! the number and rarity in its first cell, the detail link in the second,
//! the name in the third and an inline detail table (HP, type, weakness,
//! resistance, retreat) in the fourth.

#![allow(clippy::uninlined_format_args)]

use regex::NoExpand;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::context::ListingParseContext;
use super::error::ParsingResult;
use super::markup::{self, element_text, elements_after, find_text, image_sources, next_element_sibling, MarkupPatterns};
use super::ContextualParser;
use crate::domain::card::{rarity_from_token, CardRecord};
use crate::domain::numbering::CardIdentifier;
use crate::infrastructure::config::utils::resolve_url;

/// Rarity label used when a row has no rarity icon
pub const UNKNOWN_RARITY: &str = "Unknown";

/// Minimum cells a listing row needs to be considered
const MIN_ROW_CELLS: usize = 4;

/// Why a listing row produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSkip {
    TooFewCells { found: usize },
    NoCardNumber { text: String },
}

impl std::fmt::Display for RowSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewCells { found } => write!(f, "row has {} cells, expected at least {}", found, MIN_ROW_CELLS),
            Self::NoCardNumber { text } => write!(f, "no card number in '{}'", text),
        }
    }
}

/// A listing row that was passed over; `position` is 1-based, header excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub position: usize,
    pub reason: RowSkip,
}

/// Result of parsing a listing page
#[derive(Debug, Clone, Default)]
pub struct SetListing {
    pub table_found: bool,
    pub records: Vec<CardRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Parser for the set landing page listing table
pub struct SetListingParser {
    table_selector: Selector,
    row_selector: Selector,
    cell_selector: Selector,
    link_selector: Selector,
    name_font_selector: Selector,
    label_selector: Selector,
    image_selector: Selector,
    patterns: MarkupPatterns,
}

impl SetListingParser {
    pub fn new() -> ParsingResult<Self> {
        let config = super::config::ParsingConfig::default();
        Self::with_config(&config.set_listing_selectors)
    }

    pub fn with_config(selectors: &super::config::SetListingSelectors) -> ParsingResult<Self> {
        Ok(Self {
            table_selector: markup::compile_selector(&selectors.table)?,
            row_selector: markup::compile_selector(&selectors.row)?,
            cell_selector: markup::compile_selector(&selectors.cell)?,
            link_selector: markup::compile_selector(&selectors.link)?,
            name_font_selector: markup::compile_selector(&selectors.name_font)?,
            label_selector: markup::compile_selector(&selectors.label)?,
            image_selector: markup::compile_selector(&selectors.image)?,
            patterns: MarkupPatterns::compile()?,
        })
    }

    #[must_use]
    pub fn parse_str(&self, html: &str, context: &ListingParseContext) -> SetListing {
        self.parse_with_context(&Html::parse_document(html), context)
    }

    /// Direct child rows of the table, or every nested row when there are none
    fn listing_rows<'a>(&self, table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let direct: Vec<_> = table
            .children()
            .filter_map(ElementRef::wrap)
            .flat_map(|child| match child.value().name() {
                "tr" => vec![child],
                // html5ever wraps rows in an implicit tbody
                "tbody" | "thead" => child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|row| row.value().name() == "tr")
                    .collect(),
                _ => Vec::new(),
            })
            .collect();

        if direct.len() > 1 {
            direct
        } else {
            debug!("Listing table has no direct rows, using all nested rows");
            table.select(&self.row_selector).collect()
        }
    }

    fn parse_row(&self, row: ElementRef<'_>, context: &ListingParseContext) -> Result<CardRecord, RowSkip> {
        let cells: Vec<_> = row.select(&self.cell_selector).collect();
        if cells.len() < MIN_ROW_CELLS {
            return Err(RowSkip::TooFewCells { found: cells.len() });
        }

        let number_text = element_text(cells[0]);
        let number: String = self
            .patterns
            .card_number
            .captures(&number_text)
            .and_then(|captures| captures.get(1))
            .map(|number| number.as_str().chars().filter(|c| !c.is_whitespace()).collect())
            .ok_or_else(|| RowSkip::NoCardNumber { text: number_text.clone() })?;

        let mut record = CardRecord {
            number,
            ..CardRecord::default()
        };

        (record.rarity, record.holographic) = self.row_rarity(cells[0]);
        record.detail_url = Some(self.detail_url(cells[1], &record, context));
        record.name = self.row_name(cells[2]);

        let detail_cell = cells[3];
        let detail_text: String = detail_cell.text().collect();
        record.hp = self
            .patterns
            .hp
            .captures(&detail_text)
            .and_then(|captures| captures.get(1))
            .map(|hp| hp.as_str().to_string());

        match self.primary_type(row, detail_cell) {
            Some(token) => record.set_primary_type(&token),
            None => record.classify_as_trainer(),
        }

        self.apply_labeled_cells(detail_cell, &mut record);
        Ok(record)
    }

    fn row_rarity(&self, cell: ElementRef<'_>) -> (String, bool) {
        cell.select(&self.image_selector)
            .filter_map(|img| img.value().attr("src"))
            .find_map(|src| self.patterns.icon_token(src))
            .map_or_else(|| (UNKNOWN_RARITY.to_string(), false), |token| rarity_from_token(&token))
    }

    /// Link from the row rewritten onto the resolved set, else the constructed primary URL
    fn detail_url(&self, cell: ElementRef<'_>, record: &CardRecord, context: &ListingParseContext) -> String {
        let linked = cell
            .select(&self.link_selector)
            .find_map(|link| link.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(|href| {
                self.patterns
                    .set_url
                    .replace(href, NoExpand(&format!("/card/{}/", context.set_id)))
                    .into_owned()
            })
            .and_then(|href| resolve_url(&context.base_url, &href));

        linked.unwrap_or_else(|| {
            let index = record.numeric_position().unwrap_or(1);
            let path = CardIdentifier::primary(index).detail_path(&context.set_id);
            resolve_url(&context.base_url, &path).unwrap_or(path)
        })
    }

    fn row_name(&self, cell: ElementRef<'_>) -> String {
        match cell.select(&self.link_selector).next() {
            Some(link) => link
                .select(&self.name_font_selector)
                .next()
                .map_or_else(|| element_text(link), element_text),
            None => element_text(cell),
        }
    }

    /// First type icon after the HP text of the detail cell
    fn primary_type(&self, row: ElementRef<'_>, detail_cell: ElementRef<'_>) -> Option<String> {
        let (_, parent) = find_text(detail_cell, &self.patterns.hp)?;
        image_sources(elements_after(row, parent)).find_map(|src| self.patterns.type_token(src))
    }

    /// `<b>` labels whose enclosing cell is followed by the cell holding the icons
    fn apply_labeled_cells(&self, detail_cell: ElementRef<'_>, record: &mut CardRecord) {
        for label in detail_cell.select(&self.label_selector) {
            let text = element_text(label).to_lowercase();
            let Some(value_cell) = enclosing_cell(label).and_then(next_element_sibling) else {
                continue;
            };
            let mut icons = value_cell
                .select(&self.image_selector)
                .filter_map(|img| img.value().attr("src"));

            match text.as_str() {
                "weakness" => {
                    if let Some(token) = icons.next().and_then(|src| self.patterns.icon_token(src)) {
                        record.weakness = vec![token];
                    }
                }
                "resistance" => {
                    if let Some(token) = icons.next().and_then(|src| self.patterns.icon_token(src)) {
                        record.resistance = vec![token];
                    }
                }
                "retreat cost" => {
                    let colorless = icons
                        .filter(|src| self.patterns.icon_token(src).as_deref() == Some(markup::COLORLESS_TOKEN))
                        .count();
                    record.retreat_cost = u32::try_from(colorless).unwrap_or(u32::MAX);
                }
                _ => {}
            }
        }
    }
}

fn enclosing_cell(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "td")
}

impl ContextualParser for SetListingParser {
    type Output = SetListing;
    type Context = ListingParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> Self::Output {
        let Some(table) = html.select(&self.table_selector).next() else {
            warn!("No listing table found for set {}", context.set_id);
            return SetListing::default();
        };

        let mut listing = SetListing {
            table_found: true,
            ..SetListing::default()
        };

        let rows = self.listing_rows(table);
        debug!("Listing table for {} has {} rows (including header)", context.set_id, rows.len());

        for (position, row) in rows.into_iter().skip(1).enumerate() {
            match self.parse_row(row, context) {
                Ok(record) => {
                    debug!("Parsed listing row {}: {} '{}'", position + 1, record.number, record.name);
                    listing.records.push(record);
                }
                Err(reason) => {
                    debug!("Skipping listing row {}: {}", position + 1, reason);
                    listing.skipped.push(SkippedRow {
                        position: position + 1,
                        reason,
                    });
                }
            }
        }

        listing
    }
}
