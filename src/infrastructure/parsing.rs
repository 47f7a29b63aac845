//! HTML parsing for card pages
//!
//! Trait-based parsers built from selector configuration. Parser construction
//! can fail on an invalid selector; extraction itself never fails and degrades
//! to default field values instead.

pub mod card_detail_parser;
pub mod config;
pub mod context;
pub mod error;
pub mod markup;
pub mod set_landing_parser;
pub mod set_listing_parser;

// Re-export public types
pub use card_detail_parser::CardDetailParser;
pub use config::ParsingConfig;
pub use context::{DetailParseContext, ListingParseContext};
pub use error::{ParsingError, ParsingResult};
pub use set_landing_parser::{ReferenceKind, ResolvedReference, SetLandingParser};
pub use set_listing_parser::{RowSkip, SetListing, SetListingParser, SkippedRow};

use scraper::Html;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> Self::Output;
}
