//! Parsing configuration for card page extraction
//!
//! Centralized CSS selectors for detail pages, set listing tables and set
//! landing pages. Each list is tried in order; the first hit wins.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingConfig {
    pub card_detail_selectors: CardDetailSelectors,
    pub set_listing_selectors: SetListingSelectors,
    pub set_landing_selectors: SetLandingSelectors,
}

/// CSS selectors for card detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetailSelectors {
    /// Page-level canonical image metadata
    pub canonical_image: String,

    /// Large-font title elements carrying the card name, highest priority first
    pub name: Vec<String>,

    /// Document title used for the `#<number> <name>` fallback
    pub page_title: String,

    /// Emphasized/colored fragments searched for `<digits> HP`, in priority order
    pub hp_fragments: Vec<String>,

    /// Image references (type, rarity and energy icons, card art)
    pub image: String,
}

impl Default for CardDetailSelectors {
    fn default() -> Self {
        Self {
            canonical_image: "meta[property='og:image']".to_string(),
            name: vec!["font[size='2']".to_string(), "font[size='5']".to_string()],
            page_title: "title".to_string(),
            hp_fragments: vec!["font".to_string(), "b".to_string()],
            image: "img".to_string(),
        }
    }
}

/// CSS selectors for the set listing table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetListingSelectors {
    pub table: String,
    pub row: String,
    pub cell: String,
    pub link: String,
    pub name_font: String,
    pub label: String,
    pub image: String,
}

impl Default for SetListingSelectors {
    fn default() -> Self {
        Self {
            table: "table.dextable".to_string(),
            row: "tr".to_string(),
            cell: "td".to_string(),
            link: "a".to_string(),
            name_font: "font".to_string(),
            label: "b".to_string(),
            image: "img".to_string(),
        }
    }
}

/// CSS selectors for the set landing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLandingSelectors {
    /// Primary heading; the count fallback reads the first paragraph after it
    pub heading: String,
    pub paragraph: String,
}

impl Default for SetLandingSelectors {
    fn default() -> Self {
        Self {
            heading: "h1".to_string(),
            paragraph: "p".to_string(),
        }
    }
}
