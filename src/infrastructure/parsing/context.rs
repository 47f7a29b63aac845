//! Parsing context for card extraction
//!
//! Carries what a parser needs beyond the document itself: the resolved set
//! and the base URL used to make relative links absolute.

/// Context for the set listing table
#[derive(Debug, Clone)]
pub struct ListingParseContext {
    /// Resolved set identifier
    pub set_id: String,

    /// Base URL for resolving relative links
    pub base_url: String,
}

impl ListingParseContext {
    pub fn new(set_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            set_id: set_id.into(),
            base_url: base_url.into(),
        }
    }
}

/// Context for one card detail page
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    /// Detail page URL being parsed
    pub url: String,

    /// Resolved set identifier
    pub set_id: String,

    /// Base URL for resolving relative resources
    pub base_url: String,
}

impl DetailParseContext {
    pub fn new(url: impl Into<String>, set_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            set_id: set_id.into(),
            base_url: base_url.into(),
        }
    }
}
