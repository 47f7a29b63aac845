//! Set descriptor value object

use serde::{Deserialize, Serialize};

/// A resolved card set, created once per acquisition run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDescriptor {
    /// Canonical set identifier, e.g. `journeytogether`
    pub id: String,
    /// Landing page the set was resolved from
    pub source_url: String,
    /// Card count read from the landing page, when present
    pub expected_count: Option<u32>,
}

impl SetDescriptor {
    #[must_use]
    pub fn new(id: impl Into<String>, source_url: impl Into<String>, expected_count: Option<u32>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            expected_count,
        }
    }

    /// Card count for a range-driven walk; a zero count means no usable range
    #[must_use]
    pub fn range_count(&self) -> Option<u32> {
        self.expected_count.filter(|count| *count > 0)
    }
}
