//! Card numbering schemes and the cursor that walks them
//!
//! Detail pages are addressed either by zero padded numbers (`001`, `002`, ...)
//! or, for some sets, by `H<n>` identifiers. The cursor starts on the primary
//! scheme and switches to the fallback scheme at most once, at the first hard
//! failure, keeping the index where the failure happened.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which identifier format is being used to address detail pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberingScheme {
    /// `NNN`, zero padded to three digits
    Primary,
    /// `H<n>`, entered at `start_index`
    Fallback { start_index: u32 },
}

/// A single detail page address within a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardIdentifier {
    pub index: u32,
    pub fallback: bool,
}

impl CardIdentifier {
    #[must_use]
    pub const fn primary(index: u32) -> Self {
        Self { index, fallback: false }
    }

    #[must_use]
    pub const fn fallback(index: u32) -> Self {
        Self { index, fallback: true }
    }

    /// Site-relative detail page path, e.g. `/card/journeytogether/007.shtml`
    #[must_use]
    pub fn detail_path(&self, set_id: &str) -> String {
        format!("/card/{set_id}/{self}.shtml")
    }
}

impl fmt::Display for CardIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fallback {
            write!(f, "H{}", self.index)
        } else {
            write!(f, "{:03}", self.index)
        }
    }
}

/// What the cursor did in response to a hard failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Primary scheme abandoned; the same index is retried as `H<index>`
    SchemeSwitched { at_index: u32 },
    /// Already on the fallback scheme; the index is skipped
    Skipped { index: u32 },
}

/// Range-driven walk over `1..=expected_count`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingCursor {
    scheme: NumberingScheme,
    index: u32,
    expected_count: u32,
    switched_at_index: Option<u32>,
}

impl NumberingCursor {
    #[must_use]
    pub const fn new(expected_count: u32) -> Self {
        Self {
            scheme: NumberingScheme::Primary,
            index: 1,
            expected_count,
            switched_at_index: None,
        }
    }

    /// Identifier to fetch next, `None` once the range is exhausted
    #[must_use]
    pub fn current(&self) -> Option<CardIdentifier> {
        if self.index == 0 || self.index > self.expected_count {
            return None;
        }
        Some(match self.scheme {
            NumberingScheme::Primary => CardIdentifier::primary(self.index),
            NumberingScheme::Fallback { .. } => CardIdentifier::fallback(self.index),
        })
    }

    /// Moves past the current index after it was fetched (with or without data)
    pub fn advance(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Records a hard failure on the current index
    pub fn record_failure(&mut self) -> FailureOutcome {
        match self.scheme {
            NumberingScheme::Primary => {
                self.scheme = NumberingScheme::Fallback {
                    start_index: self.index,
                };
                self.switched_at_index = Some(self.index);
                FailureOutcome::SchemeSwitched { at_index: self.index }
            }
            NumberingScheme::Fallback { .. } => {
                let index = self.index;
                self.advance();
                FailureOutcome::Skipped { index }
            }
        }
    }

    #[must_use]
    pub const fn scheme(&self) -> NumberingScheme {
        self.scheme
    }

    #[must_use]
    pub const fn switched_at_index(&self) -> Option<u32> {
        self.switched_at_index
    }
}
