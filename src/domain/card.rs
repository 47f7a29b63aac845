//! Card record entity
//!
//! One parsed trading card. Created by the detail/listing parsers, enriched
//! by the image cache (`local_image_path`) and consumed read-only by the
//! dataset writer.

use serde::{Deserialize, Serialize};

/// Card type assigned when no type icon is present on the page
pub const TRAINER_CARD_TYPE: &str = "Trainer";

/// Type token assigned together with [`TRAINER_CARD_TYPE`]
pub const TRAINER_TYPE_TOKEN: &str = "trainer";

/// A single card as extracted from a detail page or a listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Card number within the set, e.g. `045/102`. Non-empty once accepted.
    pub number: String,
    pub name: String,
    /// `"<Type> Pokémon"` or `"Trainer"`
    pub card_type: String,
    pub types: Vec<String>,
    pub rarity: String,
    pub holographic: bool,
    /// Pokémon-only attribute; `None` for trainers and energies
    pub hp: Option<String>,
    pub weakness: Vec<String>,
    pub resistance: Vec<String>,
    pub retreat_cost: u32,
    pub image_url: Option<String>,
    pub local_image_path: Option<String>,
    /// Detail page this record came from (listing rows only point at it)
    pub detail_url: Option<String>,
}

impl Default for CardRecord {
    fn default() -> Self {
        Self {
            number: String::new(),
            name: String::new(),
            card_type: TRAINER_CARD_TYPE.to_string(),
            types: Vec::new(),
            rarity: String::new(),
            holographic: false,
            hp: None,
            weakness: Vec::new(),
            resistance: Vec::new(),
            retreat_cost: 0,
            image_url: None,
            local_image_path: None,
            detail_url: None,
        }
    }
}

impl CardRecord {
    /// Record acceptance gate: only records with a card number enter the dataset
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        !self.number.trim().is_empty()
    }

    /// Leading numeric part of the card number (`"045/102"` -> `45`)
    #[must_use]
    pub fn numeric_position(&self) -> Option<u32> {
        let head = self.number.split('/').next().unwrap_or_default();
        let digits: String = head.chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    /// Sets the primary type from an icon token, e.g. `fire` -> `Fire Pokémon`
    pub fn set_primary_type(&mut self, token: &str) {
        self.card_type = format!("{} Pokémon", capitalize(token));
        self.types = vec![token.to_string()];
    }

    /// Explicit default classification for pages without any type icon
    pub fn classify_as_trainer(&mut self) {
        self.card_type = TRAINER_CARD_TYPE.to_string();
        self.types = vec![TRAINER_TYPE_TOKEN.to_string()];
    }
}

/// Maps a rarity icon token to `(rarity label, holographic)`
///
/// `holographic` is reported as `Rare` with the holographic flag set; every
/// other token is capitalized and non-holographic.
#[must_use]
pub fn rarity_from_token(token: &str) -> (String, bool) {
    if token.eq_ignore_ascii_case("holographic") {
        ("Rare".to_string(), true)
    } else {
        (capitalize(&token.to_ascii_lowercase()), false)
    }
}

/// Uppercases the first character, leaving the rest untouched
#[must_use]
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
