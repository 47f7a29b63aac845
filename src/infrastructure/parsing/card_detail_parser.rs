//! Card detail page parser
//!
//! Extraction is a cascade of independent rules. Each field group has an
//! ordered list of rules; the first rule that yields a value wins and no rule
//! can abort another. A missing field is never an error, it simply keeps the
//! record's default.

#![allow(clippy::uninlined_format_args)]

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::context::DetailParseContext;
use super::error::ParsingResult;
use super::markup::{
    self, element_string, element_text, elements_after, elements_before_text, find_text, image_sources, MarkupPatterns,
    COLORLESS_TOKEN,
};
use super::ContextualParser;
use crate::domain::card::{rarity_from_token, CardRecord};
use crate::infrastructure::config::utils::resolve_url;

/// One extraction attempt for a field group
type Rule<T> = fn(&CardDetailParser, &Html, &DetailParseContext) -> Option<T>;

/// Parser for extracting a [`CardRecord`] from a card detail page
pub struct CardDetailParser {
    canonical_image_selector: Selector,
    name_selectors: Vec<Selector>,
    page_title_selector: Selector,
    hp_fragment_selectors: Vec<Selector>,
    image_selector: Selector,
    patterns: MarkupPatterns,
}

impl CardDetailParser {
    /// Rules for the card art URL, highest priority first
    const IMAGE_URL_RULES: &'static [Rule<String>] = &[Self::canonical_image, Self::numbered_card_image];
    const NAME_RULES: &'static [Rule<String>] = &[Self::large_font_name, Self::page_title_name];
    const NUMBER_RULES: &'static [Rule<String>] = &[Self::number_text];
    const HP_RULES: &'static [Rule<String>] = &[Self::emphasized_hp];
    const PRIMARY_TYPE_RULES: &'static [Rule<String>] = &[Self::type_icon];
    const RARITY_RULES: &'static [Rule<String>] = &[Self::rarity_icon];

    /// Create a new card detail parser with default configuration
    pub fn new() -> ParsingResult<Self> {
        let config = super::config::ParsingConfig::default();
        Self::with_config(&config.card_detail_selectors)
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &super::config::CardDetailSelectors) -> ParsingResult<Self> {
        Ok(Self {
            canonical_image_selector: markup::compile_selector(&selectors.canonical_image)?,
            name_selectors: markup::compile_selectors(&selectors.name)?,
            page_title_selector: markup::compile_selector(&selectors.page_title)?,
            hp_fragment_selectors: markup::compile_selectors(&selectors.hp_fragments)?,
            image_selector: markup::compile_selector(&selectors.image)?,
            patterns: MarkupPatterns::compile()?,
        })
    }

    /// Parse raw HTML text; see [`ContextualParser::parse_with_context`]
    #[must_use]
    pub fn parse_str(&self, html: &str, context: &DetailParseContext) -> Option<CardRecord> {
        self.parse_with_context(&Html::parse_document(html), context)
    }

    fn first_match<T>(&self, rules: &[Rule<T>], html: &Html, context: &DetailParseContext) -> Option<T> {
        rules.iter().find_map(|rule| rule(self, html, context))
    }

    fn page_image_sources<'a>(&'a self, html: &'a Html) -> impl Iterator<Item = &'a str> + 'a {
        html.select(&self.image_selector).filter_map(|img| img.value().attr("src"))
    }

    // ---- image url -------------------------------------------------------

    fn canonical_image(&self, html: &Html, context: &DetailParseContext) -> Option<String> {
        html.select(&self.canonical_image_selector)
            .filter_map(|meta| meta.value().attr("content"))
            .find(|content| !content.trim().is_empty())
            .and_then(|content| resolve_url(&context.base_url, content))
    }

    fn numbered_card_image(&self, html: &Html, context: &DetailParseContext) -> Option<String> {
        let pattern = Regex::new(&format!(r"(?i)/card/{}/\d+\.(?:jpg|png)$", regex::escape(&context.set_id))).ok()?;
        self.page_image_sources(html)
            .find(|src| pattern.is_match(src.trim()))
            .and_then(|src| resolve_url(&context.base_url, src))
    }

    // ---- name ------------------------------------------------------------

    fn large_font_name(&self, html: &Html, _context: &DetailParseContext) -> Option<String> {
        self.name_selectors
            .iter()
            .filter_map(|selector| html.select(selector).next())
            .map(element_text)
            .find(|name| !name.is_empty())
    }

    fn page_title_name(&self, html: &Html, _context: &DetailParseContext) -> Option<String> {
        let title = html.select(&self.page_title_selector).next().map(element_text)?;
        self.patterns
            .title_name
            .captures(&title)
            .and_then(|captures| captures.get(1))
            .map(|name| name.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    }

    // ---- number ----------------------------------------------------------

    fn number_text(&self, html: &Html, _context: &DetailParseContext) -> Option<String> {
        let (text, _) = find_text(html.root_element(), &self.patterns.card_number)?;
        self.patterns
            .card_number
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|number| number.as_str().chars().filter(|c| !c.is_whitespace()).collect())
    }

    // ---- hp --------------------------------------------------------------

    fn emphasized_hp(&self, html: &Html, _context: &DetailParseContext) -> Option<String> {
        self.hp_fragment_selectors.iter().find_map(|selector| {
            html.select(selector)
                .filter_map(element_string)
                .filter(|fragment| fragment.contains("HP"))
                .find_map(|fragment| {
                    self.patterns
                        .hp
                        .captures(fragment)
                        .and_then(|captures| captures.get(1))
                        .map(|hp| hp.as_str().to_string())
                })
        })
    }

    // ---- type ------------------------------------------------------------

    /// First type icon ahead of the weakness, resistance and retreat sections
    fn type_icon(&self, html: &Html, _context: &DetailParseContext) -> Option<String> {
        let section_labels = [
            &self.patterns.weakness_label,
            &self.patterns.resistance_label,
            &self.patterns.retreat_label,
        ];
        elements_before_text(html.root_element(), &section_labels)
            .filter(|element| self.image_selector.matches(element))
            .filter_map(|img| img.value().attr("src"))
            .find_map(|src| self.patterns.type_token(src))
    }

    /// Type token of the first type icon after a text label
    fn labeled_type_icon(&self, html: &Html, label: &Regex) -> Option<String> {
        let root = html.root_element();
        let (_, parent) = find_text(root, label)?;
        image_sources(elements_after(root, parent)).find_map(|src| self.patterns.type_token(src))
    }

    // ---- retreat ---------------------------------------------------------

    /// Consecutive colorless icons after the "Retreat" label; 0 without a label
    fn retreat_cost(&self, html: &Html) -> u32 {
        let root = html.root_element();
        let Some((_, parent)) = find_text(root, &self.patterns.retreat_label) else {
            return 0;
        };
        let count = image_sources(elements_after(root, parent))
            .take_while(|src| self.patterns.icon_token(src).as_deref() == Some(COLORLESS_TOKEN))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    // ---- rarity ----------------------------------------------------------

    fn rarity_icon(&self, html: &Html, _context: &DetailParseContext) -> Option<String> {
        self.page_image_sources(html).find_map(|src| {
            self.patterns
                .rarity_icon
                .captures(src.trim())
                .and_then(|captures| captures.get(1))
                .map(|token| token.as_str().to_ascii_lowercase())
        })
    }
}

/// Parser trait implementation: every field group is attempted independently
impl ContextualParser for CardDetailParser {
    type Output = Option<CardRecord>;
    type Context = DetailParseContext;

    /// `None` is the "no data" result: nothing identifying a card was found
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> Self::Output {
        debug!("Parsing card detail from: {}", context.url);

        let mut record = CardRecord {
            detail_url: Some(context.url.clone()),
            ..CardRecord::default()
        };

        record.image_url = self.first_match(Self::IMAGE_URL_RULES, html, context);
        if let Some(name) = self.first_match(Self::NAME_RULES, html, context) {
            record.name = name;
        }
        if let Some(number) = self.first_match(Self::NUMBER_RULES, html, context) {
            record.number = number;
        }
        record.hp = self.first_match(Self::HP_RULES, html, context);

        // Default classification runs only after every type rule had its chance
        match self.first_match(Self::PRIMARY_TYPE_RULES, html, context) {
            Some(token) => record.set_primary_type(&token),
            None => record.classify_as_trainer(),
        }

        if let Some(weakness) = self.labeled_type_icon(html, &self.patterns.weakness_label) {
            record.weakness = vec![weakness];
        }
        if let Some(resistance) = self.labeled_type_icon(html, &self.patterns.resistance_label) {
            record.resistance = vec![resistance];
        }
        record.retreat_cost = self.retreat_cost(html);

        if let Some(token) = self.first_match(Self::RARITY_RULES, html, context) {
            let (rarity, holographic) = rarity_from_token(&token);
            record.rarity = rarity;
            record.holographic = holographic;
        }

        if record.number.is_empty() && record.name.is_empty() && record.image_url.is_none() {
            debug!("No card data found at {}", context.url);
            return None;
        }

        debug!("Extracted card {} '{}' from {}", record.number, record.name, context.url);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::{TRAINER_CARD_TYPE, TRAINER_TYPE_TOKEN};

    fn parse(body: &str) -> Option<CardRecord> {
        parse_with_head("", body)
    }

    fn parse_with_head(head: &str, body: &str) -> Option<CardRecord> {
        let html = format!("<html><head>{head}</head><body>{body}</body></html>");
        let parser = CardDetailParser::new().unwrap();
        let context = DetailParseContext::new(
            "https://www.serebii.net/card/journeytogether/045.shtml",
            "journeytogether",
            "https://www.serebii.net",
        );
        parser.parse_str(&html, &context)
    }

    fn assert_trainer(record: &CardRecord) {
        assert_eq!(record.card_type, TRAINER_CARD_TYPE);
        assert_eq!(record.types, vec![TRAINER_TYPE_TOKEN.to_string()]);
    }

    /// Fields that no rule touched keep their defaults
    fn assert_untouched_except(record: &CardRecord, touched: &[&str]) {
        if !touched.contains(&"type") {
            assert_trainer(record);
        }
        if !touched.contains(&"hp") {
            assert_eq!(record.hp, None);
        }
        if !touched.contains(&"weakness") {
            assert!(record.weakness.is_empty());
        }
        if !touched.contains(&"resistance") {
            assert!(record.resistance.is_empty());
        }
        if !touched.contains(&"retreat") {
            assert_eq!(record.retreat_cost, 0);
        }
        if !touched.contains(&"rarity") {
            assert_eq!(record.rarity, "");
            assert!(!record.holographic);
        }
        if !touched.contains(&"image") {
            assert_eq!(record.image_url, None);
        }
    }

    #[test]
    fn test_parser_creation() {
        assert!(CardDetailParser::new().is_ok());
    }

    #[test]
    fn canonical_image_wins_over_body_image() {
        let record = parse_with_head(
            r#"<meta property="og:image" content="https://www.serebii.net/card/th/journeytogether/045.jpg">"#,
            r#"<img src="/card/journeytogether/045.jpg"><font size="2">Pikachu</font>"#,
        )
        .unwrap();
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://www.serebii.net/card/th/journeytogether/045.jpg")
        );
    }

    #[test]
    fn numbered_card_image_is_made_absolute() {
        let record = parse(r#"<img src="/card/journeytogether/045.jpg">"#).unwrap();
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://www.serebii.net/card/journeytogether/045.jpg")
        );
        assert_untouched_except(&record, &["image"]);
    }

    #[test]
    fn numbered_card_image_ignores_set_id_case() {
        let html = r#"<html><body><img src="/card/surgingsparks/001.jpg"></body></html>"#;
        let context = DetailParseContext::new(
            "https://www.serebii.net/card/Surgingsparks/001.shtml",
            "Surgingsparks",
            "https://www.serebii.net",
        );
        let record = CardDetailParser::new().unwrap().parse_str(html, &context).unwrap();
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://www.serebii.net/card/surgingsparks/001.jpg")
        );
    }

    #[test]
    fn name_prefers_large_font_then_title() {
        let record = parse_with_head("<title>#045 Ignored</title>", r#"<font size="2">Pikachu</font>"#).unwrap();
        assert_eq!(record.name, "Pikachu");

        let record = parse_with_head("<title>#045 Raichu</title>", "").unwrap();
        assert_eq!(record.name, "Raichu");
        assert_untouched_except(&record, &[]);
    }

    #[test]
    fn number_whitespace_is_removed() {
        let record = parse("<td>045 / 190</td>").unwrap();
        assert_eq!(record.number, "045/190");
        assert_untouched_except(&record, &[]);
    }

    #[test]
    fn hp_from_colored_bold_text() {
        let record = parse(r##"<td>001/190</td><font color="#FF0000"><b>60 HP</b></font>"##).unwrap();
        assert_eq!(record.hp.as_deref(), Some("60"));
        assert_untouched_except(&record, &["hp"]);
    }

    #[test]
    fn type_icon_sets_primary_type() {
        let record = parse(r#"<td>001/190</td><img src="/card/image/rare.png"><img src="/card/image/grass.png">"#).unwrap();
        assert_eq!(record.card_type, "Grass Pokémon");
        assert_eq!(record.types, vec!["grass".to_string()]);
        assert_untouched_except(&record, &["type", "rarity"]);
    }

    #[test]
    fn no_type_icon_defaults_to_trainer() {
        let record = parse(r#"<td>150/190</td><font size="2">Iono</font>"#).unwrap();
        assert_eq!(record.card_type, TRAINER_CARD_TYPE);
        assert_eq!(record.types, vec![TRAINER_TYPE_TOKEN.to_string()]);
    }

    #[test]
    fn hp_does_not_override_trainer_default() {
        let record = parse("<td>150/190</td><b>70 HP</b>").unwrap();
        assert_eq!(record.card_type, TRAINER_CARD_TYPE);
        assert_eq!(record.hp.as_deref(), Some("70"));
    }

    #[test]
    fn weakness_and_resistance_follow_their_labels() {
        let record = parse(
            r#"<p>001/190</p><table><tr>
                <td><b>Weakness</b></td><td><img src="/card/image/lightning.png"></td>
                <td><b>Resistance</b></td><td><img src="/card/image/fighting.png"></td>
            </tr></table>"#,
        )
        .unwrap();
        assert_eq!(record.weakness, vec!["lightning".to_string()]);
        assert_eq!(record.resistance, vec!["fighting".to_string()]);
        assert_untouched_except(&record, &["weakness", "resistance"]);
    }

    #[test]
    fn type_icon_ahead_of_weakness_still_sets_primary_type() {
        let record = parse(
            r#"<p>001/190</p><table><tr>
                <td><img src="/card/image/water.png"></td>
                <td><b>Weakness</b></td><td><img src="/card/image/lightning.png"></td>
            </tr></table>"#,
        )
        .unwrap();
        assert_eq!(record.card_type, "Water Pokémon");
        assert_eq!(record.types, vec!["water".to_string()]);
        assert_eq!(record.weakness, vec!["lightning".to_string()]);
    }

    #[test]
    fn retreat_counts_consecutive_colorless_icons() {
        let record = parse(
            r#"<td>010/190</td><table><tr><td><b>Retreat Cost</b></td><td>
                <img src="/card/image/colorless.png"><img src="/card/image/colorless.png">
                </td></tr></table><img src="/card/image/colorless.png">"#,
        )
        .unwrap();
        assert_eq!(record.retreat_cost, 3);
        assert_untouched_except(&record, &["retreat"]);

        let record = parse(
            r#"<td>010/190</td><b>Retreat</b><img src="/card/image/colorless.png"><img src="/card/image/fire.png"><img src="/card/image/colorless.png">"#,
        )
        .unwrap();
        assert_eq!(record.retreat_cost, 1);
        assert_untouched_except(&record, &["retreat"]);
    }

    #[test]
    fn retreat_is_zero_without_label() {
        let record = parse(r#"<td>010/190</td><img src="/card/image/colorless.png">"#).unwrap();
        assert_eq!(record.retreat_cost, 0);
    }

    #[test]
    fn holographic_rarity_is_rare_and_flagged() {
        let record = parse(r#"<td>010/190</td><img src="/card/image/holographic.png">"#).unwrap();
        assert_eq!(record.rarity, "Rare");
        assert!(record.holographic);
        assert_untouched_except(&record, &["rarity"]);
    }

    #[test]
    fn other_rarities_are_not_holographic() {
        let record = parse(r#"<td>010/190</td><img src="/card/image/uncommon.png">"#).unwrap();
        assert_eq!(record.rarity, "Uncommon");
        assert!(!record.holographic);
    }

    #[test]
    fn empty_page_is_no_data() {
        assert!(parse("<p>Page not found</p>").is_none());
    }
}
