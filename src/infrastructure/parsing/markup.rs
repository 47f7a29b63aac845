//! Markup helpers shared by the card parsers
//!
//! The source pages are loosely structured table soup, so extraction works on
//! document order ("the next icon after this label") rather than on a fixed
//! DOM shape.

use regex::Regex;
use scraper::{ElementRef, Node, Selector};

use super::error::{ParsingError, ParsingResult};

/// Icon tokens that denote rarity rather than an energy type
pub const RARITY_TOKENS: &[&str] = &["common", "uncommon", "rare", "holographic", "ultra", "secret"];

/// Icon token used for retreat cost
pub const COLORLESS_TOKEN: &str = "colorless";

/// Compiled regular expressions used across the parsers
#[derive(Debug, Clone)]
pub struct MarkupPatterns {
    /// `/card/image/<token>.png` style icon reference
    pub icon: Regex,
    pub rarity_icon: Regex,
    pub card_number: Regex,
    pub hp: Regex,
    pub title_name: Regex,
    pub weakness_label: Regex,
    pub resistance_label: Regex,
    pub retreat_label: Regex,
    pub card_count: Regex,
    pub set_url: Regex,
    pub bare_set_id: Regex,
}

impl MarkupPatterns {
    pub fn compile() -> ParsingResult<Self> {
        Ok(Self {
            icon: compile(r"(?i)/card/image/(?:.*/)?([^/?#]+)\.(?:png|jpg)$")?,
            rarity_icon: compile(r"(?i)/card/image/(holographic|common|uncommon|rare|ultra|secret)\.(?:png|jpg)$")?,
            card_number: compile(r"(\d+\s*/\s*\d+)")?,
            hp: compile(r"(\d+)\s*HP")?,
            title_name: compile(r"#\d+\s+(.+)")?,
            weakness_label: compile(r"(?i)weakness")?,
            resistance_label: compile(r"(?i)resistance")?,
            retreat_label: compile(r"(?i)retreat")?,
            card_count: compile(r"(?is)Amount of Cards.*?(\d+)")?,
            set_url: compile(r"(?i)/card/([a-z0-9_-]+)/?")?,
            bare_set_id: compile(r"^[A-Za-z0-9_-]+$")?,
        })
    }

    /// Lowercased filename token of an icon reference (`.../fire.png` -> `fire`)
    #[must_use]
    pub fn icon_token(&self, src: &str) -> Option<String> {
        self.icon
            .captures(src.trim())
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str().to_ascii_lowercase())
    }

    /// Icon token when it names an energy type rather than a rarity
    #[must_use]
    pub fn type_token(&self, src: &str) -> Option<String> {
        self.icon_token(src).filter(|token| !is_rarity_token(token))
    }
}

fn compile(pattern: &str) -> ParsingResult<Regex> {
    Regex::new(pattern).map_err(|e| ParsingError::invalid_pattern(pattern, e))
}

/// Compile a selector string, mapping failures to [`ParsingError`]
pub fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, format!("{e:?}")))
}

/// Compile a list of selectors, all of which must be valid
pub fn compile_selectors(selectors: &[String]) -> ParsingResult<Vec<Selector>> {
    selectors.iter().map(|s| compile_selector(s)).collect()
}

#[must_use]
pub fn is_rarity_token(token: &str) -> bool {
    RARITY_TOKENS.iter().any(|rarity| rarity.eq_ignore_ascii_case(token))
}

/// Trimmed text of an element and all its descendants
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The element's sole string, descending through single-child wrappers
///
/// Mirrors "this element holds exactly one piece of text": `<font><b>50 HP</b></font>`
/// yields `50 HP`, a font wrapping a whole table yields nothing.
#[must_use]
pub fn element_string(element: ElementRef<'_>) -> Option<&str> {
    let mut children = element.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match only.value() {
        Node::Text(text) => Some(&**text),
        Node::Element(_) => ElementRef::wrap(only).and_then(element_string),
        _ => None,
    }
}

/// First text node under `root` matching `pattern`, with its parent element
///
/// Script and style contents are ignored.
#[must_use]
pub fn find_text<'a>(root: ElementRef<'a>, pattern: &Regex) -> Option<(&'a str, ElementRef<'a>)> {
    root.descendants().find_map(|node| {
        let text = node.value().as_text()?;
        let parent = node.parent().and_then(ElementRef::wrap)?;
        if matches!(parent.value().name(), "script" | "style") || !pattern.is_match(text) {
            return None;
        }
        Some((&**text, parent))
    })
}

/// Elements that follow `anchor` in document order, starting with its own descendants
pub fn elements_after<'a>(root: ElementRef<'a>, anchor: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let anchor_id = anchor.id();
    root.descendants()
        .skip_while(move |node| node.id() != anchor_id)
        .skip(1)
        .filter_map(ElementRef::wrap)
}

/// Elements under `root` up to the first text node matching any of `labels`
///
/// Script and style contents never end the walk.
pub fn elements_before_text<'a, 'p>(
    root: ElementRef<'a>,
    labels: &'p [&'p Regex],
) -> impl Iterator<Item = ElementRef<'a>> + 'p
where
    'a: 'p,
{
    root.descendants()
        .take_while(move |node| {
            let Some(text) = node.value().as_text() else {
                return true;
            };
            let in_code = node
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| matches!(parent.value().name(), "script" | "style"));
            in_code || !labels.iter().any(|label| label.is_match(text))
        })
        .filter_map(ElementRef::wrap)
}

/// `src` attributes of `<img>` elements, in document order
pub fn image_sources<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> impl Iterator<Item = &'a str> {
    elements
        .filter(|element| element.value().name() == "img")
        .filter_map(|element| element.value().attr("src"))
}

/// Next element sibling of `element`, skipping text and comments
#[must_use]
pub fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}
