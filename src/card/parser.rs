//! Heuristic field extraction from recognized card text.
//!
//! Each field is located by an ordered rule table evaluated top to bottom;
//! the first rule that fires decides. Validation failures demote the record
//! to incomplete but never stop later fields from being extracted, so partial
//! data stays available for inspection.

use anyhow::Result;
use regex::Regex;
use std::fmt;
use tracing::{debug, warn};

use super::catalog::ReferenceCatalog;
use super::record::{CardRecord, ErrorReason};
use crate::config::{MarkerToken, ParsingConfig};

/// Recognized text for one card.
#[derive(Debug, Clone, PartialEq)]
pub enum CardText {
    /// One line sequence covering name, quantity and price in reading order.
    Combined(Vec<String>),
    /// Separate line sequences from the name, quantity and price regions.
    Regions {
        name: Vec<String>,
        quantity: Vec<String>,
        price: Vec<String>,
    },
}

impl CardText {
    /// True when recognition produced no text at all.
    pub fn is_empty(&self) -> bool {
        match self {
            CardText::Combined(lines) => lines.is_empty(),
            CardText::Regions {
                name,
                quantity,
                price,
            } => name.is_empty() && quantity.is_empty() && price.is_empty(),
        }
    }

    fn name_lines(&self) -> &[String] {
        match self {
            CardText::Combined(lines) => lines,
            CardText::Regions { name, .. } => name,
        }
    }

    /// Lines scanned for the quantity marker. In combined text the scan
    /// starts after the lines consumed by name extraction.
    fn quantity_lines(&self, start: usize) -> &[String] {
        match self {
            CardText::Combined(lines) => lines.get(start..).unwrap_or(&[]),
            CardText::Regions { quantity, .. } => quantity,
        }
    }

    /// The line expected to hold the price.
    fn price_line(&self, start: usize, marker: Option<usize>, fallback_offset: usize) -> Option<&str> {
        match self {
            CardText::Combined(lines) => {
                let idx = match marker {
                    Some(m) => start + m + 1,
                    None => start + fallback_offset,
                };
                lines.get(idx).map(String::as_str)
            }
            // The first observation of the price region is trusted positionally
            CardText::Regions { price, .. } => price.first().map(String::as_str),
        }
    }
}

/// A structural failure while reading a field that looked well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure(String);

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsing configuration with the quantity-marker pattern compiled once.
pub struct ParseRules {
    config: ParsingConfig,
    /// Matches any quantity-marker token; `None` when no tokens are configured
    quantity_marker: Option<Regex>,
}

impl ParseRules {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let alternatives: Vec<String> = config
            .quantity_tokens
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| regex::escape(t))
            .collect();
        let quantity_marker = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?i){}", alternatives.join("|")))?)
        };

        Ok(Self {
            config: config.clone(),
            quantity_marker,
        })
    }

    /// Byte offset of the earliest quantity-marker token in `line`.
    fn marker_position(&self, line: &str) -> Option<usize> {
        self.quantity_marker
            .as_ref()
            .and_then(|re| re.find(line))
            .map(|m| m.start())
    }

    fn has_marker(&self, line: &str) -> bool {
        self.marker_position(line).is_some()
    }

    fn marker_token(&self, line: &str) -> Option<&MarkerToken> {
        let line = line.trim();
        self.config
            .marker_tokens
            .iter()
            .find(|t| t.text.eq_ignore_ascii_case(line))
    }
}

// ---------------------------------------------------------------------------
// Name rules
// ---------------------------------------------------------------------------

struct NameInput<'a> {
    first: &'a str,
    second: &'a str,
    special_edition: bool,
}

struct NameChoice {
    candidate: String,
    /// Index of the first line after those consumed by the name
    start: usize,
    special_edition: bool,
}

struct NameRule {
    label: &'static str,
    applies: fn(&NameInput, &ParseRules) -> bool,
    choose: fn(&NameInput, &ParseRules) -> NameChoice,
}

const NAME_RULES: &[NameRule] = &[
    // A rarity/variant token (or a detected color marker) sits above the name
    NameRule {
        label: "marker line",
        applies: |input, rules| input.special_edition || rules.marker_token(input.first).is_some(),
        choose: |input, rules| NameChoice {
            candidate: input.second.to_string(),
            start: 1,
            special_edition: input.special_edition
                || rules
                    .marker_token(input.first)
                    .is_some_and(|t| t.special_edition),
        },
    },
    // One or two characters are a stray recognition artifact
    NameRule {
        label: "short artifact",
        applies: |input, _| input.first.chars().count() <= 2,
        choose: |input, _| NameChoice {
            candidate: input.second.to_string(),
            start: 1,
            special_edition: false,
        },
    },
    NameRule {
        label: "first line",
        applies: |_, _| true,
        choose: |input, _| NameChoice {
            candidate: input.first.to_string(),
            start: 0,
            special_edition: false,
        },
    },
];

fn line_at(lines: &[String], idx: usize) -> &str {
    lines.get(idx).map(|l| l.trim()).unwrap_or("")
}

/// Picks the name candidate and the number of lines it consumed.
fn choose_name(lines: &[String], special_edition: bool, rules: &ParseRules) -> NameChoice {
    let input = NameInput {
        first: line_at(lines, 0),
        second: line_at(lines, 1),
        special_edition,
    };

    let rule = NAME_RULES
        .iter()
        .find(|r| (r.applies)(&input, rules))
        .unwrap_or(&NAME_RULES[NAME_RULES.len() - 1]);
    debug!("Name rule: {}", rule.label);

    let mut choice = (rule.choose)(&input, rules);

    if choice.candidate.is_empty() {
        if let Some(line) = lines
            .iter()
            .skip(choice.start)
            .map(|l| l.trim())
            .find(|l| !l.is_empty() && !rules.has_marker(l))
        {
            choice.candidate = line.to_string();
        }
    }

    choice
}

/// Corrects the candidate against the catalog and applies the special-edition prefix.
fn finish_name(choice: &NameChoice, catalog: &ReferenceCatalog, rules: &ParseRules) -> String {
    if choice.candidate.is_empty() {
        return String::new();
    }
    let corrected = catalog.correct(&choice.candidate);
    if choice.special_edition {
        format!("{}{}", rules.config.special_edition_prefix, corrected)
    } else {
        corrected
    }
}

// ---------------------------------------------------------------------------
// Quantity rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct QuantityHit {
    count: u32,
    /// Index of the line holding the marker token
    marker: usize,
}

struct QuantityRule {
    label: &'static str,
    apply: fn(&[String], usize, &ParseRules) -> Result<Option<QuantityHit>, ParseFailure>,
}

const QUANTITY_RULES: &[QuantityRule] = &[
    // "12 WT." on one line
    QuantityRule {
        label: "inline marker",
        apply: |lines, i, rules| {
            let line = lines[i].trim();
            let Some(pos) = rules.marker_position(line) else {
                return Ok(None);
            };
            let count = parse_leading_digits(line[..pos].trim())?;
            Ok(Some(QuantityHit { count, marker: i }))
        },
    },
    // "12" followed by "WT." on the next line
    QuantityRule {
        label: "split marker",
        apply: |lines, i, rules| {
            let line = lines[i].trim();
            let next_has_marker = lines.get(i + 1).is_some_and(|n| rules.has_marker(n));
            if !is_all_digits(line) || !next_has_marker {
                return Ok(None);
            }
            let count = parse_leading_digits(line)?;
            Ok(Some(QuantityHit {
                count,
                marker: i + 1,
            }))
        },
    },
];

fn find_quantity(lines: &[String], rules: &ParseRules) -> Result<Option<QuantityHit>, ParseFailure> {
    for i in 0..lines.len() {
        for rule in QUANTITY_RULES {
            if let Some(hit) = (rule.apply)(lines, i, rules)? {
                debug!("Quantity rule: {} -> {:?}", rule.label, hit);
                return Ok(Some(hit));
            }
        }
    }
    Ok(None)
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Parses the leading ASCII digits of `s`; no digits yields 0.
pub fn parse_leading_digits(s: &str) -> Result<u32, ParseFailure> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Ok(0);
    }
    digits
        .parse::<u32>()
        .map_err(|e| ParseFailure(format!("quantity '{}': {}", digits, e)))
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// Parses one price line. Lines that do not look like a number yield 0.0.
pub fn parse_price(line: &str, rules: &ParseRules) -> Result<f64, ParseFailure> {
    let line = line.trim();

    let text: String = match line.strip_prefix(rules.config.currency_glyph) {
        Some(rest) => rest
            .chars()
            .map(|c| {
                rules
                    .config
                    .price_confusions
                    .iter()
                    .find(|(seen, _)| *seen == c)
                    .map_or(c, |(_, meant)| *meant)
            })
            .collect::<String>()
            .trim()
            .to_string(),
        None => line.to_string(),
    };

    let stripped: String = text.chars().filter(|c| *c != '.' && *c != '-').collect();
    if !is_all_digits(&stripped) {
        return Ok(0.0);
    }

    text.parse::<f64>()
        .map_err(|e| ParseFailure(format!("price '{}': {}", text, e)))
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Fields collected so far, plus the first validation failure.
#[derive(Default)]
struct Draft {
    name: String,
    count: u32,
    price: f64,
    special_edition: bool,
    reason: Option<ErrorReason>,
}

impl Draft {
    /// Records a validation failure; only the first one is kept.
    fn reject(&mut self, reason: ErrorReason) {
        self.reason.get_or_insert(reason);
    }

    fn extract(
        &mut self,
        text: &CardText,
        special_edition: bool,
        catalog: &ReferenceCatalog,
        rules: &ParseRules,
    ) -> Result<(), ParseFailure> {
        let choice = choose_name(text.name_lines(), special_edition, rules);
        self.special_edition = choice.special_edition;
        self.name = finish_name(&choice, catalog, rules);
        if self.name.is_empty() {
            self.reject(ErrorReason::NameEmpty);
        }

        let start = choice.start;
        let hit = find_quantity(text.quantity_lines(start), rules)?;
        match hit {
            None => self.reject(ErrorReason::QuantityMarkerMissing),
            Some(hit) => {
                self.count = hit.count;
                if hit.count == 0 {
                    self.reject(ErrorReason::QuantityInvalid);
                }
            }
        }

        let price_line = text.price_line(
            start,
            hit.map(|h| h.marker),
            rules.config.price_fallback_offset,
        );
        self.price = match price_line {
            Some(line) => parse_price(line, rules)?,
            None => 0.0,
        };
        if self.price <= 0.0 {
            self.reject(ErrorReason::PriceInvalid);
        }

        Ok(())
    }
}

/// Turns recognized card text into a classified record.
///
/// `special_edition` is the color-marker hint; a textual marker token can
/// also establish it.
pub fn parse_card(
    text: &CardText,
    special_edition: bool,
    catalog: &ReferenceCatalog,
    rules: &ParseRules,
    source_image: &str,
) -> CardRecord {
    if text.is_empty() {
        return CardRecord::unreadable(source_image, ErrorReason::OcrUnavailable);
    }

    let mut draft = Draft::default();
    if let Err(failure) = draft.extract(text, special_edition, catalog, rules) {
        warn!("Parsing error in {}: {} (text: {:?})", source_image, failure, text);
        draft.reason = Some(ErrorReason::ParsingError);
    }

    CardRecord::new(
        draft.name,
        draft.count,
        draft.price,
        draft.special_edition,
        draft.reason,
        source_image,
    )
}
