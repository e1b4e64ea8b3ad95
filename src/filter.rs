//! Card filtering shared by extraction and search.
//!
//! A filter has an optional text stage (a pattern matched against names, rules
//! text and type lines) and independent attribute constraints. A card passes
//! when the text stage passes and every configured constraint holds.

use crate::error::{CollectionError, Result};
use crate::models::{NormalizedCard, ReferenceCard};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::str::FromStr;

const COLOR_LETTERS: &str = "WUBRG";

/// Which text fields the pattern is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFields {
    pub name: bool,
    pub text: bool,
    pub type_line: bool,
}

impl Default for TextFields {
    fn default() -> Self {
        Self {
            name: true,
            text: false,
            type_line: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Lt => value < threshold,
            Comparison::Le => value <= threshold,
            Comparison::Gt => value > threshold,
            Comparison::Ge => value >= threshold,
            Comparison::Eq => (value - threshold).abs() < f64::EPSILON,
        }
    }
}

/// Price constraint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceFilter {
    /// The card has no price for its finish
    Missing,
    Compare(Comparison, f64),
}

impl FromStr for PriceFilter {
    type Err = CollectionError;

    /// Parses `none`, or an optional operator (`<`, `<=`, `>`, `>=`, `=`)
    /// followed by a number
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(PriceFilter::Missing);
        }
        let (op, rest) = if let Some(rest) = s.strip_prefix("<=") {
            (Comparison::Le, rest)
        } else if let Some(rest) = s.strip_prefix(">=") {
            (Comparison::Ge, rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (Comparison::Lt, rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (Comparison::Gt, rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (Comparison::Eq, rest)
        } else {
            (Comparison::Eq, s)
        };
        let threshold = rest
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| CollectionError::InvalidFilter(format!("invalid price '{s}'")))?;
        Ok(PriceFilter::Compare(op, threshold))
    }
}

impl PriceFilter {
    fn matches(&self, price: Option<f64>) -> bool {
        match (self, price) {
            (PriceFilter::Missing, price) => price.is_none(),
            (PriceFilter::Compare(op, threshold), Some(price)) => op.holds(price, *threshold),
            (PriceFilter::Compare(..), None) => false,
        }
    }
}

/// Parse a colour string like "UR" into colour letters
pub fn parse_colors(s: &str) -> Result<BTreeSet<String>> {
    s.trim()
        .chars()
        .map(|c| {
            let upper = c.to_ascii_uppercase();
            if COLOR_LETTERS.contains(upper) {
                Ok(upper.to_string())
            } else {
                Err(CollectionError::InvalidFilter(format!("unknown colour '{c}'")))
            }
        })
        .collect()
}

/// Case-insensitive pattern
fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub pattern: Option<Regex>,
    pub fields: TextFields,
    pub border_colors: Option<BTreeSet<String>>,
    /// Every colour here must be in the card's colour identity
    pub color_identity: Option<BTreeSet<String>>,
    pub cmc: Option<f64>,
    /// Every format must report legal or restricted
    pub formats: Vec<String>,
    /// Every pattern must match one of the card's keywords
    pub keywords: Vec<Regex>,
    pub mana_cost: Option<String>,
    pub price: Option<PriceFilter>,
}

impl CardFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: &str, fields: TextFields) -> Result<Self> {
        self.pattern = Some(compile(pattern)?);
        self.fields = fields;
        Ok(self)
    }

    pub fn with_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Result<Self> {
        self.keywords = keywords
            .iter()
            .map(|k| compile(k.as_ref()))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn with_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// True if nothing is configured, so every card passes
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.border_colors.is_none()
            && self.color_identity.is_none()
            && self.cmc.is_none()
            && self.formats.is_empty()
            && self.keywords.is_empty()
            && self.mana_cost.is_none()
            && self.price.is_none()
    }

    pub fn matches(&self, card: &NormalizedCard) -> bool {
        self.text_matches(&card.card)
            && self.attributes_match(&card.card)
            && self.price.map_or(true, |p| p.matches(card.price()))
    }

    fn text_matches(&self, card: &ReferenceCard) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };
        let faces = card.faces();
        if faces.is_empty() {
            return self.fields_match(
                pattern,
                card.printed_name.as_deref(),
                &card.name,
                card.oracle_text.as_deref(),
                card.type_line.as_deref(),
            );
        }
        faces.iter().any(|face| {
            self.fields_match(
                pattern,
                face.printed_name.as_deref(),
                &face.name,
                face.oracle_text.as_deref(),
                face.type_line.as_deref(),
            )
        })
    }

    fn fields_match(
        &self,
        pattern: &Regex,
        printed_name: Option<&str>,
        name: &str,
        text: Option<&str>,
        type_line: Option<&str>,
    ) -> bool {
        let is_match = |s: Option<&str>| s.is_some_and(|s| pattern.is_match(s));
        (self.fields.name && (is_match(printed_name) || pattern.is_match(name)))
            || (self.fields.text && is_match(text))
            || (self.fields.type_line && is_match(type_line))
    }

    fn attributes_match(&self, card: &ReferenceCard) -> bool {
        if let Some(borders) = &self.border_colors {
            if !borders.contains(&card.border_color) {
                return false;
            }
        }
        if let Some(colors) = &self.color_identity {
            if !colors.iter().all(|c| card.color_identity.contains(c)) {
                return false;
            }
        }
        if let Some(cmc) = self.cmc {
            let faces = card.faces();
            let hit = |value: Option<f64>| value.is_some_and(|v| (v - cmc).abs() < f64::EPSILON);
            let matched = if faces.is_empty() {
                hit(card.cmc)
            } else {
                faces.iter().any(|face| hit(face.cmc.or(card.cmc)))
            };
            if !matched {
                return false;
            }
        }
        if !self
            .formats
            .iter()
            .all(|f| card.legality(f).is_some_and(|l| l.is_playable()))
        {
            return false;
        }
        if !self
            .keywords
            .iter()
            .all(|k| card.keywords.iter().any(|kw| k.is_match(kw)))
        {
            return false;
        }
        if let Some(cost) = &self.mana_cost {
            let faces = card.faces();
            let matched = if faces.is_empty() {
                card.mana_cost.as_deref() == Some(cost.as_str())
            } else {
                faces
                    .iter()
                    .any(|face| face.mana_cost.as_deref() == Some(cost.as_str()))
            };
            if !matched {
                return false;
            }
        }
        true
    }
}
