//! Type line classification.
//!
//! Maps a free-text type line ("Legendary Artifact Creature — Golem") onto one
//! of a small set of labels used for sorting and reporting.

use crate::error::{CollectionError, Result};
use crate::models::ReferenceCard;
use log::debug;

/// Land sub-kinds, highest priority first
const LAND_KINDS: &[(&str, &str)] = &[
    ("saga", "Saga Land"),
    ("artifact", "Artifact Land"),
    ("legendary", "Legendary Land"),
];

/// Base types in resolution order, after artifacts
const BASE_TYPES: &[(&str, &str)] = &[
    ("creature", "Creature"),
    ("enchantment", "Enchantment"),
    ("instant", "Instant"),
    ("sorcery", "Sorcery"),
    ("planeswalker", "Planeswalker"),
    ("battle", "Battle"),
];

/// Artifact sub-kinds, in resolution order
const ARTIFACT_KINDS: &[(&str, &str)] = &[
    ("creature", "Artifact Creature"),
    ("equipment", "Equipment"),
    ("vehicle", "Vehicle"),
];

fn land_label(lower: &str) -> &'static str {
    if let Some((_, label)) = LAND_KINDS.iter().find(|(needle, _)| lower.contains(needle)) {
        return *label;
    }
    match (lower.contains("snow"), lower.contains("basic")) {
        (true, true) => "Snow Basic Land",
        (true, false) => "Snow Land",
        (false, true) => "Basic Land",
        (false, false) => "Land",
    }
}

fn base_label(lower: &str) -> Option<&'static str> {
    // Enchantment creatures are filed as creatures, even artifact ones
    if lower.contains("enchantment") && lower.contains("creature") {
        return Some("Creature");
    }
    if lower.contains("artifact") {
        let label = ARTIFACT_KINDS
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, label)| *label)
            .unwrap_or("Artifact");
        return Some(label);
    }
    BASE_TYPES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, label)| *label)
}

/// Classify a type line. Unrecognised type lines are returned unchanged.
pub fn classify_type_line(type_line: &str) -> String {
    let lower = type_line.to_lowercase();

    if lower.contains("land") {
        return land_label(&lower).to_string();
    }

    match base_label(&lower) {
        Some(label) if lower.contains("legendary") => format!("{label} - Legendary"),
        Some(label) => label.to_string(),
        None => {
            debug!("Could not classify type line '{type_line}'");
            type_line.to_string()
        }
    }
}

/// Classify a card by its first face's type line, falling back to the card's.
///
/// A card without any type line violates the reference data contract and is
/// reported as an error.
pub fn classify_card(card: &ReferenceCard) -> Result<String> {
    card.primary_type_line()
        .map(classify_type_line)
        .ok_or_else(|| CollectionError::MissingTypeLine {
            card: format!("{} ({})", card.name, card.id),
        })
}
