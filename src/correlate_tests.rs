//! Tests for correlation of owned records with reference data.

use super::*;
use crate::error::CollectionError;
use crate::import::ImportIndex;
use crate::models::{Finish, Group};
use serde_json::{json, Value};

const BOLT_2X2: &str = "e3285e6b-3e79-4d7c-bf96-d920f973b122";
const BOLT_LEA: &str = "bd8fa327-dd41-4737-8f19-2cf5eb1f7cdd";
const COUNTERSPELL: &str = "1920dae4-fb92-4f19-ae4b-eb3276b8dac7";
const MISSING: &str = "00000000-0000-4000-8000-000000000000";

fn reference(id: &str, oracle: &str, name: &str, date: &str, rarity: &str) -> Value {
    json!({
        "object": "card",
        "id": id,
        "oracle_id": oracle,
        "name": name,
        "lang": "en",
        "released_at": date,
        "set": "tst",
        "set_name": "Test Set",
        "set_type": "expansion",
        "rarity": rarity,
        "type_line": "Instant",
        "colors": ["R"],
        "legalities": {"modern": "legal"}
    })
}

fn dataset(cards: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&Value::Array(cards)).unwrap()
}

fn collection(files: &[(&str, &str)]) -> ImportCollection {
    let mut collection = ImportCollection::new();
    for (origin, content) in files {
        let mut index = ImportIndex::new();
        index.import_reader(content.as_bytes(), origin).unwrap();
        collection.push(index);
    }
    collection
}

fn full_pass() -> CorrelateOptions {
    CorrelateOptions {
        stop_when_consumed: false,
    }
}

#[test]
fn test_emits_one_card_per_matching_record() {
    let data = dataset(vec![
        reference(BOLT_LEA, "bolt", "Lightning Bolt", "1993-08-05", "common"),
        reference(BOLT_2X2, "bolt", "Lightning Bolt", "2022-07-08", "uncommon"),
    ]);
    let mut collection = collection(&[
        (
            "binder.csv",
            &format!("Scryfall ID,Quantity,Foil\n{BOLT_2X2},2,normal\n{BOLT_2X2},1,foil\n"),
        ),
        ("deck.csv", &format!("Scryfall ID,Quantity\n{BOLT_2X2},4\n")),
    ]);
    collection.tag_group(Group::Decks, ["deck.csv"]);

    let report = correlate(&data, &mut collection, &full_pass()).unwrap();

    assert_eq!(report.cards.len(), 3);
    assert_eq!(report.total_quantity, 7);
    assert!(report.unmatched.is_empty());
    assert!(report.cards.iter().all(|c| c.type_label == "Instant"));
    assert_eq!(
        report
            .cards
            .iter()
            .filter(|c| c.variant.finish == Finish::Foil)
            .count(),
        1
    );
    // Group tags survive consumption
    assert!(collection.groups().contains_key(&Group::Decks));
    assert!(collection.is_empty());
}

#[test]
fn test_unmatched_records_are_reported_not_emitted() {
    let data = dataset(vec![reference(
        BOLT_2X2,
        "bolt",
        "Lightning Bolt",
        "2022-07-08",
        "uncommon",
    )]);
    let mut collection = collection(&[(
        "binder.csv",
        &format!("Name,Scryfall ID,Quantity\nLightning Bolt,{BOLT_2X2},1\nGhost,{MISSING},2\n"),
    )]);

    let report = correlate(&data, &mut collection, &CorrelateOptions::default()).unwrap();

    assert_eq!(report.cards.len(), 1);
    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.unmatched[0].identity, MISSING);
    assert_eq!(report.unmatched[0].name.as_deref(), Some("Ghost"));
    assert_eq!(report.unmatched[0].quantity, 2);
}

#[test]
fn test_resolves_rarity_across_reprints() {
    let data = dataset(vec![
        reference(BOLT_2X2, "bolt", "Lightning Bolt", "2022-07-08", "uncommon"),
        reference(BOLT_LEA, "bolt", "Lightning Bolt", "1993-08-05", "common"),
        reference(COUNTERSPELL, "counter", "Counterspell", "1993-08-05", "uncommon"),
    ]);
    let mut collection = collection(&[(
        "binder.csv",
        &format!("Scryfall ID,Quantity\n{BOLT_2X2},1\n{COUNTERSPELL},1\n"),
    )]);

    let report = correlate(&data, &mut collection, &full_pass()).unwrap();
    let bolt = report.cards.iter().find(|c| c.name() == "Lightning Bolt").unwrap();
    let counter = report.cards.iter().find(|c| c.name() == "Counterspell").unwrap();

    assert_eq!(bolt.rarity_orig, "common");
    assert_eq!(bolt.rarity_recent, "uncommon");
    assert_eq!(counter.rarity_orig, "uncommon");
    assert_eq!(counter.rarity_recent, "uncommon");
    assert!(report.rarity_overrides.is_empty());
}

const HYMN_FEM: &str = "0a0c6f2e-8e0b-4a31-9d0c-5b8a2f1c7e11";
const HYMN_REPRINT: &str = "7f3e2d1c-4b5a-4c6d-8e9f-0a1b2c3d4e5f";

fn rarities(report: &CorrelationReport) -> Vec<(String, String, String)> {
    report
        .cards
        .iter()
        .map(|c| (c.name().to_string(), c.rarity_orig.clone(), c.rarity_recent.clone()))
        .collect()
}

#[test]
fn test_early_stop_keeps_reprints_after_last_owned_card() {
    let data = dataset(vec![
        reference(HYMN_FEM, "hymn", "Hymn to Tourach", "2010-01-01", "common"),
        reference(HYMN_REPRINT, "hymn", "Hymn to Tourach", "2020-01-01", "rare"),
        reference(BOLT_2X2, "bolt", "Lightning Bolt", "2022-07-08", "uncommon"),
        reference(BOLT_LEA, "bolt", "Lightning Bolt", "1993-08-05", "common"),
    ]);
    let csv = format!("Scryfall ID,Quantity\n{HYMN_FEM},1\n{BOLT_2X2},1\n");

    let mut stopped = collection(&[("binder.csv", &csv)]);
    let early = correlate(&data, &mut stopped, &CorrelateOptions::default()).unwrap();
    let mut full = collection(&[("binder.csv", &csv)]);
    let complete = correlate(&data, &mut full, &full_pass()).unwrap();

    assert_eq!(rarities(&early), rarities(&complete));
    let hymn = early.cards.iter().find(|c| c.name() == "Hymn to Tourach").unwrap();
    assert_eq!(hymn.rarity_orig, "common");
    assert_eq!(hymn.rarity_recent, "rare");
    let bolt = early.cards.iter().find(|c| c.name() == "Lightning Bolt").unwrap();
    assert_eq!(bolt.rarity_orig, "common");
}

#[test]
fn test_early_stop_skips_unrelated_tail() {
    let data = dataset(vec![
        reference(BOLT_LEA, "bolt", "Lightning Bolt", "1993-08-05", "common"),
        reference(BOLT_2X2, "bolt", "Lightning Bolt", "2022-07-08", "uncommon"),
        reference(COUNTERSPELL, "counter", "Counterspell", "1993-08-05", "uncommon"),
    ]);
    let csv = format!("Scryfall ID,Quantity\n{BOLT_2X2},1\n");

    let mut stopped = collection(&[("binder.csv", &csv)]);
    let early = correlate(&data, &mut stopped, &CorrelateOptions::default()).unwrap();
    let mut full = collection(&[("binder.csv", &csv)]);
    let complete = correlate(&data, &mut full, &full_pass()).unwrap();

    assert!(early.stopped_early);
    assert!(!complete.stopped_early);
    assert_eq!(rarities(&early), rarities(&complete));
}

#[test]
fn test_card_without_type_line_fails_the_run() {
    let mut card = reference(BOLT_2X2, "bolt", "Lightning Bolt", "2022-07-08", "uncommon");
    card.as_object_mut().unwrap().remove("type_line");
    let data = dataset(vec![card]);
    let mut collection = collection(&[("binder.csv", &format!("Scryfall ID,Quantity\n{BOLT_2X2},1\n"))]);

    let result = correlate(&data, &mut collection, &full_pass());
    assert!(matches!(result, Err(CollectionError::MissingTypeLine { .. })));
}

#[test]
fn test_unowned_cards_without_type_line_are_ignored() {
    let mut stray = reference(BOLT_LEA, "bolt", "Lightning Bolt", "1993-08-05", "common");
    stray.as_object_mut().unwrap().remove("type_line");
    let data = dataset(vec![
        stray,
        reference(BOLT_2X2, "bolt", "Lightning Bolt", "2022-07-08", "uncommon"),
    ]);
    let mut collection = collection(&[("binder.csv", &format!("Scryfall ID,Quantity\n{BOLT_2X2},1\n"))]);

    let report = correlate(&data, &mut collection, &full_pass()).unwrap();
    assert_eq!(report.cards.len(), 1);
}
