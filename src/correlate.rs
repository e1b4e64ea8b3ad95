//! Correlation of owned records against the reference data.
//!
//! Joins every owned record with its reference printing in a single streamed
//! pass (after the rarity normalizer's discovery pass), classifies the type
//! line and resolves historical rarity. Records that never match are reported.

use crate::classify::classify_card;
use crate::error::Result;
use crate::import::ImportCollection;
use crate::json_stream::StreamEnd;
use crate::models::{NormalizedCard, OwnedCardRecord};
use crate::rarity::{RarityNormalizer, RarityOverride};
use crate::reference::{for_each_card, ReferenceSource};
use log::{info, warn};
use std::collections::BTreeMap;
use std::ops::ControlFlow;

#[derive(Debug, Clone)]
pub struct CorrelateOptions {
    /// Stop reading the reference data once every owned record is matched
    /// and every printing the rarity history needs has been seen
    pub stop_when_consumed: bool,
}

impl Default for CorrelateOptions {
    fn default() -> Self {
        Self {
            stop_when_consumed: true,
        }
    }
}

/// Output of a correlation run
#[derive(Debug, Default)]
pub struct CorrelationReport {
    pub cards: Vec<NormalizedCard>,
    /// Sum of quantities of all correlated cards
    pub total_quantity: u64,
    /// Owned records whose Scryfall ID never appeared in the reference data
    pub unmatched: Vec<OwnedCardRecord>,
    /// Cards whose original rarity was replaced, by name
    pub rarity_overrides: BTreeMap<String, RarityOverride>,
    /// The reference data was not read to the end
    pub stopped_early: bool,
}

/// Correlate `collection` against the reference data.
///
/// Matched identities are removed from `collection` as they are consumed; its
/// group tags are left in place for the caller.
pub fn correlate<S>(
    source: &S,
    collection: &mut ImportCollection,
    options: &CorrelateOptions,
) -> Result<CorrelationReport>
where
    S: ReferenceSource + ?Sized,
{
    let mut normalizer = RarityNormalizer::new();
    normalizer.discover(source, collection)?;

    let mut cards = Vec::new();
    let mut total_quantity = 0u64;
    let mut position = 0usize;

    let end = for_each_card(source, |card| {
        let current = position;
        position += 1;
        normalizer.observe(&card);

        let owned: Vec<OwnedCardRecord> = collection.get(&card.id).into_iter().cloned().collect();
        if !owned.is_empty() {
            let type_label = classify_card(&card)?;
            for record in &owned {
                total_quantity += u64::from(record.quantity);
                cards.push(NormalizedCard::new(card.clone(), record, type_label.clone()));
            }
            collection.delete(&card.id);
        }

        if options.stop_when_consumed
            && collection.is_empty()
            && normalizer.has_observed_all(current)
        {
            Ok(ControlFlow::Break(()))
        } else {
            Ok(ControlFlow::Continue(()))
        }
    })?;

    let stopped_early = end == StreamEnd::Stopped;
    if stopped_early {
        info!("All owned cards and reprints seen, stopped reading reference data early");
    }

    for card in &mut cards {
        normalizer.resolve(card);
    }
    let rarity_overrides = normalizer.log_changes_and_cleanup();

    let unmatched: Vec<OwnedCardRecord> = collection.remaining().cloned().collect();
    for record in &unmatched {
        warn!(
            "No reference card for {} ({}) x{} from {}",
            record.name.as_deref().unwrap_or("<unnamed>"),
            record.identity,
            record.quantity,
            record.origin
        );
    }

    info!(
        "Correlated {} cards ({} copies), {} unmatched",
        cards.len(),
        total_quantity,
        unmatched.len()
    );

    Ok(CorrelationReport {
        cards,
        total_quantity,
        unmatched,
        rarity_overrides,
        stopped_early,
    })
}

#[cfg(test)]
#[path = "correlate_tests.rs"]
mod tests;
