//! Historical rarity resolution.
//!
//! A card's rarity can change between reprints. For every owned card we track
//! the earliest and latest English printing of the same oracle card and use
//! them as `rarity_orig` and `rarity_recent`.
//!
//! The normalizer needs two passes over the reference data: [`discover`]
//! collects the oracle IDs of owned printings, then [`observe`] is fed every
//! card during the correlation pass. [`resolve`] runs over the finished output
//! and [`log_changes_and_cleanup`] consumes the normalizer at the end of the run.
//!
//! [`discover`]: RarityNormalizer::discover
//! [`observe`]: RarityNormalizer::observe
//! [`resolve`]: RarityNormalizer::resolve
//! [`log_changes_and_cleanup`]: RarityNormalizer::log_changes_and_cleanup

use crate::error::Result;
use crate::import::ImportCollection;
use crate::models::{NormalizedCard, ReferenceCard};
use crate::reference::{for_each_card, ReferenceSource};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::ControlFlow;

lazy_static! {
    /// Release of Eighth Edition and the modern card frame. A rarity change
    /// that never moved again after this date is treated as the original one.
    pub static ref HISTORICAL_CUTOFF: NaiveDate =
        NaiveDate::from_ymd_opt(2003, 7, 28).expect("cutoff is a valid date");
}

/// Set categories whose printings say nothing about a card's real rarity
pub const EXCLUDED_SET_TYPES: &[&str] = &[
    "promo",
    "token",
    "memorabilia",
    "funny",
    "alchemy",
    "minigame",
    "treasure_chest",
    "vanguard",
];

const SPECIAL_RARITY: &str = "special";

/// Whether a printing counts towards a rarity timeline
fn is_observable(card: &ReferenceCard) -> bool {
    card.is_english()
        && card.rarity != SPECIAL_RARITY
        && !EXCLUDED_SET_TYPES.contains(&card.set_type.as_str())
        && card.released_at.is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Printing {
    released_at: NaiveDate,
    rarity: String,
    set: String,
}

#[derive(Debug, Clone)]
struct Timeline {
    earliest: Printing,
    latest: Printing,
}

/// A recorded substitution of `rarity_orig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityOverride {
    /// Rarity of the earliest tracked printing
    pub from: String,
    /// Rarity of the latest tracked printing, now used as the original
    pub to: String,
    /// Set of the latest tracked printing
    pub set: String,
}

/// Per-run rarity tracker
#[derive(Debug)]
pub struct RarityNormalizer {
    cutoff: NaiveDate,
    oracle_ids: HashSet<String>,
    /// Stream position of the last printing that can change a tracked timeline
    horizon: Option<usize>,
    timelines: HashMap<String, Timeline>,
    overrides: BTreeMap<String, RarityOverride>,
}

impl Default for RarityNormalizer {
    fn default() -> Self {
        Self::with_cutoff(*HISTORICAL_CUTOFF)
    }
}

impl RarityNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cutoff(cutoff: NaiveDate) -> Self {
        Self {
            cutoff,
            oracle_ids: HashSet::new(),
            horizon: None,
            timelines: HashMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Pass A: stream the whole dataset and remember the oracle ID of every
    /// English printing present in the collection.
    ///
    /// Also records the position of the last printing [`observe`] would use
    /// for a tracked oracle ID, see [`has_observed_all`].
    ///
    /// Returns the number of oracle IDs being tracked.
    ///
    /// [`observe`]: RarityNormalizer::observe
    /// [`has_observed_all`]: RarityNormalizer::has_observed_all
    pub fn discover<S>(&mut self, source: &S, collection: &ImportCollection) -> Result<usize>
    where
        S: ReferenceSource + ?Sized,
    {
        let mut last_printing: HashMap<String, usize> = HashMap::new();
        let mut position = 0usize;
        for_each_card(source, |card| {
            self.track_if_owned(&card, collection);
            if let Some(oracle_id) = card.oracle_id.as_deref().filter(|_| is_observable(&card)) {
                last_printing.insert(oracle_id.to_string(), position);
            }
            position += 1;
            Ok(ControlFlow::Continue(()))
        })?;

        self.horizon = self
            .oracle_ids
            .iter()
            .filter_map(|id| last_printing.get(id).copied())
            .max();
        info!("Tracking rarity history for {} cards", self.oracle_ids.len());
        debug!("Last relevant printing at stream position {:?}", self.horizon);
        Ok(self.oracle_ids.len())
    }

    /// True once the card at `position` (counted over `card` objects, as in
    /// [`discover`]) is at or past the last printing of any tracked card.
    /// Stopping the stream from then on cannot change a resolved rarity.
    ///
    /// [`discover`]: RarityNormalizer::discover
    pub fn has_observed_all(&self, position: usize) -> bool {
        self.horizon.map_or(true, |horizon| position >= horizon)
    }

    /// Add the oracle ID of `card` to the working set if it is an owned
    /// English printing
    pub fn track_if_owned(&mut self, card: &ReferenceCard, collection: &ImportCollection) {
        if !card.is_english() || !collection.has(&card.id) {
            return;
        }
        if let Some(oracle_id) = &card.oracle_id {
            self.oracle_ids.insert(oracle_id.clone());
        }
    }

    pub fn is_tracked(&self, oracle_id: &str) -> bool {
        self.oracle_ids.contains(oracle_id)
    }

    /// Pass B: update the printing timeline with one reference card
    pub fn observe(&mut self, card: &ReferenceCard) {
        let Some(oracle_id) = card.oracle_id.as_deref() else {
            return;
        };
        if !self.oracle_ids.contains(oracle_id) || !is_observable(card) {
            return;
        }
        let Some(released_at) = card.released_at else {
            return;
        };

        let printing = Printing {
            released_at,
            rarity: card.rarity.clone(),
            set: card.set.clone(),
        };
        match self.timelines.get_mut(oracle_id) {
            Some(timeline) => {
                if printing.released_at < timeline.earliest.released_at {
                    timeline.earliest = printing.clone();
                }
                if printing.released_at > timeline.latest.released_at {
                    timeline.latest = printing;
                }
            }
            None => {
                self.timelines.insert(
                    oracle_id.to_string(),
                    Timeline {
                        earliest: printing.clone(),
                        latest: printing,
                    },
                );
            }
        }
    }

    /// Set `rarity_orig` and `rarity_recent` on a correlated card
    pub fn resolve(&mut self, card: &mut NormalizedCard) {
        let timeline = card
            .card
            .oracle_id
            .as_deref()
            .and_then(|id| self.timelines.get(id));

        let Some(timeline) = timeline else {
            card.rarity_orig = card.card.rarity.clone();
            card.rarity_recent = card.card.rarity.clone();
            return;
        };

        card.rarity_orig = timeline.earliest.rarity.clone();
        card.rarity_recent = timeline.latest.rarity.clone();

        if timeline.latest.released_at < self.cutoff && card.rarity_recent != card.rarity_orig {
            debug!(
                "{}: using {} rarity '{}' instead of '{}'",
                card.name(),
                timeline.latest.set,
                card.rarity_recent,
                card.rarity_orig
            );
            self.overrides
                .entry(card.name().to_string())
                .or_insert_with(|| RarityOverride {
                    from: card.rarity_orig.clone(),
                    to: card.rarity_recent.clone(),
                    set: timeline.latest.set.clone(),
                });
            card.rarity_orig = card.rarity_recent.clone();
        }
    }

    /// Log every recorded override, sorted by card name, and release the
    /// working state. Returns the overrides for callers that report them.
    pub fn log_changes_and_cleanup(self) -> BTreeMap<String, RarityOverride> {
        if !self.overrides.is_empty() {
            info!(
                "Historical rarity applied to {} cards:",
                self.overrides.len()
            );
            for (name, change) in &self.overrides {
                info!(
                    "  {}: {} -> {} (last printed in {})",
                    name, change.from, change.to, change.set
                );
            }
        }
        self.overrides
    }
}
