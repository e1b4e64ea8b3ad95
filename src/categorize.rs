//! Sorting a collection into format, rarity and kind buckets.
//!
//! Every level uses the same [`Bucket`] type: a name plus the items of that
//! level. Cards end up three levels deep:
//! format bucket -> rarity bucket -> kind bucket -> cards.

use crate::models::{origin_in_group, BucketPath, Group, GroupMap, Mark, NormalizedCard};
use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Conventional maximum number of copies of one card in a deck
pub const MAX_COPIES: u32 = 4;

/// Formats whose rarity rules use the card's original rarity
pub const LEGACY_RULES_FORMATS: &[&str] = &["oldschool", "premodern"];

pub const BASIC_LAND_BUCKET: &str = "Basic Land";
pub const UNSORTED_BUCKET: &str = "Unsorted";

const RARITY_ORDER: &[&str] = &["mythic", "rare", "uncommon", "common", "special", "bonus"];

const DEVOID: &str = "devoid";

lazy_static! {
    static ref COST_SYMBOL: Regex = Regex::new(r"\{([^}]+)\}").expect("cost symbol pattern is valid");
}

/// Colour and type based kind of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    White,
    Blue,
    Black,
    Red,
    Green,
    Multicolor,
    Artifact,
    Colorless,
    Land,
    BasicLand,
    Unsorted,
}

impl Kind {
    pub const ALL: [Kind; 11] = [
        Kind::White,
        Kind::Blue,
        Kind::Black,
        Kind::Red,
        Kind::Green,
        Kind::Multicolor,
        Kind::Artifact,
        Kind::Colorless,
        Kind::Land,
        Kind::BasicLand,
        Kind::Unsorted,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Kind::White => "W",
            Kind::Blue => "U",
            Kind::Black => "B",
            Kind::Red => "R",
            Kind::Green => "G",
            Kind::Multicolor => "Multicolor",
            Kind::Artifact => "Artifact",
            Kind::Colorless => "Colorless",
            Kind::Land => "Land",
            Kind::BasicLand => BASIC_LAND_BUCKET,
            Kind::Unsorted => UNSORTED_BUCKET,
        }
    }

    fn from_color(color: &str) -> Option<Self> {
        match color {
            "W" => Some(Kind::White),
            "U" => Some(Kind::Blue),
            "B" => Some(Kind::Black),
            "R" => Some(Kind::Red),
            "G" => Some(Kind::Green),
            _ => None,
        }
    }
}

/// A named group of items; items are cards or nested buckets
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<T> {
    pub name: String,
    pub items: Vec<T>,
}

pub type KindBucket = Bucket<NormalizedCard>;
pub type RarityBucket = Bucket<KindBucket>;
pub type FormatBucket = Bucket<RarityBucket>;

impl<T> Bucket<T> {
    pub fn new<S: Into<String>>(name: S, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn find(&self, name: &str) -> Option<&T>
    where
        T: Named,
    {
        self.items.iter().find(|item| item.name() == name)
    }
}

/// Anything addressable by bucket name
pub trait Named {
    fn name(&self) -> &str;
}

impl<T> Named for Bucket<T> {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortOptions {
    /// Order cards by normalised type before name
    pub by_type: bool,
}

/// Operations shared by cards and every bucket level
pub trait CardTree: Sized {
    fn card_count(&self) -> usize;

    fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a NormalizedCard));

    /// Sort this node's contents
    fn sort(&mut self, _options: &SortOptions) {}

    /// Order a list of siblings of this type
    fn sort_siblings(_items: &mut [Self], _options: &SortOptions) {}
}

impl CardTree for NormalizedCard {
    fn card_count(&self) -> usize {
        1
    }

    fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a NormalizedCard)) {
        f(self)
    }

    fn sort_siblings(items: &mut [Self], options: &SortOptions) {
        items.sort_by(|a, b| compare_cards(a, b, options));
    }
}

impl<T: CardTree> CardTree for Bucket<T> {
    fn card_count(&self) -> usize {
        self.items.iter().map(CardTree::card_count).sum()
    }

    fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a NormalizedCard)) {
        for item in &self.items {
            item.visit(f);
        }
    }

    fn sort(&mut self, options: &SortOptions) {
        for item in &mut self.items {
            item.sort(options);
        }
        T::sort_siblings(&mut self.items, options);
    }
}

/// Name ascending, then price descending with unpriced cards last.
/// Optionally grouped by normalised type first.
pub fn compare_cards(a: &NormalizedCard, b: &NormalizedCard, options: &SortOptions) -> Ordering {
    let by_type = if options.by_type {
        a.type_label.cmp(&b.type_label)
    } else {
        Ordering::Equal
    };
    by_type.then_with(|| a.name().cmp(b.name())).then_with(|| {
        match (a.price(), b.price()) {
            (Some(pa), Some(pb)) => pb.partial_cmp(&pa).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    })
}

/// Split `items` into buckets named by `classify`.
///
/// Buckets named in `order` come first in that order, any others follow
/// alphabetically. Empty buckets are not created. Items keep their relative
/// order within a bucket.
pub fn partition<T, F>(items: Vec<T>, order: &[&str], mut classify: F) -> Vec<Bucket<T>>
where
    F: FnMut(&T) -> String,
{
    let mut grouped: BTreeMap<(usize, String), Vec<T>> = BTreeMap::new();
    for item in items {
        let name = classify(&item);
        let rank = order
            .iter()
            .position(|o| *o == name)
            .unwrap_or(order.len());
        grouped.entry((rank, name)).or_default().push(item);
    }
    grouped
        .into_iter()
        .map(|((_, name), items)| Bucket::new(name, items))
        .collect()
}

/// Colour letters of a mana cost, in WUBRG order
fn colors_from_cost(cost: &str) -> Vec<String> {
    let mut found = BTreeSet::new();
    for symbol in COST_SYMBOL.captures_iter(cost) {
        for c in symbol[1].chars() {
            if let Some(pos) = "WUBRG".find(c) {
                found.insert(pos);
            }
        }
    }
    found
        .into_iter()
        .filter_map(|pos| "WUBRG".get(pos..pos + 1))
        .map(str::to_string)
        .collect()
}

fn card_costs(card: &NormalizedCard) -> String {
    let faces = card.card.faces();
    if faces.is_empty() {
        card.card.mana_cost.clone().unwrap_or_default()
    } else {
        faces
            .iter()
            .filter_map(|face| face.mana_cost.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

fn colorless_kind(card: &NormalizedCard) -> Kind {
    let Some(type_line) = card.card.primary_type_line() else {
        return Kind::Unsorted;
    };
    let lower = type_line.to_lowercase();
    if lower.contains("land") {
        if lower.contains("basic") {
            Kind::BasicLand
        } else {
            Kind::Land
        }
    } else if lower.contains("artifact") {
        Kind::Artifact
    } else {
        Kind::Colorless
    }
}

/// Kind bucket of a card
pub fn kind_of(card: &NormalizedCard) -> Kind {
    let Some(mut colors) = card.card.all_colors() else {
        return Kind::Unsorted;
    };
    let devoid = card
        .card
        .keywords
        .iter()
        .any(|k| k.eq_ignore_ascii_case(DEVOID));
    if colors.is_empty() && devoid {
        colors = colors_from_cost(&card_costs(card));
    }
    match colors.as_slice() {
        [] => colorless_kind(card),
        [color] => Kind::from_color(color).unwrap_or(Kind::Unsorted),
        _ => Kind::Multicolor,
    }
}

/// Format bucket name of a card: basic lands first, then the first format in
/// `formats` the card is legal or restricted in
pub fn format_of(card: &NormalizedCard, formats: &[String]) -> String {
    if card.card.is_basic_land() {
        return BASIC_LAND_BUCKET.to_string();
    }
    formats
        .iter()
        .find(|f| card.card.legality(f).is_some_and(|l| l.is_playable()))
        .cloned()
        .unwrap_or_else(|| UNSORTED_BUCKET.to_string())
}

/// Rarity used for a format bucket
pub fn rarity_for_format<'a>(card: &'a NormalizedCard, format: &str) -> &'a str {
    if LEGACY_RULES_FORMATS.contains(&format) {
        &card.rarity_orig
    } else {
        &card.rarity_recent
    }
}

/// Mark cards from `marked` origins against the rest of the bucket.
///
/// Unmarked cards and proxies never carry a mark afterwards.
pub fn apply_merge_marks(cards: &mut [NormalizedCard], marked: &BTreeSet<String>, groups: &GroupMap) {
    let is_candidate =
        |card: &NormalizedCard| !origin_in_group(groups, &card.origin, Group::Proxy);

    let mut by_oracle: HashMap<String, u32> = HashMap::new();
    let mut by_identity: HashMap<String, u32> = HashMap::new();
    for card in cards.iter() {
        if !is_candidate(card) || marked.contains(&card.origin) {
            continue;
        }
        *by_oracle.entry(card.oracle_id().to_string()).or_default() += card.quantity;
        *by_identity.entry(card.card.id.clone()).or_default() += card.quantity;
    }

    for card in cards.iter_mut() {
        if !is_candidate(&*card) || !marked.contains(&card.origin) {
            card.mark = None;
            continue;
        }
        let mark = if !by_oracle.contains_key(card.oracle_id()) {
            Mark::Ok
        } else if by_identity.get(&card.card.id).copied().unwrap_or(0) + card.quantity > MAX_COPIES {
            Mark::Error
        } else {
            Mark::Warning
        };
        card.mark = Some(mark);
    }
}

/// Builds the bucket hierarchy for a set of legality lists
#[derive(Debug, Clone, Default)]
pub struct Categorizer {
    formats: Vec<String>,
    groups: GroupMap,
    marked: BTreeSet<String>,
    sort: SortOptions,
}

impl Categorizer {
    /// `formats` are tried in order; a card goes to the first it is legal in
    pub fn new<S: Into<String>>(formats: impl IntoIterator<Item = S>) -> Self {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_groups(mut self, groups: GroupMap) -> Self {
        self.groups = groups;
        self
    }

    /// Origin file names whose cards are checked for merge conflicts
    pub fn with_marked<S: Into<String>>(mut self, origins: impl IntoIterator<Item = S>) -> Self {
        self.marked = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort(mut self, sort: SortOptions) -> Self {
        self.sort = sort;
        self
    }

    pub fn categorize(&self, cards: Vec<NormalizedCard>) -> Vec<FormatBucket> {
        let total = cards.len();
        let mut order: Vec<&str> = vec![BASIC_LAND_BUCKET];
        order.extend(self.formats.iter().map(String::as_str));
        order.push(UNSORTED_BUCKET);

        let kind_order: Vec<&str> = Kind::ALL.iter().map(Kind::label).collect();

        let mut buckets: Vec<FormatBucket> = partition(cards, &order, |c| format_of(c, &self.formats))
            .into_iter()
            .map(|mut format_bucket| {
                if !self.marked.is_empty() {
                    apply_merge_marks(&mut format_bucket.items, &self.marked, &self.groups);
                }
                let format = format_bucket.name.clone();
                let rarities = partition(format_bucket.items, RARITY_ORDER, |c| {
                    rarity_for_format(c, &format).to_string()
                })
                .into_iter()
                .map(|rarity_bucket| {
                    let kinds = partition(rarity_bucket.items, &kind_order, |c| {
                        kind_of(c).label().to_string()
                    });
                    Bucket::new(rarity_bucket.name, kinds)
                })
                .collect();
                Bucket::new(format, rarities)
            })
            .collect();

        for bucket in &mut buckets {
            bucket.sort(&self.sort);
        }

        for bucket in &buckets {
            info!("{}: {} cards", bucket.name, bucket.card_count());
        }
        debug_assert_eq!(total, buckets.iter().map(CardTree::card_count).sum::<usize>());
        buckets
    }
}

/// Cards of a bucket hierarchy in bucket order
pub fn flatten(buckets: &[FormatBucket]) -> Vec<&NormalizedCard> {
    let mut cards = Vec::new();
    for bucket in buckets {
        bucket.visit(&mut |card| cards.push(card));
    }
    cards
}

/// Take the cards back out of a bucket hierarchy, in bucket order.
///
/// Each card keeps the names of its buckets in [`NormalizedCard::bucket`], so a
/// saved category database still describes its hierarchy after `save` has
/// reordered it by name.
pub fn into_cards(buckets: Vec<FormatBucket>) -> Vec<NormalizedCard> {
    let mut cards = Vec::new();
    for format in buckets {
        for rarity in format.items {
            for kind in rarity.items {
                for mut card in kind.items {
                    card.bucket = Some(BucketPath {
                        format: format.name.clone(),
                        rarity: rarity.name.clone(),
                        kind: kind.name.clone(),
                    });
                    cards.push(card);
                }
            }
        }
    }
    cards
}

/// Text overview of a bucket hierarchy with card counts per level
pub fn format_summary(buckets: &[FormatBucket]) -> String {
    let mut output = String::new();
    for format in buckets {
        output.push_str(&format!("{} ({} cards)\n", format.name, format.card_count()));
        for rarity in &format.items {
            output.push_str(&format!("  {} ({})\n", rarity.name, rarity.card_count()));
            for kind in &rarity.items {
                let marks = kind
                    .items
                    .iter()
                    .filter(|c| c.mark == Some(Mark::Error))
                    .count();
                if marks > 0 {
                    output.push_str(&format!(
                        "    {}: {} ({} over the copy limit)\n",
                        kind.name,
                        kind.card_count(),
                        marks
                    ));
                } else {
                    output.push_str(&format!("    {}: {}\n", kind.name, kind.card_count()));
                }
            }
        }
    }
    output
}

#[cfg(test)]
#[path = "categorize_tests.rs"]
mod tests;
