use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Physical finish of an owned card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Finish {
    #[default]
    Normal,
    Foil,
    Etched,
}

impl Finish {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finish::Normal => "normal",
            Finish::Foil => "foil",
            Finish::Etched => "etched",
        }
    }

    /// Parse a finish column value. Empty values and "normal"/"nonfoil" map to
    /// `Normal`; "true"/"1" (boolean foil columns) map to `Foil`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "normal" | "nonfoil" | "false" | "0" => Some(Finish::Normal),
            "foil" | "true" | "1" => Some(Finish::Foil),
            "etched" => Some(Finish::Etched),
            _ => None,
        }
    }
}

impl fmt::Display for Finish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (finish, declared language) pair distinguishing holdings of one identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Variant {
    pub finish: Finish,
    /// Language as declared by the user, lowercased; empty when not declared
    pub language: String,
}

/// One physical holding group read from an import file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedCardRecord {
    /// Scryfall ID of the printing
    pub identity: String,
    /// Name as declared in the import file, if it has a name column
    pub name: Option<String>,
    pub variant: Variant,
    pub quantity: u32,
    /// File name (not path) the record was read from
    pub origin: String,
    /// Unrecognised columns, kept verbatim for export
    pub extra: BTreeMap<String, String>,
    pub tags: BTreeSet<String>,
}

/// Named groups an import file can belong to. Cards from any group are not
/// part of the owned, exportable inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Cards currently held in built decks
    Decks,
    /// Cards stored outside the main collection
    External,
    /// Proxies, not owned at all
    Proxy,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::Decks, Group::External, Group::Proxy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Decks => "decks",
            Group::External => "external",
            Group::Proxy => "proxy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "decks" | "deck" => Some(Group::Decks),
            "external" => Some(Group::External),
            "proxy" | "proxies" => Some(Group::Proxy),
            _ => None,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group name -> origin file names
pub type GroupMap = BTreeMap<Group, BTreeSet<String>>;

/// Returns true if `origin` is one of the files tagged with `group`
pub fn origin_in_group(groups: &GroupMap, origin: &str, group: Group) -> bool {
    groups
        .get(&group)
        .map(|files| files.contains(origin))
        .unwrap_or(false)
}

/// Format legality as reported by Scryfall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Legality {
    Legal,
    NotLegal,
    Restricted,
    Banned,
    /// Any status this crate does not know about
    #[serde(other)]
    Unknown,
}

impl Legality {
    /// Legal or restricted both count as playable
    pub fn is_playable(&self) -> bool {
        matches!(self, Legality::Legal | Legality::Restricted)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Prices {
    pub usd: Option<String>,
    pub usd_foil: Option<String>,
    pub usd_etched: Option<String>,
    pub eur: Option<String>,
    pub eur_foil: Option<String>,
}

/// One face of a multi-faced card
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CardFace {
    pub name: String,
    pub printed_name: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub mana_cost: Option<String>,
    pub colors: Option<Vec<String>>,
    pub cmc: Option<f64>,
}

/// One printing from the Scryfall bulk data. Every field defaults so that
/// non-card objects in the same array still deserialize and can be skipped.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ReferenceCard {
    pub object: String,
    pub id: String,
    pub oracle_id: Option<String>,
    pub name: String,
    pub printed_name: Option<String>,
    pub lang: String,
    pub released_at: Option<NaiveDate>,
    pub set: String,
    pub set_name: String,
    pub set_type: String,
    pub collector_number: String,
    pub rarity: String,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub colors: Option<Vec<String>>,
    pub color_identity: Vec<String>,
    pub keywords: Vec<String>,
    pub border_color: String,
    pub legalities: BTreeMap<String, Legality>,
    pub prices: Prices,
    pub card_faces: Option<Vec<CardFace>>,
}

impl ReferenceCard {
    pub fn is_card(&self) -> bool {
        self.object == "card"
    }

    pub fn is_english(&self) -> bool {
        self.lang == "en"
    }

    /// Faces of a multi-faced card; empty for single-faced cards
    pub fn faces(&self) -> &[CardFace] {
        self.card_faces.as_deref().unwrap_or(&[])
    }

    /// Type line used for classification: first face, then the card itself
    pub fn primary_type_line(&self) -> Option<&str> {
        self.faces()
            .first()
            .and_then(|face| face.type_line.as_deref())
            .or(self.type_line.as_deref())
    }

    /// Card colours, falling back to the union of face colours. `None` when
    /// neither the card nor any face declares colours.
    pub fn all_colors(&self) -> Option<Vec<String>> {
        if let Some(colors) = &self.colors {
            return Some(colors.clone());
        }
        let mut found: Option<Vec<String>> = None;
        for face in self.faces() {
            if let Some(colors) = &face.colors {
                let acc = found.get_or_insert_with(Vec::new);
                for c in colors {
                    if !acc.contains(c) {
                        acc.push(c.clone());
                    }
                }
            }
        }
        found
    }

    pub fn is_basic_land(&self) -> bool {
        self.primary_type_line()
            .map(|t| {
                let t = t.to_lowercase();
                t.contains("basic") && t.contains("land")
            })
            .unwrap_or(false)
    }

    pub fn legality(&self, format: &str) -> Option<Legality> {
        self.legalities.get(format).copied()
    }
}

/// Merge-conflict classification assigned during categorisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    /// No overlap with the unmarked collection
    Ok,
    /// Same card already present in another printing
    Warning,
    /// Merging would exceed the copy limit for this printing
    Error,
}

/// Format, rarity and kind bucket names of a categorised card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPath {
    pub format: String,
    pub rarity: String,
    pub kind: String,
}

/// An owned record joined with its reference printing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCard {
    pub card: ReferenceCard,
    pub quantity: u32,
    pub variant: Variant,
    pub origin: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub type_label: String,
    pub rarity_orig: String,
    pub rarity_recent: String,
    #[serde(default)]
    pub mark: Option<Mark>,
    /// Buckets the card was sorted into, set when a categorised collection is
    /// flattened for saving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<BucketPath>,
}

impl NormalizedCard {
    /// Join a reference printing with an owned record. Both rarity fields start
    /// out as the printing's own rarity until historical resolution runs.
    pub fn new(card: ReferenceCard, record: &OwnedCardRecord, type_label: String) -> Self {
        let rarity = card.rarity.clone();
        Self {
            card,
            quantity: record.quantity,
            variant: record.variant.clone(),
            origin: record.origin.clone(),
            extra: record.extra.clone(),
            tags: record.tags.clone(),
            type_label,
            rarity_orig: rarity.clone(),
            rarity_recent: rarity,
            mark: None,
            bucket: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.card.name
    }

    pub fn oracle_id(&self) -> &str {
        self.card.oracle_id.as_deref().unwrap_or(&self.card.id)
    }

    /// Price matching the owned finish, EUR first with USD as fallback
    pub fn price(&self) -> Option<f64> {
        let prices = &self.card.prices;
        let raw = match self.variant.finish {
            Finish::Normal => prices.eur.as_ref().or(prices.usd.as_ref()),
            Finish::Foil => prices.eur_foil.as_ref().or(prices.usd_foil.as_ref()),
            Finish::Etched => prices
                .usd_etched
                .as_ref()
                .or(prices.eur_foil.as_ref())
                .or(prices.usd_foil.as_ref()),
        };
        raw.and_then(|p| p.trim().parse::<f64>().ok())
    }
}
