//! Collection DB - MTG collection correlation and sorting
//!
//! Joins owned-card exports (CSV files from collection managers) with the
//! Scryfall bulk reference data, resolves historical rarities, classifies type
//! lines and writes the result as a streamed JSON card database that can be
//! filtered, searched and sorted into format/rarity/colour buckets.

pub mod categorize;
pub mod classify;
pub mod correlate;
pub mod error;
pub mod filter;
pub mod import;
pub mod json_stream;
pub mod models;
pub mod rarity;
pub mod reference;
pub mod store;

// Re-export commonly used items
pub use categorize::{Categorizer, FormatBucket, Kind, SortOptions};
pub use classify::{classify_card, classify_type_line};
pub use correlate::{correlate, CorrelateOptions, CorrelationReport};
pub use error::{CollectionError, Result};
pub use filter::{CardFilter, PriceFilter, TextFields};
pub use import::{ImportCollection, ImportIndex};
pub use models::{BucketPath, Finish, Group, GroupMap, Mark, NormalizedCard, OwnedCardRecord, ReferenceCard};
pub use rarity::RarityNormalizer;
pub use reference::{ReferenceFile, ReferenceSource};
pub use store::{load_all, save, CardDb, CardDbMeta, DbKind, ReadOptions};
