//! Owned-card import files.
//!
//! Reads delimited exports (ManaBox, Moxfield, Archidekt style) with a header
//! row into [`OwnedCardRecord`]s keyed by Scryfall ID. Duplicate rows for the
//! same printing, finish and language are coalesced by summing quantities.

use crate::error::{CollectionError, Result};
use crate::models::{Finish, OwnedCardRecord, Variant};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const IDENTITY_HEADERS: &[&str] = &["Scryfall ID", "scryfall_id"];
const QUANTITY_HEADERS: &[&str] = &["Quantity", "Count"];
const FINISH_HEADERS: &[&str] = &["Finish", "Foil"];
const LANGUAGE_HEADERS: &[&str] = &["Language"];
const NAME_HEADERS: &[&str] = &["Name"];
/// Platform-specific category/tag columns
const TAG_HEADERS: &[&str] = &["Tags", "Category"];

lazy_static! {
    static ref IDENTITY_PATTERN: Regex =
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("identity pattern is valid");
}

/// Returns true if `id` has the shape of a Scryfall ID
pub fn is_valid_identity(id: &str) -> bool {
    IDENTITY_PATTERN.is_match(id)
}

/// Column positions resolved from a header row
#[derive(Debug)]
struct Columns {
    identity: usize,
    quantity: usize,
    finish: Option<usize>,
    language: Option<usize>,
    name: Option<usize>,
    tags: Vec<usize>,
    extra: Vec<(usize, String)>,
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, origin: &str) -> Result<Self> {
        let missing = |column: &str| CollectionError::MissingColumn {
            file: origin.to_string(),
            column: column.to_string(),
        };
        let identity = find_column(headers, IDENTITY_HEADERS).ok_or_else(|| missing("Scryfall ID"))?;
        let quantity = find_column(headers, QUANTITY_HEADERS).ok_or_else(|| missing("Quantity"))?;
        let finish = find_column(headers, FINISH_HEADERS);
        let language = find_column(headers, LANGUAGE_HEADERS);
        let name = find_column(headers, NAME_HEADERS);
        let tags: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| TAG_HEADERS.iter().any(|t| h.trim().eq_ignore_ascii_case(t)))
            .map(|(i, _)| i)
            .collect();

        let known: Vec<usize> = [Some(identity), Some(quantity), finish, language, name]
            .into_iter()
            .flatten()
            .chain(tags.iter().copied())
            .collect();
        let extra = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !known.contains(i))
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        Ok(Self {
            identity,
            quantity,
            finish,
            language,
            name,
            tags,
            extra,
        })
    }
}

/// Split tag cells on commas, trim, lowercase and drop empties
fn parse_tags(values: &[&str]) -> BTreeSet<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Owned records from one or more import files, keyed by Scryfall ID
#[derive(Debug, Default, Clone)]
pub struct ImportIndex {
    records: BTreeMap<String, Vec<OwnedCardRecord>>,
}

impl ImportIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a single import file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut index = Self::new();
        index.import_path(path)?;
        Ok(index)
    }

    /// Import a file, using its file name as the record origin.
    ///
    /// Returns the number of data rows read.
    pub fn import_path<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let origin = origin_of(path);
        let file = File::open(path)?;
        self.import_reader(file, &origin)
    }

    /// Import delimited data from any reader.
    ///
    /// The whole input is validated before anything is merged, so a malformed
    /// row leaves the index untouched.
    pub fn import_reader<R: Read>(&mut self, reader: R, origin: &str) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = Columns::resolve(&headers, origin)?;
        debug!("{origin}: resolved columns {columns:?}");

        let mut parsed = Vec::new();
        for (index, result) in rdr.records().enumerate() {
            // +2: 1-based, header is row 1
            let row = index + 2;
            let record = result?;
            parsed.push(parse_row(&record, &columns, origin, row)?);
        }

        let rows = parsed.len();
        for record in parsed {
            self.insert(record);
        }

        info!(
            "Imported {} rows from {} ({} distinct records)",
            rows,
            origin,
            self.len()
        );
        Ok(rows)
    }

    /// Add a record, summing quantity into an existing record for the same
    /// identity, variant and origin
    pub fn insert(&mut self, record: OwnedCardRecord) {
        let slot = self.records.entry(record.identity.clone()).or_default();
        match slot
            .iter_mut()
            .find(|r| r.variant == record.variant && r.origin == record.origin)
        {
            Some(existing) => existing.quantity += record.quantity,
            None => slot.push(record),
        }
    }

    /// All records for an identity (one per variant/origin)
    pub fn get(&self, identity: &str) -> &[OwnedCardRecord] {
        self.records
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has(&self, identity: &str) -> bool {
        self.records.contains_key(identity)
    }

    /// Remove an identity, returning its records
    pub fn remove(&mut self, identity: &str) -> Option<Vec<OwnedCardRecord>> {
        self.records.remove(identity)
    }

    /// Number of distinct records
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_quantity(&self) -> u64 {
        self.iter().map(|r| u64::from(r.quantity)).sum()
    }

    /// Iterate records in identity order
    pub fn iter(&self) -> impl Iterator<Item = &OwnedCardRecord> {
        self.records.values().flatten()
    }

    /// Distinct origin file names present in the index
    pub fn origins(&self) -> BTreeSet<String> {
        self.iter().map(|r| r.origin.clone()).collect()
    }
}

/// Origin name of an import file: its file name
pub fn origin_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &Columns,
    origin: &str,
    row: usize,
) -> Result<OwnedCardRecord> {
    let malformed = |reason: String| CollectionError::MalformedRow {
        file: origin.to_string(),
        row,
        reason,
    };
    let cell = |i: usize| record.get(i).unwrap_or("");

    let identity = cell(columns.identity).to_lowercase();
    if !is_valid_identity(&identity) {
        return Err(malformed(format!(
            "'{}' is not a valid Scryfall ID",
            cell(columns.identity)
        )));
    }

    let raw_quantity = cell(columns.quantity);
    let quantity = match raw_quantity.parse::<u32>() {
        Ok(q) if q > 0 => q,
        _ => {
            return Err(malformed(format!(
                "quantity '{raw_quantity}' is not a positive integer"
            )))
        }
    };

    let finish = match columns.finish.map(cell) {
        Some(value) => Finish::parse(value).unwrap_or_else(|| {
            warn!("{origin}, row {row}: unknown finish '{value}', treating as normal");
            Finish::Normal
        }),
        None => Finish::Normal,
    };
    let language = columns
        .language
        .map(|i| cell(i).to_lowercase())
        .unwrap_or_default();

    let name = columns
        .name
        .map(cell)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let tag_cells: Vec<&str> = columns.tags.iter().map(|&i| cell(i)).collect();
    let extra = columns
        .extra
        .iter()
        .map(|(i, header)| (header.clone(), cell(*i).to_string()))
        .collect();

    Ok(OwnedCardRecord {
        identity,
        name,
        variant: Variant { finish, language },
        quantity,
        origin: origin.to_string(),
        extra,
        tags: parse_tags(&tag_cells),
    })
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
