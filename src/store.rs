//! Card database files.
//!
//! A card database is a JSON document with a `meta` header followed by a
//! `cards` array. Loading reads and validates the header only; cards are
//! streamed on demand, so even large databases are never held in memory
//! unless [`CardDb::get_all`] is used.

use crate::error::{CollectionError, Result};
use crate::filter::CardFilter;
use crate::json_stream::{read_leading_field, stream_field, StreamEnd};
use crate::models::{origin_in_group, Group, GroupMap, NormalizedCard};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// Version of the on-disk layout written by this crate
pub const SCHEMA_VERSION: u32 = 1;

const GENERATOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// What a card database contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbKind {
    /// Correlation output, unsorted
    Inventory,
    /// Categorised collection; every card carries its bucket path and merge mark
    Category,
    /// Cards extracted for one format
    Format,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDbMeta {
    pub kind: DbKind,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub groups: GroupMap,
    pub generator: String,
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
}

impl CardDbMeta {
    pub fn new(kind: DbKind, format: Option<String>, groups: GroupMap) -> Self {
        Self {
            kind,
            format,
            groups,
            generator: GENERATOR.to_string(),
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
        }
    }

    /// Check the kind/format pairing and schema version
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(format!(
                "unsupported schema version {} (expected {})",
                self.schema_version, SCHEMA_VERSION
            ));
        }
        match (self.kind, self.format.as_deref()) {
            (DbKind::Format, None) | (DbKind::Format, Some("")) => {
                Err("format database without a format".to_string())
            }
            (DbKind::Format, Some(_)) => Ok(()),
            (kind, Some(format)) => Err(format!("{kind:?} database must not name a format ({format})")),
            (_, None) => Ok(()),
        }
    }
}

#[derive(Serialize)]
struct CardDbDocument<'a> {
    meta: &'a CardDbMeta,
    cards: Vec<&'a NormalizedCard>,
}

/// Write a card database. Cards are written sorted by name.
pub fn save<P: AsRef<Path>>(path: P, cards: &[NormalizedCard], meta: &CardDbMeta) -> Result<()> {
    let path = path.as_ref();
    meta.validate()
        .map_err(|reason| CollectionError::InvalidMetadata {
            path: path.to_path_buf(),
            reason,
        })?;

    let mut sorted: Vec<&NormalizedCard> = cards.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(
        &mut writer,
        &CardDbDocument {
            meta,
            cards: sorted,
        },
    )?;
    writer.flush()?;

    info!("Saved {} cards to {}", cards.len(), path.display());
    Ok(())
}

/// Options applied while streaming cards out of a database
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub filter: Option<CardFilter>,
    pub exclude: BTreeSet<Group>,
    /// Only cards that are actually owned: excludes every group
    pub exportable: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: CardFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn exclude_group(mut self, group: Group) -> Self {
        self.exclude.insert(group);
        self
    }

    pub fn exportable(mut self, exportable: bool) -> Self {
        self.exportable = exportable;
        self
    }

    fn excluded_groups(&self) -> BTreeSet<Group> {
        if self.exportable {
            Group::ALL.into_iter().collect()
        } else {
            self.exclude.clone()
        }
    }
}

/// A validated card database on disk
#[derive(Debug, Clone)]
pub struct CardDb {
    path: PathBuf,
    meta: CardDbMeta,
}

impl CardDb {
    /// Read and validate the header of a card database
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let invalid = |reason: String| CollectionError::InvalidMetadata {
            path: path.clone(),
            reason,
        };

        let reader = BufReader::new(File::open(&path)?);
        let meta: CardDbMeta = match read_leading_field(reader, "meta") {
            Ok(meta) => meta,
            Err(CollectionError::Json(e)) => return Err(invalid(e.to_string())),
            Err(e) => return Err(e),
        };
        meta.validate().map_err(invalid)?;

        debug!("Loaded header of {} ({:?})", path.display(), meta.kind);
        Ok(Self { path, meta })
    }

    pub fn meta(&self) -> &CardDbMeta {
        &self.meta
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream cards that pass `options` to `f`
    pub fn for_each<F>(&self, options: &ReadOptions, mut f: F) -> Result<StreamEnd>
    where
        F: FnMut(NormalizedCard) -> Result<ControlFlow<()>>,
    {
        let excluded = options.excluded_groups();
        let reader = BufReader::new(File::open(&self.path)?);
        stream_field(reader, "cards", |card: NormalizedCard| {
            if excluded
                .iter()
                .any(|&group| origin_in_group(&self.meta.groups, &card.origin, group))
            {
                return Ok(ControlFlow::Continue(()));
            }
            if let Some(filter) = &options.filter {
                if !filter.matches(&card) {
                    return Ok(ControlFlow::Continue(()));
                }
            }
            f(card)
        })
    }

    /// Collect the cards that pass `options`
    pub fn collect(&self, options: &ReadOptions) -> Result<Vec<NormalizedCard>> {
        let mut cards = Vec::new();
        self.for_each(options, |card| {
            cards.push(card);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(cards)
    }

    /// Every card in the database, in file order
    pub fn get_all(&self) -> Result<Vec<NormalizedCard>> {
        self.collect(&ReadOptions::default())
    }
}

/// Find card databases in `dir` matching `kind` and/or `format`.
///
/// Files that fail to load are skipped with a warning.
pub fn load_all<P: AsRef<Path>>(
    dir: P,
    recursive: bool,
    kind: Option<DbKind>,
    format: Option<&str>,
) -> Result<Vec<CardDb>> {
    let mut found = Vec::new();
    scan_dir(dir.as_ref(), recursive, kind, format, &mut found)?;
    found.sort_by(|a, b| a.path.cmp(&b.path));
    info!("Found {} card databases in {}", found.len(), dir.as_ref().display());
    Ok(found)
}

fn scan_dir(
    dir: &Path,
    recursive: bool,
    kind: Option<DbKind>,
    format: Option<&str>,
    found: &mut Vec<CardDb>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                scan_dir(&path, recursive, kind, format, found)?;
            }
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match CardDb::load(&path) {
            Ok(db) => {
                let kind_ok = kind.map_or(true, |k| db.meta.kind == k);
                let format_ok = format.map_or(true, |f| db.meta.format.as_deref() == Some(f));
                if kind_ok && format_ok {
                    found.push(db);
                }
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(())
}
