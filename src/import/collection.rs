//! Every import index of a run, with group tagging and cross-file lookup.

use super::index::{origin_of, ImportIndex};
use crate::error::Result;
use crate::models::{origin_in_group, Group, GroupMap, OwnedCardRecord};
use std::collections::BTreeSet;
use std::path::Path;

/// All import indexes of one run, plus the group each source file belongs to.
///
/// Lookups span every index; the correlation engine removes identities as it
/// consumes them so that whatever remains at the end is unmatched.
#[derive(Debug, Default)]
pub struct ImportCollection {
    indexes: Vec<ImportIndex>,
    groups: GroupMap,
}

impl ImportCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import each path into its own index
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut collection = Self::new();
        for path in paths {
            collection.push(ImportIndex::from_path(path)?);
        }
        Ok(collection)
    }

    pub fn push(&mut self, index: ImportIndex) {
        self.indexes.push(index);
    }

    /// Import `path` into a new index and tag its file name with `group`
    pub fn import_group<P: AsRef<Path>>(&mut self, path: P, group: Group) -> Result<()> {
        let path = path.as_ref();
        let index = ImportIndex::from_path(path)?;
        self.tag_group(group, [origin_of(path)]);
        self.push(index);
        Ok(())
    }

    /// Associate origin file names with a group
    pub fn tag_group<I, S>(&mut self, group: Group, origins: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .entry(group)
            .or_default()
            .extend(origins.into_iter().map(Into::into));
    }

    pub fn groups(&self) -> &GroupMap {
        &self.groups
    }

    pub fn is_in_group(&self, record: &OwnedCardRecord, group: Group) -> bool {
        origin_in_group(&self.groups, &record.origin, group)
    }

    /// Every record for `identity` across all indexes
    pub fn get(&self, identity: &str) -> Vec<&OwnedCardRecord> {
        self.indexes
            .iter()
            .flat_map(|index| index.get(identity))
            .collect()
    }

    pub fn has(&self, identity: &str) -> bool {
        self.indexes.iter().any(|index| index.has(identity))
    }

    /// Remove `identity` from every index
    pub fn delete(&mut self, identity: &str) {
        for index in &mut self.indexes {
            index.remove(identity);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.iter().all(ImportIndex::is_empty)
    }

    /// Records still present, in index order
    pub fn remaining(&self) -> impl Iterator<Item = &OwnedCardRecord> {
        self.indexes.iter().flat_map(ImportIndex::iter)
    }

    pub fn total_quantity(&self) -> u64 {
        self.indexes.iter().map(ImportIndex::total_quantity).sum()
    }

    pub fn origins(&self) -> BTreeSet<String> {
        self.indexes.iter().flat_map(ImportIndex::origins).collect()
    }
}
