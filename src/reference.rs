//! Scryfall bulk data as a forward-only stream.
//!
//! The bulk file is never loaded whole. Each pass re-opens the source and
//! visits cards one at a time.

use crate::error::Result;
use crate::json_stream::{stream_array, StreamEnd};
use crate::models::ReferenceCard;
use log::info;
use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// A reference dataset that can be read from the start any number of times
pub trait ReferenceSource {
    /// Open a fresh reader positioned at the start of the dataset
    fn open(&self) -> Result<Box<dyn Read + '_>>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

/// Bulk data file on disk
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    path: PathBuf,
}

impl ReferenceFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReferenceSource for ReferenceFile {
    fn open(&self) -> Result<Box<dyn Read + '_>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::with_capacity(1 << 20, file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory dataset, mostly useful for tests and small extracts
impl ReferenceSource for Vec<u8> {
    fn open(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.as_slice()))
    }

    fn describe(&self) -> String {
        format!("<{} bytes in memory>", self.len())
    }
}

/// Visit every `card` object of the dataset in file order.
///
/// Other object kinds are skipped. The callback can stop the pass early by
/// returning `ControlFlow::Break`.
pub fn for_each_card<S, F>(source: &S, mut f: F) -> Result<StreamEnd>
where
    S: ReferenceSource + ?Sized,
    F: FnMut(ReferenceCard) -> Result<ControlFlow<()>>,
{
    info!("Streaming reference data from {}", source.describe());
    let reader = source.open()?;
    stream_array(reader, |card: ReferenceCard| {
        if card.is_card() {
            f(card)
        } else {
            Ok(ControlFlow::Continue(()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_non_card_objects() {
        let data = br#"[
            {"object": "card", "id": "a", "name": "Opt"},
            {"object": "related_card", "id": "b", "name": "Treasure"},
            {"object": "card", "id": "c", "name": "Ponder"}
        ]"#
        .to_vec();

        let mut names = Vec::new();
        let end = for_each_card(&data, |card| {
            names.push(card.name);
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();

        assert_eq!(end, StreamEnd::Completed);
        assert_eq!(names, vec!["Opt", "Ponder"]);
    }

    #[test]
    fn test_source_can_be_reopened() {
        let data = br#"[{"object": "card", "id": "a", "name": "Opt"}]"#.to_vec();
        for _ in 0..2 {
            let mut count = 0;
            for_each_card(&data, |_| {
                count += 1;
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let source = ReferenceFile::new("/this/file/does/not/exist.json");
        let result = for_each_card(&source, |_| Ok(ControlFlow::Continue(())));
        assert!(matches!(result, Err(crate::error::CollectionError::Io(_))));
    }
}
