//! Streaming JSON readers.
//!
//! The Scryfall bulk files are several gigabytes, so arrays are visited one
//! element at a time through serde's `SeqAccess` instead of being collected.
//! A callback can stop the stream early; the reader is then abandoned without
//! parsing the rest of the input.

use crate::error::{CollectionError, Result};
use serde::de::{self, DeserializeOwned, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserializer as _;
use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::ops::ControlFlow;

/// How a streamed read ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Every element was visited
    Completed,
    /// The callback asked to stop
    Stopped,
}

/// Why the visitor bailed out of serde. serde only carries its own error
/// type, so the real reason is parked here and checked after the call.
enum Halt {
    Stopped,
    Failed(CollectionError),
}

struct ElementVisitor<'a, T, F> {
    f: &'a mut F,
    halt: &'a mut Option<Halt>,
    marker: PhantomData<T>,
}

impl<'de, T, F> Visitor<'de> for ElementVisitor<'_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<ControlFlow<()>>,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        while let Some(item) = seq.next_element::<T>()? {
            match (self.f)(item) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => {
                    *self.halt = Some(Halt::Stopped);
                    return Err(de::Error::custom("stream stopped"));
                }
                Err(e) => {
                    *self.halt = Some(Halt::Failed(e));
                    return Err(de::Error::custom("stream callback failed"));
                }
            }
        }
        Ok(())
    }
}

impl<'de, T, F> DeserializeSeed<'de> for ElementVisitor<'_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<ControlFlow<()>>,
{
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

/// Visits a top-level object and streams one array-valued field
struct FieldVisitor<'a, T, F> {
    field: &'a str,
    f: &'a mut F,
    halt: &'a mut Option<Halt>,
    marker: PhantomData<T>,
}

impl<'de, T, F> Visitor<'de> for FieldVisitor<'_, T, F>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<ControlFlow<()>>,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object with an array field `{}`", self.field)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let mut found = false;
        while let Some(key) = map.next_key::<String>()? {
            if key == self.field {
                map.next_value_seed(ElementVisitor {
                    f: &mut *self.f,
                    halt: &mut *self.halt,
                    marker: PhantomData::<T>,
                })?;
                found = true;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        if !found {
            return Err(de::Error::custom(format!("missing field `{}`", self.field)));
        }
        Ok(())
    }
}

/// Reads the first field of a top-level object and stops
struct LeadingFieldVisitor<'a, T> {
    field: &'a str,
    slot: &'a mut Option<T>,
}

impl<'de, T: DeserializeOwned> Visitor<'de> for LeadingFieldVisitor<'_, T> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object starting with `{}`", self.field)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        match map.next_key::<String>()? {
            Some(key) if key == self.field => {
                *self.slot = Some(map.next_value()?);
                // Leave the rest of the document unread
                Err(de::Error::custom("header read"))
            }
            Some(key) => Err(de::Error::custom(format!(
                "expected `{}` as first field, found `{}`",
                self.field, key
            ))),
            None => Err(de::Error::custom(format!("missing field `{}`", self.field))),
        }
    }
}

fn settle(
    outcome: std::result::Result<(), serde_json::Error>,
    halt: Option<Halt>,
) -> Result<StreamEnd> {
    match (outcome, halt) {
        (_, Some(Halt::Stopped)) => Ok(StreamEnd::Stopped),
        (_, Some(Halt::Failed(e))) => Err(e),
        (Err(e), None) => Err(e.into()),
        (Ok(()), None) => Ok(StreamEnd::Completed),
    }
}

/// Stream the elements of a top-level JSON array
pub fn stream_array<R, T, F>(reader: R, mut f: F) -> Result<StreamEnd>
where
    R: Read,
    T: DeserializeOwned,
    F: FnMut(T) -> Result<ControlFlow<()>>,
{
    let mut halt = None;
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let outcome = (&mut deserializer).deserialize_seq(ElementVisitor {
        f: &mut f,
        halt: &mut halt,
        marker: PhantomData::<T>,
    });
    let end = settle(outcome, halt)?;
    if end == StreamEnd::Completed {
        deserializer.end()?;
    }
    Ok(end)
}

/// Stream the elements of the array stored under `field` in a top-level
/// object. Other fields are skipped without being materialised.
pub fn stream_field<R, T, F>(reader: R, field: &str, mut f: F) -> Result<StreamEnd>
where
    R: Read,
    T: DeserializeOwned,
    F: FnMut(T) -> Result<ControlFlow<()>>,
{
    let mut halt = None;
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let outcome = (&mut deserializer).deserialize_map(FieldVisitor {
        field,
        f: &mut f,
        halt: &mut halt,
        marker: PhantomData::<T>,
    });
    let end = settle(outcome, halt)?;
    if end == StreamEnd::Completed {
        deserializer.end()?;
    }
    Ok(end)
}

/// Read only the first field of a top-level object, which must be `field`
pub fn read_leading_field<R, T>(reader: R, field: &str) -> Result<T>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut slot = None;
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let outcome = (&mut deserializer).deserialize_map(LeadingFieldVisitor {
        field,
        slot: &mut slot,
    });
    match (slot, outcome) {
        (Some(value), _) => Ok(value),
        (None, Err(e)) => Err(e.into()),
        (None, Ok(())) => Err(CollectionError::Json(de::Error::custom(format!(
            "missing field `{field}`"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        n: u32,
    }

    #[test]
    fn test_streams_every_array_element() {
        let json = r#"[{"n": 1}, {"n": 2}, {"n": 3}]"#;
        let mut seen = Vec::new();
        let end = stream_array(json.as_bytes(), |item: Item| {
            seen.push(item.n);
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();

        assert_eq!(end, StreamEnd::Completed);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_stops_early_without_reading_the_rest() {
        // The tail is not valid JSON; stopping before it must not fail
        let json = r#"[{"n": 1}, {"n": 2}, this is never parsed"#;
        let mut seen = Vec::new();
        let end = stream_array(json.as_bytes(), |item: Item| {
            seen.push(item.n);
            Ok(if item.n == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .unwrap();

        assert_eq!(end, StreamEnd::Stopped);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_callback_errors_propagate() {
        let json = r#"[{"n": 1}]"#;
        let result = stream_array(json.as_bytes(), |_: Item| {
            Err(CollectionError::InvalidFilter("boom".to_string()))
        });
        assert!(matches!(result, Err(CollectionError::InvalidFilter(_))));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let result = stream_array(r#"[{"n": "x"}]"#.as_bytes(), |_: Item| {
            Ok(ControlFlow::Continue(()))
        });
        assert!(matches!(result, Err(CollectionError::Json(_))));
    }

    #[test]
    fn test_streams_named_field_and_skips_others() {
        let json = r#"{"meta": {"big": [1, 2, 3]}, "items": [{"n": 7}, {"n": 8}]}"#;
        let mut seen = Vec::new();
        stream_field(json.as_bytes(), "items", |item: Item| {
            seen.push(item.n);
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
        assert_eq!(seen, vec![7, 8]);
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let result = stream_field(r#"{"meta": {}}"#.as_bytes(), "items", |_: Item| {
            Ok(ControlFlow::Continue(()))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_reads_leading_field_only() {
        let json = r#"{"head": {"n": 5}, "items": [garbage"#;
        let head: Item = read_leading_field(json.as_bytes(), "head").unwrap();
        assert_eq!(head, Item { n: 5 });
    }

    #[test]
    fn test_leading_field_must_come_first() {
        let json = r#"{"items": [], "head": {"n": 5}}"#;
        let result: Result<Item> = read_leading_field(json.as_bytes(), "head");
        assert!(result.is_err());
    }
}
