//! Owned-collection import.
//!
//! - [`index`] - one import file parsed into coalesced records
//! - [`collection`] - every index of a run, with group tagging

pub mod collection;
pub mod index;

pub use collection::ImportCollection;
pub use index::{is_valid_identity, origin_of, ImportIndex};
