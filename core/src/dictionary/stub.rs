//! This module contains a stub dictionary.

use super::{DataDictionary, DictionaryEntryBuf};
use crate::header::Tag;

/// An empty attribute dictionary.
///
/// Every tag is unknown to it,
/// so every implicit VR element decodes as `UN`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StubDataDictionary;

impl DataDictionary for StubDataDictionary {
    fn by_name(&self, _: &str) -> Option<DictionaryEntryBuf> {
        None
    }

    fn by_tag(&self, _: Tag) -> Option<DictionaryEntryBuf> {
        None
    }

    fn by_private_tag(&self, _: Tag, _: &str) -> Option<DictionaryEntryBuf> {
        None
    }
}
