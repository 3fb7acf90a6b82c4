//! A flat map from tags to generic values,
//! for summaries of the top level of a data set.

use crate::de::{self, NotAnObjectSnafu, ParseTagSnafu, UnexpectedValueSnafu};
use crate::options::DicomToJsonFlags;
use crate::ser::{self, extract_value, LeafContext};
use crate::value::DicomValue;
use dcmbridge_core::Tag;
use dcmbridge_dictionary_std::DataDictionaryRegistry;
use dcmbridge_encoding::Encoding;
use dcmbridge_object::{detect_encoding, InMemDicomObject};
use serde_json::{Map, Value as JsonValue};
use snafu::{OptionExt, ResultExt};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

/// Generic values by tag, in tag order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DicomMap {
    values: BTreeMap<Tag, DicomValue>,
}

impl DicomMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of a tag, returning the previous one.
    pub fn set_value(&mut self, tag: Tag, value: impl Into<DicomValue>) -> Option<DicomValue> {
        self.values.insert(tag, value.into())
    }

    pub fn value(&self, tag: Tag) -> Option<&DicomValue> {
        self.values.get(&tag)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.values.contains_key(&tag)
    }

    pub fn remove(&mut self, tag: Tag) -> Option<DicomValue> {
        self.values.remove(&tag)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Tag, DicomValue> {
        self.values.iter()
    }

    /// Render the map as a document.
    ///
    /// The simplified form is keyed by attribute name,
    /// with bare values.
    /// Otherwise entries are keyed by tag
    /// and hold the name, type and value of each attribute.
    /// Binary values are written as data URIs.
    pub fn to_json(&self, dict: &DataDictionaryRegistry, simplify: bool) -> JsonValue {
        let mut out = Map::new();
        for (tag, value) in &self.values {
            let name = dict.tag_name(*tag, None);
            let (kind, json) = match value {
                DicomValue::Null => ("Null", JsonValue::Null),
                DicomValue::String(text) => ("String", JsonValue::from(text.as_str())),
                DicomValue::Binary(_) => (
                    "Binary",
                    value.to_data_uri().map(JsonValue::from).unwrap_or_default(),
                ),
            };
            if simplify {
                out.insert(name, json);
            } else {
                let mut node = Map::new();
                node.insert("Name".to_string(), JsonValue::from(name));
                node.insert("Type".to_string(), JsonValue::from(kind));
                node.insert("Value".to_string(), json);
                out.insert(format!("{:x}", tag), JsonValue::Object(node));
            }
        }
        JsonValue::Object(out)
    }

    /// Read a map from a document of string values,
    /// keyed by tag or by attribute name.
    pub fn from_json(dict: &DataDictionaryRegistry, document: &JsonValue) -> de::Result<Self> {
        let members = document.as_object().context(NotAnObjectSnafu {
            found: de::json_kind(document),
        })?;
        let mut map = DicomMap::new();
        for (key, value) in members {
            let tag = dict.parse_tag(key).context(ParseTagSnafu { key })?;
            let text = value.as_str().context(UnexpectedValueSnafu {
                tag,
                value: value.to_string(),
            })?;
            map.set_value(tag, text);
        }
        Ok(map)
    }
}

impl<'a> IntoIterator for &'a DicomMap {
    type Item = (&'a Tag, &'a DicomValue);
    type IntoIter = btree_map::Iter<'a, Tag, DicomValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Collect the leaf elements at the top level of a data set
/// into a flat map, with the default conversion flags.
///
/// Strings longer than `max_string_length` bytes become null,
/// unless it is 0.
pub fn extract_summary(
    dict: &DataDictionaryRegistry,
    obj: &InMemDicomObject,
    max_string_length: u32,
    default_encoding: Encoding,
) -> ser::Result<DicomMap> {
    let (encoding, has_code_extensions) = detect_encoding(obj, default_encoding);
    let ignore_length = BTreeSet::new();
    let ctx = LeafContext {
        flags: DicomToJsonFlags::default(),
        max_string_length,
        encoding,
        has_code_extensions,
        ignore_length: &ignore_length,
    };

    let mut map = DicomMap::new();
    for elt in obj.iter().filter(|e| e.is_leaf()) {
        let private_creator = obj.private_creator_of(elt.tag());
        let value = extract_value(dict, elt, private_creator.as_deref(), &ctx)?;
        map.set_value(elt.tag(), value);
    }
    Ok(map)
}
