//! Extraction of leaf values into generic values,
//! and their rendering in documents.

use crate::options::{DicomToJsonFlags, DicomToJsonFormat};
use crate::ser::{NotALeafSnafu, Result};
use crate::value::DicomValue;
use dcmbridge_core::value::{PrimitiveValue, Value};
use dcmbridge_core::{DataDictionary, Tag, VrCategory, VR};
use dcmbridge_dictionary_std::DataDictionaryRegistry;
use dcmbridge_encoding::text::convert_to_utf8;
use dcmbridge_encoding::Encoding;
use dcmbridge_object::InMemElement;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

/// Everything the extraction of a leaf value depends on,
/// besides the element itself.
#[derive(Debug, Clone, Copy)]
pub struct LeafContext<'a> {
    /// the flags of the conversion
    pub flags: DicomToJsonFlags,
    /// strings longer than this many bytes become null, 0 for no limit
    pub max_string_length: u32,
    /// the encoding of the text in the data set
    pub encoding: Encoding,
    /// whether the data set declares more than one character set
    pub has_code_extensions: bool,
    /// tags exempt from the string length limit
    pub ignore_length: &'a BTreeSet<Tag>,
}

impl LeafContext<'_> {
    fn is_too_long(&self, tag: Tag, len: usize) -> bool {
        self.max_string_length != 0
            && len > self.max_string_length as usize
            && !self.ignore_length.contains(&tag)
    }

    fn limited(&self, tag: Tag, text: String) -> DicomValue {
        if self.is_too_long(tag, text.len()) {
            DicomValue::Null
        } else {
            DicomValue::String(text)
        }
    }
}

/// Convert the value of a leaf element into a generic value.
///
/// `private_creator` is the private creator reserving the element's block,
/// if any, used for resolving private attributes of unknown VR.
///
/// Values which cannot be converted become null.
/// Only sequences are refused, since they are not leaves.
pub fn extract_value(
    dict: &DataDictionaryRegistry,
    elt: &InMemElement,
    private_creator: Option<&str>,
    ctx: &LeafContext<'_>,
) -> Result<DicomValue> {
    let tag = elt.tag();
    let vr = elt.vr();
    let value = match elt.value() {
        Value::Primitive(value) => value,
        Value::PixelSequence(_) => return Ok(DicomValue::Null),
        Value::Sequence(_) => return NotALeafSnafu { tag }.fail(),
    };

    if vr.is_string() {
        let text = match value {
            PrimitiveValue::Empty => String::new(),
            PrimitiveValue::Text(bytes) => {
                convert_to_utf8(bytes, ctx.encoding, ctx.has_code_extensions)
            }
            other => match other.to_joined_decimal_string() {
                Some(text) => text,
                None => return Ok(DicomValue::Null),
            },
        };
        return Ok(ctx.limited(tag, text));
    }

    if vr == VR::UN {
        // private data of unknown VR is only shown as text
        // when the dictionary says so, and never transcoded
        let is_string_entry = dict
            .by_tag_with_creator(tag, private_creator)
            .map(|entry| entry.vr.is_string())
            .unwrap_or(false);
        if is_string_entry {
            let bytes = value.to_le_bytes();
            if bytes.is_ascii() {
                let text = bytes.iter().map(|b| char::from(*b)).collect();
                return Ok(ctx.limited(tag, text));
            }
        }
    }

    let out = match vr.category() {
        VrCategory::Binary => {
            if ctx.flags.contains(DicomToJsonFlags::CONVERT_BINARY_TO_NULL) {
                DicomValue::Null
            } else {
                DicomValue::Binary(value.to_le_bytes())
            }
        }
        VrCategory::Numeric => match value.to_decimal_strings() {
            Some(values) if !values.is_empty() => DicomValue::String(values.join("\\")),
            _ => DicomValue::Null,
        },
        VrCategory::AttributeTag => match value.tags().and_then(|tags| tags.first()) {
            Some(first) => DicomValue::String(format!("{:x}", first)),
            None => DicomValue::Null,
        },
        VrCategory::String | VrCategory::Sequence => DicomValue::Null,
    };
    Ok(out)
}

/// Render a generic value as a document node.
///
/// In the full format, the node is the element object
/// which already holds the element's name,
/// and receives the `Type` and `Value` members.
/// In the short and human formats,
/// the returned value is the node itself.
pub(crate) fn leaf_value_to_json(
    node: &mut Map<String, JsonValue>,
    value: &DicomValue,
    format: DicomToJsonFormat,
    flags: DicomToJsonFlags,
    max_string_length: u32,
) -> JsonValue {
    let (kind, out) = match value {
        DicomValue::Null => ("Null", JsonValue::Null),
        DicomValue::Binary(bytes) => {
            let text = if flags.contains(DicomToJsonFlags::CONVERT_BINARY_TO_ASCII) {
                Encoding::Ascii.decode(bytes)
            } else {
                value.to_data_uri().unwrap_or_default()
            };
            ("Binary", JsonValue::String(text))
        }
        DicomValue::String(text)
            if max_string_length == 0 || text.len() <= max_string_length as usize =>
        {
            ("String", JsonValue::String(text.clone()))
        }
        DicomValue::String(_) => ("TooLong", JsonValue::Null),
    };

    match format {
        DicomToJsonFormat::Full => {
            node.insert("Type".to_string(), JsonValue::from(kind));
            node.insert("Value".to_string(), out);
            JsonValue::Object(std::mem::take(node))
        }
        DicomToJsonFormat::Short | DicomToJsonFormat::Human => out,
    }
}
