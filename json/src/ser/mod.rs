//! Conversion of data sets into documents.
//!
//! The document of a data set is a JSON object with one entry per element,
//! in the shape selected by [`DicomToJsonFormat`]:
//!
//! - `Short`: `{"0010,0010": "Doe^John"}`
//! - `Human`: `{"PatientName": "Doe^John"}`
//! - `Full`: `{"0010,0010": {"Name": "PatientName", "Type": "String", "Value": "Doe^John"}}`
//!
//! Sequences become arrays with one object per item.

use crate::options::{DicomToJsonFlags, DicomToJsonFormat, ToJsonOptions};
use dcmbridge_core::value::Value;
use dcmbridge_core::Tag;
use dcmbridge_dictionary_std::{tags, DataDictionaryRegistry};
use dcmbridge_encoding::Encoding;
use dcmbridge_object::{detect_encoding, FileMetaTable, InMemDicomObject, InMemElement};
use serde_json::{Map, Value as JsonValue};
use snafu::{ensure, Backtrace, Snafu};
use std::collections::BTreeSet;

pub use self::value::{extract_value, LeafContext};
pub(crate) use self::value::leaf_value_to_json;

mod value;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A sequence was given where a leaf element was expected.
    #[snafu(display("Element {} is a sequence, not a leaf element", tag))]
    NotALeaf { tag: Tag, backtrace: Backtrace },
    /// The data set nests sequences too deeply.
    #[snafu(display("Sequence nesting exceeds the limit of {} levels", max_depth))]
    MaxDepthExceeded { max_depth: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Convert a data set into a document.
///
/// The encoding of the text is detected from the data set,
/// falling back to the default encoding of the options.
///
/// ```
/// # use dcmbridge_core::{DataElement, VR};
/// # use dcmbridge_dictionary_std::{tags, DataDictionaryRegistry};
/// # use dcmbridge_json::{to_document, DicomToJsonFormat, ToJsonOptions};
/// # use dcmbridge_object::InMemDicomObject;
/// let dict = DataDictionaryRegistry::with_standard_entries(false)?;
/// let obj = InMemDicomObject::from_element_iter([
///     DataElement::new(tags::PATIENT_NAME, VR::PN, "Doe^John"),
/// ]);
/// let options = ToJsonOptions::new().format(DicomToJsonFormat::Human);
/// let document = to_document(&dict, &obj, &options)?;
/// assert_eq!(document, serde_json::json!({ "PatientName": "Doe^John" }));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn to_document(
    dict: &DataDictionaryRegistry,
    obj: &InMemDicomObject,
    options: &ToJsonOptions,
) -> Result<JsonValue> {
    let (encoding, has_code_extensions) = detect_encoding(obj, options.default_encoding);
    let writer = DocumentWriter {
        dict,
        format: options.format,
        max_string_length: options.max_string_length,
        max_depth: options.max_depth,
        ctx: LeafContext {
            flags: options.flags,
            // the length limit is applied when rendering,
            // so that too long strings are told apart from null ones
            max_string_length: 0,
            encoding,
            has_code_extensions,
            ignore_length: &options.ignore_length,
        },
    };
    let mut out = Map::new();
    writer.dataset_to_json(&mut out, obj, 0)?;
    Ok(JsonValue::Object(out))
}

/// Convert the file meta group into a document.
///
/// The group is always read as ASCII text,
/// and no tag is exempt from the string length limit.
pub fn header_to_json(
    dict: &DataDictionaryRegistry,
    meta: &FileMetaTable,
    options: &ToJsonOptions,
) -> Result<JsonValue> {
    let ignore_length = BTreeSet::new();
    let writer = DocumentWriter {
        dict,
        format: options.format,
        max_string_length: options.max_string_length,
        max_depth: options.max_depth,
        ctx: LeafContext {
            flags: options.flags,
            max_string_length: 0,
            encoding: Encoding::Ascii,
            has_code_extensions: false,
            ignore_length: &ignore_length,
        },
    };
    let mut out = Map::new();
    writer.dataset_to_json(&mut out, &meta.to_object(), 0)?;
    Ok(JsonValue::Object(out))
}

struct DocumentWriter<'a> {
    dict: &'a DataDictionaryRegistry,
    format: DicomToJsonFormat,
    max_string_length: u32,
    max_depth: usize,
    ctx: LeafContext<'a>,
}

impl DocumentWriter<'_> {
    fn is_included(&self, elt: &InMemElement) -> bool {
        let flags = self.ctx.flags;
        let tag = elt.tag();
        if tag.is_private() && !flags.contains(DicomToJsonFlags::INCLUDE_PRIVATE_TAGS) {
            return false;
        }
        if !flags.contains(DicomToJsonFlags::INCLUDE_UNKNOWN_TAGS) && self.dict.is_unknown_tag(tag)
        {
            return false;
        }
        if elt.vr().is_binary() {
            let wanted = if tag == tags::PIXEL_DATA {
                DicomToJsonFlags::INCLUDE_PIXEL_DATA
            } else {
                DicomToJsonFlags::INCLUDE_BINARY
            };
            return flags.contains(wanted);
        }
        true
    }

    fn dataset_to_json(
        &self,
        parent: &mut Map<String, JsonValue>,
        item: &InMemDicomObject,
        depth: usize,
    ) -> Result<()> {
        for elt in item.iter().filter(|e| self.is_included(e)) {
            self.element_to_json(parent, item, elt, depth)?;
        }
        Ok(())
    }

    fn element_to_json(
        &self,
        parent: &mut Map<String, JsonValue>,
        item: &InMemDicomObject,
        elt: &InMemElement,
        depth: usize,
    ) -> Result<()> {
        let tag = elt.tag();
        let private_creator = item.private_creator_of(tag);
        let name = || self.dict.tag_name(tag, private_creator.as_deref());
        let key = match self.format {
            DicomToJsonFormat::Human => name(),
            DicomToJsonFormat::Short | DicomToJsonFormat::Full => format!("{:x}", tag),
        };

        if let Value::Sequence(items) = elt.value() {
            ensure!(
                depth < self.max_depth,
                MaxDepthExceededSnafu {
                    max_depth: self.max_depth
                }
            );
            let children = items
                .iter()
                .map(|child| {
                    let mut node = Map::new();
                    self.dataset_to_json(&mut node, child, depth + 1)?;
                    Ok(JsonValue::Object(node))
                })
                .collect::<Result<Vec<_>>>()?;
            let children = JsonValue::Array(children);

            let out = match self.format {
                DicomToJsonFormat::Full => {
                    let mut node = Map::new();
                    node.insert("Name".to_string(), JsonValue::from(name()));
                    node.insert("Type".to_string(), JsonValue::from("Sequence"));
                    node.insert("Value".to_string(), children);
                    JsonValue::Object(node)
                }
                DicomToJsonFormat::Short | DicomToJsonFormat::Human => children,
            };
            parent.insert(key, out);
            return Ok(());
        }

        let value = extract_value(self.dict, elt, private_creator.as_deref(), &self.ctx)?;
        let max_string_length = if self.ctx.ignore_length.contains(&tag) {
            0
        } else {
            self.max_string_length
        };

        let mut node = Map::new();
        if self.format == DicomToJsonFormat::Full {
            node.insert("Name".to_string(), JsonValue::from(name()));
            if let Some(creator) = &private_creator {
                node.insert("PrivateCreator".to_string(), JsonValue::from(creator.as_str()));
            }
        }
        let out = leaf_value_to_json(
            &mut node,
            &value,
            self.format,
            self.ctx.flags,
            max_string_length,
        );
        parent.insert(key, out);
        Ok(())
    }
}
