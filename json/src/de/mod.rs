//! Construction of data sets from documents.
//!
//! Documents are JSON objects keyed by tag (`gggg,eeee` or `ggggeeee`)
//! or by attribute name, as produced in the short and human formats.
//! Leaf values are strings (or null for empty elements).
//! Sequences are arrays of objects, one per item.
//!
//! The value representation of each element comes from the dictionary.
//! Tags which the dictionary does not know are created as `UN`.

use crate::options::FromJsonOptions;
use crate::value::{parse_data_uri, URI_SCHEME_PREFIX_BINARY};
use dcmbridge_core::{DataDictionary, DataElement, Tag, VrCategory, VR};
use dcmbridge_dictionary_std::{tags, DataDictionaryRegistry};
use dcmbridge_encoding::text::convert_from_utf8;
use dcmbridge_encoding::Encoding;
use dcmbridge_object::charset::set_specific_character_set;
use dcmbridge_object::{InMemDicomObject, InMemElement, ResourceLevel};
use serde_json::{Map, Value as JsonValue};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use tracing::debug;

mod value;

use self::value::{fill_binary, fill_parsed, fill_text};

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Expected a JSON object, found {}", found))]
    NotAnObject { found: &'static str, backtrace: Backtrace },
    #[snafu(display("Bad parameter type for tag {}: {}", tag, value))]
    UnexpectedValue {
        tag: Tag,
        value: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Tag {} is not a sequence, but was given an array", tag))]
    NotASequence { tag: Tag, backtrace: Backtrace },
    #[snafu(display("Sequence {} has an item which is not an object: {}", tag, value))]
    NotAnItem {
        tag: Tag,
        value: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Tag {} is a sequence, but was given a single value", tag))]
    SequenceValue { tag: Tag, backtrace: Backtrace },
    #[snafu(display("Could not parse tag `{}`", key))]
    ParseTag {
        key: String,
        source: dcmbridge_dictionary_std::Error,
    },
    #[snafu(display("Unknown encoding while creating DICOM from JSON: {}", value))]
    UnknownEncoding { value: String, backtrace: Backtrace },
    #[snafu(display("Malformed data URI in tag {}", tag))]
    DataUri { tag: Tag, backtrace: Backtrace },
    #[snafu(display("Tag {} with VR {:?} cannot hold {} bytes", tag, vr, len))]
    InvalidBinaryLength {
        tag: Tag,
        vr: VR,
        len: usize,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "While creating a DICOM instance, tag {} has out-of-range value: \"{}\"",
        tag,
        value
    ))]
    OutOfRangeValue {
        tag: Tag,
        value: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Sequence nesting exceeds the limit of {} levels", max_depth))]
    MaxDepthExceeded { max_depth: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Resolve the text encoding declared by a document.
///
/// The first value of the Specific Character Set entry names the encoding.
/// A document without one, or with an empty one, uses `default`.
pub fn extract_encoding(
    dict: &DataDictionaryRegistry,
    document: &JsonValue,
    default: Encoding,
) -> Result<Encoding> {
    let members = as_object(document)?;
    let declared = members
        .iter()
        .find(|(key, _)| dict.parse_tag(key).ok() == Some(tags::SPECIFIC_CHARACTER_SET))
        .map(|(_, value)| value);

    let text = match declared {
        None | Some(JsonValue::Null) => return Ok(default),
        Some(JsonValue::String(text)) => text,
        Some(other) => {
            return UnexpectedValueSnafu {
                tag: tags::SPECIFIC_CHARACTER_SET,
                value: other.to_string(),
            }
            .fail()
        }
    };
    let term = text.split('\\').next().unwrap_or_default().trim();
    if term.is_empty() {
        return Ok(default);
    }
    Encoding::from_defined_term(term).context(UnknownEncodingSnafu { value: text.as_str() })
}

/// Build a data set from a document.
///
/// The data set declares the encoding of the document
/// in its Specific Character Set,
/// and its text is encoded accordingly.
///
/// ```
/// # use dcmbridge_dictionary_std::{tags, DataDictionaryRegistry};
/// # use dcmbridge_json::{build_dataset, FromJsonOptions};
/// let dict = DataDictionaryRegistry::with_standard_entries(false)?;
/// let document = serde_json::json!({
///     "0010,0010": "Doe^John",
///     "Rows": "512",
/// });
/// let obj = build_dataset(&dict, &document, &FromJsonOptions::new())?;
/// assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some(&b"Doe^John"[..]));
/// assert_eq!(obj.ascii_value(tags::SPECIFIC_CHARACTER_SET).as_deref(), Some("ISO_IR 100"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn build_dataset(
    dict: &DataDictionaryRegistry,
    document: &JsonValue,
    options: &FromJsonOptions,
) -> Result<InMemDicomObject> {
    let encoding = extract_encoding(dict, document, options.default_encoding)?;
    let builder = DatasetBuilder {
        dict,
        decode_data_uri: options.decode_data_uri,
        encoding,
        max_depth: options.max_depth,
    };

    let mut obj = InMemDicomObject::new_empty();
    set_specific_character_set(&mut obj, encoding);
    let mut members = builder.parse_keys(as_object(document)?)?;
    members.retain(|(tag, _)| *tag != tags::SPECIFIC_CHARACTER_SET);
    builder.build_members(&mut obj, &members, 0)?;

    if options.generate_identifiers {
        for (tag, vr, level) in [
            (tags::PATIENT_ID, VR::LO, ResourceLevel::Patient),
            (tags::STUDY_INSTANCE_UID, VR::UI, ResourceLevel::Study),
            (tags::SERIES_INSTANCE_UID, VR::UI, ResourceLevel::Series),
            (tags::SOP_INSTANCE_UID, VR::UI, ResourceLevel::Instance),
        ] {
            if obj.element(tag).is_none() {
                obj.put(DataElement::new(tag, vr, options.uid_roots.generate(level)));
            }
        }
    }
    Ok(obj)
}

/// Build a single element from its generic value,
/// with text encoded in `encoding`.
///
/// Private attributes are resolved without a private creator,
/// so they are created as `UN` unless the dictionary
/// has a public entry for them.
pub fn build_element(
    dict: &DataDictionaryRegistry,
    tag: Tag,
    value: &JsonValue,
    options: &FromJsonOptions,
    encoding: Encoding,
) -> Result<InMemElement> {
    let builder = DatasetBuilder {
        dict,
        decode_data_uri: options.decode_data_uri,
        encoding,
        max_depth: options.max_depth,
    };
    builder.build_element(&InMemDicomObject::new_empty(), tag, value, 0)
}

struct DatasetBuilder<'a> {
    dict: &'a DataDictionaryRegistry,
    decode_data_uri: bool,
    encoding: Encoding,
    max_depth: usize,
}

impl DatasetBuilder<'_> {
    /// `item` is the item under construction,
    /// which holds the private creators of the elements built so far.
    fn build_element(
        &self,
        item: &InMemDicomObject,
        tag: Tag,
        value: &JsonValue,
        depth: usize,
    ) -> Result<InMemElement> {
        match value {
            JsonValue::String(text) => self.build_leaf(item, tag, text),
            JsonValue::Null => self.build_leaf(item, tag, ""),
            JsonValue::Array(entries) => self.build_sequence(item, tag, entries, depth),
            other => UnexpectedValueSnafu {
                tag,
                value: other.to_string(),
            }
            .fail(),
        }
    }

    fn vr_of(&self, item: &InMemDicomObject, tag: Tag) -> VR {
        let private_creator = if tag.is_private() {
            item.private_creator_of(tag)
        } else {
            None
        };
        self.dict
            .by_tag_with_creator(tag, private_creator.as_deref())
            .map(|entry| entry.vr_for_pixel_representation(item.pixel_representation()))
            .unwrap_or(VR::UN)
    }

    fn build_leaf(&self, item: &InMemDicomObject, tag: Tag, text: &str) -> Result<InMemElement> {
        let vr = self.vr_of(item, tag);
        ensure!(vr != VR::SQ, SequenceValueSnafu { tag });

        if self.decode_data_uri && text.starts_with(URI_SCHEME_PREFIX_BINARY) {
            let (_, content) = parse_data_uri(text).context(DataUriSnafu { tag })?;
            let value = if vr.is_string() {
                fill_raw_text(content)
            } else {
                fill_binary(tag, vr, &content)?
            };
            return Ok(DataElement::new(tag, vr, value));
        }

        let value = match vr.category() {
            VrCategory::Numeric | VrCategory::AttributeTag => fill_parsed(tag, vr, text)?,
            VrCategory::Binary => fill_binary(tag, vr, &self.encode(text))?,
            VrCategory::String if tag.is_private() => fill_raw_text(self.encode(text)),
            VrCategory::String => fill_text(tag, vr, self.encode(text))?,
            VrCategory::Sequence => return SequenceValueSnafu { tag }.fail(),
        };
        Ok(DataElement::new(tag, vr, value))
    }

    fn build_sequence(
        &self,
        item: &InMemDicomObject,
        tag: Tag,
        entries: &[JsonValue],
        depth: usize,
    ) -> Result<InMemElement> {
        let vr = self.vr_of(item, tag);
        // unknown attributes can still be sequences
        ensure!(vr == VR::SQ || vr == VR::UN, NotASequenceSnafu { tag });
        ensure!(
            depth < self.max_depth,
            MaxDepthExceededSnafu {
                max_depth: self.max_depth
            }
        );

        let items = entries
            .iter()
            .map(|entry| match entry {
                JsonValue::Object(members) => self.build_item(members, depth + 1),
                // some callers cannot tell an empty object from an empty array
                JsonValue::Array(inner) if inner.is_empty() => Ok(InMemDicomObject::new_empty()),
                other => NotAnItemSnafu {
                    tag,
                    value: other.to_string(),
                }
                .fail(),
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Built sequence {} with {} items", tag, items.len());
        Ok(DataElement::new(tag, VR::SQ, items))
    }

    fn build_item(&self, members: &Map<String, JsonValue>, depth: usize) -> Result<InMemDicomObject> {
        let mut item = InMemDicomObject::new_empty();
        let members = self.parse_keys(members)?;
        self.build_members(&mut item, &members, depth)?;
        Ok(item)
    }

    fn parse_keys<'m>(
        &self,
        members: &'m Map<String, JsonValue>,
    ) -> Result<Vec<(Tag, &'m JsonValue)>> {
        members
            .iter()
            .map(|(key, value)| {
                let tag = self.dict.parse_tag(key).context(ParseTagSnafu { key })?;
                Ok((tag, value))
            })
            .collect()
    }

    /// Build the members of an item into `item`, in document order.
    ///
    /// Private creators and the Pixel Representation are built first,
    /// since the VR of other members may depend on them
    /// wherever they appear in the document.
    fn build_members(
        &self,
        item: &mut InMemDicomObject,
        members: &[(Tag, &JsonValue)],
        depth: usize,
    ) -> Result<()> {
        let mut context = item.clone();
        for (tag, value) in members
            .iter()
            .filter(|(tag, _)| tag.is_private_creator() || *tag == tags::PIXEL_REPRESENTATION)
        {
            let elt = self.build_element(&context, *tag, value, depth)?;
            context.put(elt);
        }

        for (tag, value) in members {
            let elt = match context.element(*tag) {
                Some(elt) if tag.is_private_creator() || *tag == tags::PIXEL_REPRESENTATION => {
                    elt.clone()
                }
                _ => self.build_element(&context, *tag, value, depth)?,
            };
            item.put(elt);
        }
        Ok(())
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        match self.encoding {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            encoding => convert_from_utf8(text, encoding),
        }
    }
}

fn fill_raw_text(bytes: Vec<u8>) -> dcmbridge_core::PrimitiveValue {
    if bytes.is_empty() {
        dcmbridge_core::PrimitiveValue::Empty
    } else {
        dcmbridge_core::PrimitiveValue::Text(bytes)
    }
}

fn as_object(document: &JsonValue) -> Result<&Map<String, JsonValue>> {
    document.as_object().context(NotAnObjectSnafu {
        found: json_kind(document),
    })
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmbridge_core::{dicom_value, PrimitiveValue};
    use dcmbridge_object::UidRoots;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dict() -> DataDictionaryRegistry {
        DataDictionaryRegistry::with_standard_entries(true).unwrap()
    }

    fn build(document: JsonValue) -> Result<InMemDicomObject> {
        build_dataset(&dict(), &document, &FromJsonOptions::new())
    }

    fn primitive(obj: &InMemDicomObject, tag: Tag) -> PrimitiveValue {
        obj.element(tag)
            .and_then(|e| e.value().primitive())
            .cloned()
            .unwrap()
    }

    #[test]
    fn leaves_by_vr() {
        let obj = build(json!({
            "0010,0010": "Doe^John",
            "PatientID": "1234",
            "00280010": "512",
            "0018,9089": "0.5\\0.25\\-1",
            "0028,0009": "0018,1063",
            "0008,1030": null,
        }))
        .unwrap();

        assert_eq!(obj.element(tags::PATIENT_NAME).unwrap().vr(), VR::PN);
        assert_eq!(primitive(&obj, tags::PATIENT_NAME), PrimitiveValue::from("Doe^John"));
        assert_eq!(primitive(&obj, tags::PATIENT_ID), PrimitiveValue::from("1234"));
        assert_eq!(primitive(&obj, Tag(0x0028, 0x0010)), dicom_value!(U16, [512]));
        assert_eq!(
            primitive(&obj, Tag(0x0018, 0x9089)),
            dicom_value!(F64, [0.5, 0.25, -1.])
        );
        assert_eq!(
            primitive(&obj, Tag(0x0028, 0x0009)),
            dicom_value!(Tags, [Tag(0x0018, 0x1063)])
        );
        assert_eq!(primitive(&obj, Tag(0x0008, 0x1030)), PrimitiveValue::Empty);
        // the declared encoding comes first
        assert_eq!(obj.len(), 7);
        assert_eq!(
            obj.ascii_value(tags::SPECIFIC_CHARACTER_SET).as_deref(),
            Some("ISO_IR 100")
        );
    }

    #[test]
    fn text_follows_the_declared_encoding() {
        let obj = build(json!({
            "0008,0005": "ISO_IR 100",
            "0010,0010": "Hélène",
        }))
        .unwrap();
        assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some(&b"H\xE9l\xE8ne"[..]));

        let obj = build(json!({
            "SpecificCharacterSet": "ISO_IR 192",
            "0010,0010": "Hélène",
        }))
        .unwrap();
        assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some("Hélène".as_bytes()));
        assert_eq!(
            obj.ascii_value(tags::SPECIFIC_CHARACTER_SET).as_deref(),
            Some("ISO_IR 192")
        );
    }

    #[test]
    fn document_encoding() {
        let dict = dict();
        assert_eq!(
            extract_encoding(&dict, &json!({}), Encoding::Latin2).unwrap(),
            Encoding::Latin2
        );
        assert_eq!(
            extract_encoding(&dict, &json!({ "0008,0005": "" }), Encoding::Latin2).unwrap(),
            Encoding::Latin2
        );
        assert_eq!(
            extract_encoding(&dict, &json!({ "00080005": "ISO_IR 144" }), Encoding::Latin1)
                .unwrap(),
            Encoding::Cyrillic
        );

        let err = extract_encoding(&dict, &json!({ "0008,0005": "KLINGON" }), Encoding::Latin1)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown encoding while creating DICOM from JSON: KLINGON"
        );
        assert!(matches!(
            extract_encoding(&dict, &json!({ "0008,0005": 100 }), Encoding::Latin1),
            Err(Error::UnexpectedValue { .. })
        ));
        assert!(matches!(
            extract_encoding(&dict, &json!(["0008,0005"]), Encoding::Latin1),
            Err(Error::NotAnObject { found: "an array", .. })
        ));
    }

    #[test]
    fn sequences() {
        let obj = build(json!({
            "ReferencedImageSequence": [
                { "0008,1150": "1.2.840.10008.5.1.4.1.1.2", "0008,1155": "1.2.3.4" },
                [],
                {},
            ],
            "0008,1115": [],
        }))
        .unwrap();

        let items = obj.element(Tag(0x0008, 0x1140)).unwrap().items().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0].raw_text(Tag(0x0008, 0x1155)),
            Some(&b"1.2.3.4"[..])
        );
        assert!(items[1].is_empty());
        assert!(items[2].is_empty());
        assert_eq!(obj.element(Tag(0x0008, 0x1115)).unwrap().items(), Some(&[][..]));
    }

    #[test]
    fn sequence_shape_errors() {
        assert!(matches!(
            build(json!({ "0008,1140": [["0008,1150"]] })),
            Err(Error::NotAnItem { .. })
        ));
        assert!(matches!(
            build(json!({ "0008,1140": ["1.2.3"] })),
            Err(Error::NotAnItem { .. })
        ));
        assert!(matches!(
            build(json!({ "0010,0010": [] })),
            Err(Error::NotASequence { .. })
        ));
        assert!(matches!(
            build(json!({ "0008,1140": "1.2.3" })),
            Err(Error::SequenceValue { .. })
        ));
        assert!(matches!(
            build(json!({ "0010,0010": 42 })),
            Err(Error::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn nesting_is_limited() {
        let document = json!({
            "0008,1140": [ { "0008,1199": [ { "0008,1155": "1.2.3" } ] } ],
        });
        let options = FromJsonOptions::new().max_depth(1);
        assert!(matches!(
            build_dataset(&dict(), &document, &options),
            Err(Error::MaxDepthExceeded { max_depth: 1, .. })
        ));
        let options = FromJsonOptions::new().max_depth(2);
        assert!(build_dataset(&dict(), &document, &options).is_ok());
    }

    #[test]
    fn binary_from_data_uris() {
        // bytes 1, 2, 3, 4
        let obj = build(json!({ "7FE0,0010": "data:application/octet-stream;base64,AQIDBA==" }))
            .unwrap();
        assert_eq!(primitive(&obj, tags::PIXEL_DATA), dicom_value!(U16, [0x0201, 0x0403]));

        // bytes 1, 2, 3
        let err = build(json!({ "7FE0,0010": "data:application/octet-stream;base64,AQID" }))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBinaryLength { vr: VR::OW, len: 3, .. }
        ));

        assert!(matches!(
            build(json!({ "7FE0,0010": "data:application/octet-stream;base64,A*==" })),
            Err(Error::DataUri { .. })
        ));
    }

    #[test]
    fn data_uris_are_text_when_not_decoded() {
        let document = json!({ "0008,1030": "data:application/octet-stream;base64,AQID" });
        let options = FromJsonOptions::new().decode_data_uri(false);
        let obj = build_dataset(&dict(), &document, &options).unwrap();
        assert_eq!(
            obj.raw_text(Tag(0x0008, 0x1030)),
            Some(&b"data:application/octet-stream;base64,AQID"[..])
        );
    }

    #[test]
    fn bad_values() {
        let err = build(json!({ "0028,0010": "many" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "While creating a DICOM instance, tag (0028,0010) has out-of-range value: \"many\""
        );
        assert!(matches!(
            build(json!({ "StudyDate": "yesterday" })),
            Err(Error::OutOfRangeValue { .. })
        ));
        assert!(build(json!({ "StudyDate": "20230610" })).is_ok());
        assert!(matches!(
            build(json!({ "NoSuchAttribute": "1" })),
            Err(Error::ParseTag { .. })
        ));
    }

    #[test]
    fn private_and_unknown_tags() {
        let obj = build(json!({
            "0009,0010": "GEMS_IDEN_01",
            "0009,1001": "full",
            "0019,0010": "GEMS_ACQU_01",
            "0019,1002": "64",
            "0011,1010": "opaque",
        }))
        .unwrap();

        let known = obj.element(Tag(0x0009, 0x1001)).unwrap();
        assert_eq!(known.vr(), VR::LO);
        assert_eq!(known.value().primitive(), Some(&PrimitiveValue::from("full")));

        let numeric = obj.element(Tag(0x0019, 0x1002)).unwrap();
        assert_eq!(numeric.vr(), VR::SL);
        assert_eq!(numeric.value().primitive(), Some(&dicom_value!(I32, [64])));

        let unknown = obj.element(Tag(0x0011, 0x1010)).unwrap();
        assert_eq!(unknown.vr(), VR::UN);
        assert_eq!(
            unknown.value().primitive(),
            Some(&PrimitiveValue::from(&b"opaque"[..]))
        );
    }

    #[test]
    fn private_creators_may_come_after_their_elements() {
        let obj = build(json!({
            "0019,1002": "64",
            "0019,0010": "GEMS_ACQU_01",
            "0040,A730": [{
                "0009,1001": "full",
                "0009,0010": "GEMS_IDEN_01",
            }],
        }))
        .unwrap();

        let numeric = obj.element(Tag(0x0019, 0x1002)).unwrap();
        assert_eq!(numeric.vr(), VR::SL);
        assert_eq!(numeric.value().primitive(), Some(&dicom_value!(I32, [64])));
        let order: Vec<_> = obj.tags().filter(|t| t.group() == 0x0019).collect();
        assert_eq!(order, vec![Tag(0x0019, 0x1002), Tag(0x0019, 0x0010)]);

        let items = obj.element(Tag(0x0040, 0xA730)).unwrap().items().unwrap();
        let known = items[0].element(Tag(0x0009, 0x1001)).unwrap();
        assert_eq!(known.vr(), VR::LO);
        assert_eq!(known.value().primitive(), Some(&PrimitiveValue::from("full")));
    }

    #[test]
    fn pixel_values_follow_the_pixel_representation() {
        let obj = build(json!({
            "SmallestImagePixelValue": "-1024",
            "PixelRepresentation": "1",
        }))
        .unwrap();
        let smallest = obj.element(tags::SMALLEST_IMAGE_PIXEL_VALUE).unwrap();
        assert_eq!(smallest.vr(), VR::SS);
        assert_eq!(primitive(&obj, tags::SMALLEST_IMAGE_PIXEL_VALUE), dicom_value!(I16, [-1024]));

        let obj = build(json!({ "SmallestImagePixelValue": "1024" })).unwrap();
        assert_eq!(obj.element(tags::SMALLEST_IMAGE_PIXEL_VALUE).unwrap().vr(), VR::US);
    }

    #[test]
    fn identifiers_are_generated_when_missing() {
        let roots = UidRoots {
            study: "1.2.3.1".to_string(),
            series: "1.2.3.2".to_string(),
            instance: "1.2.3.3".to_string(),
        };
        let options = FromJsonOptions::new()
            .generate_identifiers(true)
            .uid_roots(roots);
        let document = json!({ "PatientID": "1234" });
        let obj = build_dataset(&dict(), &document, &options).unwrap();

        assert_eq!(obj.ascii_value(tags::PATIENT_ID).as_deref(), Some("1234"));
        for (tag, root) in [
            (tags::STUDY_INSTANCE_UID, "1.2.3.1."),
            (tags::SERIES_INSTANCE_UID, "1.2.3.2."),
            (tags::SOP_INSTANCE_UID, "1.2.3.3."),
        ] {
            let uid = obj.ascii_value(tag).unwrap();
            assert!(uid.starts_with(root), "{} does not start with {}", uid, root);
            assert_eq!(obj.element(tag).unwrap().vr(), VR::UI);
        }

        let obj = build(json!({})).unwrap();
        assert!(obj.element(tags::PATIENT_ID).is_none());
    }

    #[test]
    fn single_elements() {
        let elt = build_element(
            &dict(),
            tags::PATIENT_NAME,
            &json!("Müller"),
            &FromJsonOptions::new(),
            Encoding::Latin1,
        )
        .unwrap();
        assert_eq!(elt.value().primitive(), Some(&PrimitiveValue::Text(b"M\xFCller".to_vec())));
    }
}
