//! Depth-first traversal of a data set, leaf by leaf.
//!
//! A [`TagVisitor`] is told about every leaf of the data set,
//! along with the path of sequences and item indexes leading to it.
//! Text leaves are handed over in UTF-8,
//! and the visitor may ask for their replacement.
//!
//! The traversal itself never modifies the data set:
//! [`visit`] collects the requested replacements as [`Edit`]s,
//! which [`apply_edits`] writes back afterwards.
//! [`apply`] does both in one go.
use crate::charset::detect_encoding;
use crate::mem::{InMemDicomObject, InMemElement};
use dcmbridge_core::value::{PrimitiveValue, Value};
use dcmbridge_core::{Tag, VrCategory, VR};
use dcmbridge_encoding::text::{convert_from_utf8, convert_to_utf8, Encoding};
use smallvec::SmallVec;
use snafu::{ensure, Backtrace, OptionExt, Snafu};
use tracing::warn;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The data set nests sequences too deeply.
    #[snafu(display("Sequence nesting exceeds the limit of {} levels", max_depth))]
    MaxDepthExceeded { max_depth: usize, backtrace: Backtrace },
    /// An edit refers to an element which is not in the data set.
    #[snafu(display("No element {} at the path of the edit", tag))]
    MissingTarget { tag: Tag, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What to do with a text leaf after visiting it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    /// Keep the value as is.
    #[default]
    None,
    /// Replace the value with the given text.
    Replace(String),
}

/// A visitor of the leaves of a data set.
///
/// Every method receives the tags of the enclosing sequences
/// and the index of the enclosing item in each of them,
/// from the outermost to the innermost.
/// All methods do nothing by default.
pub trait TagVisitor {
    /// A leaf whose content cannot be interpreted.
    fn visit_not_supported(
        &mut self,
        _parent_tags: &[Tag],
        _parent_indexes: &[usize],
        _tag: Tag,
        _vr: VR,
    ) {
    }

    /// A sequence without items.
    fn visit_empty_sequence(&mut self, _parent_tags: &[Tag], _parent_indexes: &[usize], _tag: Tag) {}

    /// A leaf of opaque binary data.
    fn visit_binary(
        &mut self,
        _parent_tags: &[Tag],
        _parent_indexes: &[usize],
        _tag: Tag,
        _vr: VR,
        _data: &[u8],
    ) {
    }

    /// A leaf of binary integers.
    fn visit_integers(
        &mut self,
        _parent_tags: &[Tag],
        _parent_indexes: &[usize],
        _tag: Tag,
        _vr: VR,
        _values: &[i64],
    ) {
    }

    /// A leaf of binary floating point numbers.
    fn visit_doubles(
        &mut self,
        _parent_tags: &[Tag],
        _parent_indexes: &[usize],
        _tag: Tag,
        _vr: VR,
        _values: &[f64],
    ) {
    }

    /// A leaf of attribute tags.
    fn visit_attributes(
        &mut self,
        _parent_tags: &[Tag],
        _parent_indexes: &[usize],
        _tag: Tag,
        _values: &[Tag],
    ) {
    }

    /// A leaf of text, decoded to UTF-8.
    fn visit_string(
        &mut self,
        _parent_tags: &[Tag],
        _parent_indexes: &[usize],
        _tag: Tag,
        _vr: VR,
        _value: &str,
    ) -> Action {
        Action::None
    }
}

/// The tags or item indexes leading from the root of a data set to a leaf.
pub type Path<T> = SmallVec<[T; 4]>;

/// A replacement of a text leaf, requested during a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// the tags of the enclosing sequences
    pub parent_tags: Path<Tag>,
    /// the index of the enclosing item in each sequence
    pub parent_indexes: Path<usize>,
    /// the tag of the leaf
    pub tag: Tag,
    /// the new value, in UTF-8
    pub value: String,
}

/// Walk the data set in tag order, depth first,
/// and collect the replacements asked by the visitor.
///
/// Text is decoded with the character set declared by the data set,
/// or `default_encoding` if it declares none.
pub fn visit<V>(
    obj: &InMemDicomObject,
    visitor: &mut V,
    default_encoding: Encoding,
    max_depth: usize,
) -> Result<Vec<Edit>>
where
    V: TagVisitor + ?Sized,
{
    let (encoding, has_code_extensions) = detect_encoding(obj, default_encoding);
    let mut walk = Walk {
        visitor,
        encoding,
        has_code_extensions,
        max_depth,
        parent_tags: Path::new(),
        parent_indexes: Path::new(),
        edits: Vec::new(),
    };
    walk.object(obj)?;
    Ok(walk.edits)
}

/// Write the given replacements into the data set,
/// encoded in the character set declared by the data set,
/// or `default_encoding` if it declares none.
pub fn apply_edits(
    obj: &mut InMemDicomObject,
    edits: &[Edit],
    default_encoding: Encoding,
) -> Result<()> {
    let (encoding, _) = detect_encoding(obj, default_encoding);
    for edit in edits {
        let mut target = &mut *obj;
        for (tag, index) in edit.parent_tags.iter().zip(&edit.parent_indexes) {
            target = target
                .element_mut(*tag)
                .and_then(|e| e.items_mut())
                .and_then(|items| items.get_mut(*index))
                .context(MissingTargetSnafu { tag: *tag })?;
        }
        let element = target
            .element_mut(edit.tag)
            .context(MissingTargetSnafu { tag: edit.tag })?;
        *element.value_mut() =
            Value::Primitive(PrimitiveValue::Text(convert_from_utf8(&edit.value, encoding)));
    }
    Ok(())
}

/// Walk the data set with the visitor,
/// then write back the replacements it asked for.
pub fn apply<V>(
    obj: &mut InMemDicomObject,
    visitor: &mut V,
    default_encoding: Encoding,
    max_depth: usize,
) -> Result<()>
where
    V: TagVisitor + ?Sized,
{
    let edits = visit(obj, visitor, default_encoding, max_depth)?;
    apply_edits(obj, &edits, default_encoding)
}

struct Walk<'v, V: ?Sized> {
    visitor: &'v mut V,
    encoding: Encoding,
    has_code_extensions: bool,
    max_depth: usize,
    parent_tags: Path<Tag>,
    parent_indexes: Path<usize>,
    edits: Vec<Edit>,
}

impl<V> Walk<'_, V>
where
    V: TagVisitor + ?Sized,
{
    fn object(&mut self, obj: &InMemDicomObject) -> Result<()> {
        for elt in obj.sorted_elements() {
            self.element(elt)?;
        }
        Ok(())
    }

    fn element(&mut self, elt: &InMemElement) -> Result<()> {
        let tag = elt.tag();
        match elt.value() {
            Value::Sequence(items) if items.is_empty() => {
                self.visitor
                    .visit_empty_sequence(&self.parent_tags, &self.parent_indexes, tag);
            }
            Value::Sequence(items) => {
                ensure!(
                    self.parent_tags.len() < self.max_depth,
                    MaxDepthExceededSnafu {
                        max_depth: self.max_depth,
                    }
                );
                self.parent_tags.push(tag);
                self.parent_indexes.push(0);
                for (i, item) in items.iter().enumerate() {
                    if let Some(index) = self.parent_indexes.last_mut() {
                        *index = i;
                    }
                    self.object(item)?;
                }
                self.parent_tags.pop();
                self.parent_indexes.pop();
            }
            Value::PixelSequence(_) => {
                self.visitor.visit_not_supported(
                    &self.parent_tags,
                    &self.parent_indexes,
                    tag,
                    elt.vr(),
                );
            }
            Value::Primitive(value) => self.leaf(tag, elt.vr(), value),
        }
        Ok(())
    }

    fn leaf(&mut self, tag: Tag, vr: VR, value: &PrimitiveValue) {
        let tags = &self.parent_tags;
        let indexes = &self.parent_indexes;
        match (vr.category(), value) {
            (VrCategory::Binary, _) => {
                self.visitor
                    .visit_binary(tags, indexes, tag, vr, &value.to_le_bytes());
            }
            (VrCategory::String, PrimitiveValue::Empty) => self.string(tag, vr, String::new(), true),
            (VrCategory::String, PrimitiveValue::Text(bytes)) => {
                let text = convert_to_utf8(bytes, self.encoding, self.has_code_extensions);
                self.string(tag, vr, text, true)
            }
            (VrCategory::String, _) => match value.to_joined_decimal_string() {
                Some(text) => self.string(tag, vr, text, false),
                None => self.visitor.visit_not_supported(tags, indexes, tag, vr),
            },
            (VrCategory::Numeric, PrimitiveValue::Empty) if matches!(vr, VR::FL | VR::FD) => {
                self.visitor.visit_doubles(tags, indexes, tag, vr, &[]);
            }
            (VrCategory::Numeric, PrimitiveValue::Empty) => {
                self.visitor.visit_integers(tags, indexes, tag, vr, &[]);
            }
            (VrCategory::Numeric, _) => {
                if let Some(values) = value.to_f64s() {
                    self.visitor.visit_doubles(tags, indexes, tag, vr, &values);
                } else if let Some(values) = value.to_i64s() {
                    self.visitor.visit_integers(tags, indexes, tag, vr, &values);
                } else {
                    self.visitor.visit_not_supported(tags, indexes, tag, vr);
                }
            }
            (VrCategory::AttributeTag, PrimitiveValue::Empty) => {
                self.visitor.visit_attributes(tags, indexes, tag, &[]);
            }
            (VrCategory::AttributeTag, PrimitiveValue::Tags(values)) => {
                self.visitor.visit_attributes(tags, indexes, tag, values);
            }
            (VrCategory::Sequence, PrimitiveValue::Empty) => {
                self.visitor.visit_empty_sequence(tags, indexes, tag);
            }
            _ => self.visitor.visit_not_supported(tags, indexes, tag, vr),
        }
    }

    fn string(&mut self, tag: Tag, vr: VR, text: String, replaceable: bool) {
        let action =
            self.visitor
                .visit_string(&self.parent_tags, &self.parent_indexes, tag, vr, &text);
        match action {
            Action::None => {}
            Action::Replace(value) if replaceable => self.edits.push(Edit {
                parent_tags: self.parent_tags.clone(),
                parent_indexes: self.parent_indexes.clone(),
                tag,
                value,
            }),
            Action::Replace(_) => {
                warn!("Cannot replace this string tag: {}", tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::sequence;
    use dcmbridge_core::{dicom_value, DataElement, DEFAULT_MAX_DEPTH};
    use dcmbridge_dictionary_std::tags;
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;

    /// Records every call in a readable form.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    fn path(tags: &[Tag], indexes: &[usize]) -> String {
        tags.iter()
            .zip(indexes)
            .map(|(t, i)| format!("{:x}[{}]/", t, i))
            .collect()
    }

    impl TagVisitor for Recorder {
        fn visit_not_supported(&mut self, t: &[Tag], i: &[usize], tag: Tag, vr: VR) {
            self.calls.push(format!("{}{:x} unsupported {}", path(t, i), tag, vr));
        }

        fn visit_empty_sequence(&mut self, t: &[Tag], i: &[usize], tag: Tag) {
            self.calls.push(format!("{}{:x} empty", path(t, i), tag));
        }

        fn visit_binary(&mut self, t: &[Tag], i: &[usize], tag: Tag, _vr: VR, data: &[u8]) {
            self.calls.push(format!("{}{:x} binary {:?}", path(t, i), tag, data));
        }

        fn visit_integers(&mut self, t: &[Tag], i: &[usize], tag: Tag, _vr: VR, v: &[i64]) {
            self.calls.push(format!("{}{:x} integers {:?}", path(t, i), tag, v));
        }

        fn visit_doubles(&mut self, t: &[Tag], i: &[usize], tag: Tag, _vr: VR, v: &[f64]) {
            self.calls.push(format!("{}{:x} doubles {:?}", path(t, i), tag, v));
        }

        fn visit_attributes(&mut self, t: &[Tag], i: &[usize], tag: Tag, v: &[Tag]) {
            let v: Vec<_> = v.iter().map(|t| t.to_string()).collect();
            self.calls.push(format!("{}{:x} attributes {}", path(t, i), tag, v.join(" ")));
        }

        fn visit_string(&mut self, t: &[Tag], i: &[usize], tag: Tag, _vr: VR, v: &str) -> Action {
            self.calls.push(format!("{}{:x} string {}", path(t, i), tag, v));
            Action::None
        }
    }

    struct Redact;

    impl TagVisitor for Redact {
        fn visit_string(&mut self, _: &[Tag], _: &[usize], _: Tag, _: VR, _: &str) -> Action {
            Action::Replace("REDACTED".to_string())
        }
    }

    #[test]
    fn leaves_are_visited_in_tag_order() {
        let item = |text: &str| {
            InMemDicomObject::from_element_iter(vec![DataElement::new(
                Tag(0x0040, 0xA160),
                VR::UT,
                text,
            )])
        };
        let obj = InMemDicomObject::from_element_iter(vec![
            sequence(Tag(0x0040, 0xA730), vec![item("a"), item("b")]),
            DataElement::new(Tag(0x0028, 0x0010), VR::US, dicom_value!(U16, [512])),
            DataElement::new(Tag(0x0018, 0x0050), VR::FD, dicom_value!(F64, [0.5])),
            DataElement::new(Tag(0x0020, 0x9165), VR::AT, dicom_value!(Tags, [Tag(0x0010, 0x0010)])),
            DataElement::new(Tag(0x0009, 0x1001), VR::OB, PrimitiveValue::from(&[1_u8, 2][..])),
            sequence(Tag(0x0008, 0x1140), vec![]),
            DataElement::new(tags::PATIENT_NAME, VR::PN, "Doe^John"),
        ]);

        let mut recorder = Recorder::default();
        let edits = visit(&obj, &mut recorder, Encoding::Latin1, DEFAULT_MAX_DEPTH).unwrap();
        assert!(edits.is_empty());
        assert_eq!(
            recorder.calls,
            vec![
                "0008,1140 empty",
                "0009,1001 binary [1, 2]",
                "0010,0010 string Doe^John",
                "0018,0050 doubles [0.5]",
                "0020,9165 attributes (0010,0010)",
                "0028,0010 integers [512]",
                "0040,a730[0]/0040,a160 string a",
                "0040,a730[1]/0040,a160 string b",
            ]
        );
    }

    #[test]
    fn redaction_only_touches_text() {
        let mut obj = InMemDicomObject::from_element_iter(vec![
            DataElement::new(tags::PATIENT_NAME, VR::PN, "Doe^John"),
            DataElement::new(Tag(0x0028, 0x0010), VR::US, dicom_value!(U16, [512])),
        ]);
        apply(&mut obj, &mut Redact, Encoding::Latin1, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some(&b"REDACTED"[..]));
        assert_eq!(
            obj.element(Tag(0x0028, 0x0010)).unwrap().value().primitive(),
            Some(&dicom_value!(U16, [512]))
        );
    }

    #[test]
    fn numbers_in_text_elements_are_not_replaced() {
        let mut obj = InMemDicomObject::from_element_iter(vec![DataElement::new(
            tags::PATIENT_WEIGHT,
            VR::DS,
            dicom_value!(F64, [70.5]),
        )]);
        let edits = visit(&obj, &mut Redact, Encoding::Latin1, DEFAULT_MAX_DEPTH).unwrap();
        assert!(edits.is_empty());
        apply(&mut obj, &mut Redact, Encoding::Latin1, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(
            obj.element(tags::PATIENT_WEIGHT).unwrap().value().primitive(),
            Some(&dicom_value!(F64, [70.5]))
        );
    }

    #[test]
    fn replacements_in_items_use_the_declared_encoding() {
        let item = InMemDicomObject::from_element_iter(vec![DataElement::new(
            Tag(0x0040, 0xA160),
            VR::UT,
            "x",
        )]);
        let mut obj = InMemDicomObject::from_element_iter(vec![
            DataElement::new(tags::SPECIFIC_CHARACTER_SET, VR::CS, "ISO_IR 100"),
            sequence(Tag(0x0040, 0xA730), vec![item]),
        ]);
        let edits = vec![Edit {
            parent_tags: smallvec![Tag(0x0040, 0xA730)],
            parent_indexes: smallvec![0],
            tag: Tag(0x0040, 0xA160),
            value: "é".to_string(),
        }];
        apply_edits(&mut obj, &edits, Encoding::Utf8).unwrap();
        let items = obj.element(Tag(0x0040, 0xA730)).unwrap().items().unwrap();
        assert_eq!(items[0].raw_text(Tag(0x0040, 0xA160)), Some(&[0xE9][..]));
    }

    #[test]
    fn edits_carry_the_path_to_their_leaf() {
        let item = |text: &str| {
            InMemDicomObject::from_element_iter(vec![DataElement::new(
                Tag(0x0040, 0xA160),
                VR::UT,
                text,
            )])
        };
        let obj = InMemDicomObject::from_element_iter(vec![sequence(
            Tag(0x0040, 0xA730),
            vec![item("a"), item("b")],
        )]);
        let edits = visit(&obj, &mut Redact, Encoding::Latin1, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(edits.len(), 2);
        assert_eq!(&edits[1].parent_tags[..], &[Tag(0x0040, 0xA730)]);
        assert_eq!(&edits[1].parent_indexes[..], &[1]);
        assert_eq!(edits[1].tag, Tag(0x0040, 0xA160));
    }

    #[test]
    fn edits_with_a_stale_path_fail() {
        let mut obj = InMemDicomObject::new_empty();
        let edits = vec![Edit {
            parent_tags: smallvec![Tag(0x0040, 0xA730)],
            parent_indexes: smallvec![3],
            tag: tags::PATIENT_NAME,
            value: String::new(),
        }];
        let err = apply_edits(&mut obj, &edits, Encoding::Utf8).unwrap_err();
        assert!(matches!(err, Error::MissingTarget { .. }));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let obj = InMemDicomObject::from_element_iter(vec![sequence(
            Tag(0x0040, 0xA730),
            vec![InMemDicomObject::new_empty()],
        )]);
        let err = visit(&obj, &mut Redact, Encoding::Latin1, 0).unwrap_err();
        assert!(matches!(err, Error::MaxDepthExceeded { .. }));
    }
}
