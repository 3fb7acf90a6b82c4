//! Detection of the character set declared by a data set,
//! and transcoding of all of its text to another character set.
use crate::mem::InMemDicomObject;
use dcmbridge_core::value::{PrimitiveValue, Value};
use dcmbridge_core::{DataElement, VR};
use dcmbridge_dictionary_std::tags;
use dcmbridge_encoding::text::{convert_from_utf8, convert_to_utf8, Encoding};
use snafu::{ensure, Backtrace, Snafu};
use tracing::warn;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The data set nests sequences too deeply.
    #[snafu(display("Sequence nesting exceeds the limit of {} levels", max_depth))]
    MaxDepthExceeded { max_depth: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Determine the encoding of the text in a data set,
/// from its Specific Character Set (0008,0005) attribute.
///
/// Returns the encoding and whether code extensions are in use,
/// which is the case when more than one character set is declared.
/// Without the attribute, the given default is returned.
/// A declared character set which is not supported
/// falls back to ASCII.
///
/// ```
/// # use dcmbridge_core::VR;
/// # use dcmbridge_dictionary_std::tags;
/// # use dcmbridge_encoding::Encoding;
/// # use dcmbridge_object::{detect_encoding, InMemDicomObject};
/// let mut obj = InMemDicomObject::new_empty();
/// assert_eq!(detect_encoding(&obj, Encoding::Latin1), (Encoding::Latin1, false));
///
/// obj.put_primitive(tags::SPECIFIC_CHARACTER_SET, VR::CS, "\\ISO 2022 IR 149");
/// assert_eq!(detect_encoding(&obj, Encoding::Latin1), (Encoding::Korean, true));
/// ```
pub fn detect_encoding(obj: &InMemDicomObject, default: Encoding) -> (Encoding, bool) {
    let Some(terms) = obj.specific_character_set() else {
        return (default, false);
    };
    let has_code_extensions = terms.len() > 1;

    match terms.iter().find(|t| !t.is_empty()) {
        Some(term) => match Encoding::from_defined_term(term) {
            Some(encoding) => (encoding, has_code_extensions),
            None => {
                warn!(
                    "Value of Specific Character Set (0008,0005) is not supported: {}, fallback to ASCII (remove all special characters)",
                    term
                );
                (Encoding::Ascii, has_code_extensions)
            }
        },
        // the first entry may be empty when only code extensions are listed
        None => (default, has_code_extensions),
    }
}

/// Declare the given encoding in the Specific Character Set attribute.
pub fn set_specific_character_set(obj: &mut InMemDicomObject, encoding: Encoding) {
    obj.put(DataElement::new(
        tags::SPECIFIC_CHARACTER_SET,
        VR::CS,
        encoding.defined_term(),
    ));
}

/// Rewrite every text value of the data set,
/// items of sequences included,
/// from one encoding to another,
/// then declare the target encoding in the data set.
///
/// Nothing is done if both encodings are the same.
pub fn change_encoding(
    obj: &mut InMemDicomObject,
    from: Encoding,
    has_code_extensions: bool,
    to: Encoding,
    max_depth: usize,
) -> Result<()> {
    if from == to {
        return Ok(());
    }
    transcode(obj, from, has_code_extensions, to, 0, max_depth)?;
    set_specific_character_set(obj, to);
    Ok(())
}

fn transcode(
    obj: &mut InMemDicomObject,
    from: Encoding,
    has_code_extensions: bool,
    to: Encoding,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    for elt in obj.iter_mut() {
        let vr = elt.vr();
        match elt.value_mut() {
            Value::Primitive(PrimitiveValue::Text(bytes)) if vr.is_string() => {
                let text = convert_to_utf8(bytes, from, has_code_extensions);
                *bytes = convert_from_utf8(&text, to);
            }
            Value::Sequence(items) => {
                ensure!(depth < max_depth, MaxDepthExceededSnafu { max_depth });
                for item in items {
                    transcode(item, from, has_code_extensions, to, depth + 1, max_depth)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::sequence;
    use dcmbridge_core::{Tag, DEFAULT_MAX_DEPTH};
    use pretty_assertions::assert_eq;

    #[test]
    fn detect_without_attribute() {
        let obj = InMemDicomObject::new_empty();
        assert_eq!(detect_encoding(&obj, Encoding::Utf8), (Encoding::Utf8, false));
    }

    #[test]
    fn detect_single_character_set() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put_primitive(tags::SPECIFIC_CHARACTER_SET, VR::CS, "ISO_IR 192");
        assert_eq!(detect_encoding(&obj, Encoding::Latin1), (Encoding::Utf8, false));
    }

    #[test]
    fn detect_unknown_falls_back_to_ascii() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put_primitive(tags::SPECIFIC_CHARACTER_SET, VR::CS, "ISO_IR 999\\ISO 2022 IR 87");
        assert_eq!(detect_encoding(&obj, Encoding::Latin1), (Encoding::Ascii, true));
    }

    #[test]
    fn detect_empty_attribute_gives_default() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::empty(tags::SPECIFIC_CHARACTER_SET, VR::CS));
        assert_eq!(detect_encoding(&obj, Encoding::Latin2), (Encoding::Latin2, false));
    }

    #[test]
    fn change_encoding_recurses_into_items() {
        let item = InMemDicomObject::from_element_iter(vec![DataElement::new(
            Tag(0x0040, 0xA160),
            VR::UT,
            PrimitiveValue::Text(vec![b'S', 0xE9, b'b']),
        )]);
        let mut obj = InMemDicomObject::from_element_iter(vec![
            DataElement::new(
                tags::PATIENT_NAME,
                VR::PN,
                PrimitiveValue::Text(vec![b'J', 0xE9, b'r', 0xF4, b'm', 0xE9]),
            ),
            DataElement::new(Tag(0x0028, 0x0010), VR::US, PrimitiveValue::from(512_u16)),
            sequence(Tag(0x0040, 0xA730), vec![item]),
        ]);

        change_encoding(&mut obj, Encoding::Latin1, false, Encoding::Utf8, DEFAULT_MAX_DEPTH)
            .unwrap();

        assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some("Jérômé".as_bytes()));
        let items = obj.element(Tag(0x0040, 0xA730)).unwrap().items().unwrap();
        assert_eq!(items[0].raw_text(Tag(0x0040, 0xA160)), Some("Séb".as_bytes()));
        assert_eq!(
            obj.element(Tag(0x0028, 0x0010)).unwrap().value().primitive(),
            Some(&PrimitiveValue::from(512_u16))
        );
        assert_eq!(obj.ascii_value(tags::SPECIFIC_CHARACTER_SET).as_deref(), Some("ISO_IR 192"));
    }

    #[test]
    fn same_encoding_is_a_no_op() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put_primitive(tags::PATIENT_NAME, VR::PN, PrimitiveValue::Text(vec![0xE9]));
        let before = obj.clone();
        change_encoding(&mut obj, Encoding::Latin1, false, Encoding::Latin1, DEFAULT_MAX_DEPTH)
            .unwrap();
        assert_eq!(obj, before);
    }

    #[test]
    fn change_encoding_respects_depth() {
        let mut obj = InMemDicomObject::from_element_iter(vec![sequence(
            Tag(0x0040, 0xA730),
            vec![InMemDicomObject::new_empty()],
        )]);
        let err = change_encoding(&mut obj, Encoding::Latin1, false, Encoding::Utf8, 0).unwrap_err();
        assert!(matches!(err, Error::MaxDepthExceeded { max_depth: 0, .. }));
    }
}
