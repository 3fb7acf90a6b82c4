//! Round trips of data sets through byte buffers,
//! with the standard dictionary resolving implicit VRs.

use dcmbridge_core::{dicom_value, DataElement, PixelFragmentSequence, PrimitiveValue, Tag, VR};
use dcmbridge_dictionary_std::{tags, uids, DataDictionaryRegistry};
use dcmbridge_encoding::text::{convert_from_utf8, convert_to_utf8};
use dcmbridge_encoding::Encoding;
use dcmbridge_object::mem::sequence;
use dcmbridge_object::visit::{self, Action, TagVisitor};
use dcmbridge_object::{
    change_encoding, detect_encoding, FileDicomObject, FileMetaTableBuilder, InMemDicomObject,
};
use pretty_assertions::assert_eq;

fn dictionary() -> DataDictionaryRegistry {
    DataDictionaryRegistry::with_standard_entries(false).unwrap()
}

fn study() -> InMemDicomObject {
    InMemDicomObject::from_element_iter(vec![
        DataElement::new(tags::SPECIFIC_CHARACTER_SET, VR::CS, "ISO_IR 100"),
        DataElement::new(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.7"),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, "2.25.1234"),
        DataElement::new(tags::MODALITY, VR::CS, "OT"),
        DataElement::new(
            tags::PATIENT_NAME,
            VR::PN,
            PrimitiveValue::Text(vec![b'H', 0xE9, b'l', 0xE8, b'n', b'e']),
        ),
        DataElement::new(tags::PATIENT_ID, VR::LO, "ID-1"),
        DataElement::new(tags::PATIENT_WEIGHT, VR::DS, "71.5"),
        DataElement::new(tags::STUDY_INSTANCE_UID, VR::UI, "2.25.1"),
        DataElement::new(tags::SERIES_INSTANCE_UID, VR::UI, "2.25.2"),
        DataElement::new(Tag(0x0028, 0x0010), VR::US, dicom_value!(U16, [4])),
        DataElement::new(Tag(0x0028, 0x0011), VR::US, dicom_value!(U16, [2])),
        DataElement::new(tags::PIXEL_DATA, VR::OW, dicom_value!(U16, [1, 2, 3, 4, 5, 6, 7, 8])),
    ])
}

fn with_transfer_syntax(obj: InMemDicomObject, uid: &str) -> FileDicomObject {
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
        .media_storage_sop_instance_uid("2.25.1234")
        .transfer_syntax(uid)
        .build()
        .unwrap();
    FileDicomObject::new(meta, obj)
}

#[test]
fn implicit_vr_round_trip_with_standard_dictionary() {
    let dict = dictionary();
    let file = with_transfer_syntax(study(), uids::IMPLICIT_VR_LITTLE_ENDIAN);
    let mut buffer = Vec::new();
    file.save_to_buffer(&mut buffer).unwrap();

    let read = FileDicomObject::from_buffer(&buffer, &dict).unwrap();
    assert_eq!(read.transfer_syntax_uid(), Some(uids::IMPLICIT_VR_LITTLE_ENDIAN));
    assert_eq!(read.obj(), &study());
}

#[test]
fn explicit_vr_round_trip_keeps_sequences() {
    let dict = dictionary();
    let mut obj = study();
    let item = InMemDicomObject::from_element_iter(vec![
        DataElement::new(Tag(0x0008, 0x1150), VR::UI, "1.2.840.10008.5.1.4.1.1.7"),
        DataElement::new(Tag(0x0008, 0x1155), VR::UI, "2.25.99"),
    ]);
    obj.put(sequence(Tag(0x0008, 0x1140), vec![item, InMemDicomObject::new_empty()]));
    obj.put(sequence(Tag(0x0008, 0x1115), vec![]));

    let mut buffer = Vec::new();
    FileDicomObject::from_object(obj.clone())
        .save_to_buffer(&mut buffer)
        .unwrap();
    let read = FileDicomObject::from_buffer(&buffer, &dict).unwrap();
    assert_eq!(read.obj(), &obj);
    assert_eq!(read.transfer_syntax_uid(), Some(uids::EXPLICIT_VR_LITTLE_ENDIAN));
}

#[test]
fn encapsulated_pixel_data_is_passed_through() {
    let dict = dictionary();
    let mut obj = study();
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PixelFragmentSequence::new(Vec::<u32>::new(), vec![vec![0xFF_u8, 0xD8, 0xFF, 0xD9]]),
    ));
    let file = with_transfer_syntax(obj.clone(), uids::JPEG_BASELINE8_BIT);
    let mut buffer = Vec::new();
    file.save_to_buffer(&mut buffer).unwrap();

    let read = FileDicomObject::from_buffer(&buffer, &dict).unwrap();
    assert_eq!(read.obj(), &obj);
}

#[test]
fn bare_data_set_reads_as_implicit_vr() {
    #[rustfmt::skip]
    const RAW: &[u8] = &[
        // (0010,0010) PatientName, 8 bytes
        0x10, 0x00, 0x10, 0x00, 0x08, 0x00, 0x00, 0x00,
        b'D', b'o', b'e', b'^', b'J', b'o', b'h', b'n',
    ];
    let read = FileDicomObject::from_buffer(RAW, &dictionary()).unwrap();
    assert!(read.meta().is_none());
    let name = read.obj().element(tags::PATIENT_NAME).unwrap();
    assert_eq!(name.vr(), VR::PN);
    assert_eq!(read.obj().raw_text(tags::PATIENT_NAME), Some(&b"Doe^John"[..]));
}

#[test]
fn latin1_round_trip() {
    let obj = study();
    let (encoding, has_code_extensions) = detect_encoding(&obj, Encoding::Utf8);
    assert_eq!((encoding, has_code_extensions), (Encoding::Latin1, false));

    let mut single = InMemDicomObject::new_empty();
    single.put_primitive(tags::PATIENT_NAME, VR::PN, PrimitiveValue::Text(vec![0xE9]));
    let raw = single.raw_text(tags::PATIENT_NAME).unwrap();
    let text = convert_to_utf8(raw, encoding, has_code_extensions);
    assert_eq!(text, "é");
    assert_eq!(convert_from_utf8(&text, encoding), vec![0xE9]);
}

#[test]
fn change_encoding_then_back() {
    let mut obj = study();
    change_encoding(&mut obj, Encoding::Latin1, false, Encoding::Utf8, 64).unwrap();
    assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some("Hélène".as_bytes()));
    assert_eq!(detect_encoding(&obj, Encoding::Latin1), (Encoding::Utf8, false));

    change_encoding(&mut obj, Encoding::Utf8, false, Encoding::Latin1, 64).unwrap();
    assert_eq!(obj, study());
}

struct Redact;

impl TagVisitor for Redact {
    fn visit_string(&mut self, _: &[Tag], _: &[usize], _: Tag, vr: VR, _: &str) -> Action {
        if vr == VR::PN {
            Action::Replace("REDACTED".to_string())
        } else {
            Action::None
        }
    }
}

#[test]
fn redacted_data_set_survives_the_buffer() {
    let dict = dictionary();
    let mut obj = study();
    visit::apply(&mut obj, &mut Redact, Encoding::Latin1, 64).unwrap();
    assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some(&b"REDACTED"[..]));

    let mut buffer = Vec::new();
    FileDicomObject::from_object(obj.clone())
        .save_to_buffer(&mut buffer)
        .unwrap();
    let read = FileDicomObject::from_buffer(&buffer, &dict).unwrap();
    assert_eq!(read.obj(), &obj);
    assert_eq!(
        read.obj().element(Tag(0x0028, 0x0010)).unwrap().value().primitive(),
        Some(&dicom_value!(U16, [4]))
    );
}

#[test]
fn free_text_keeps_trailing_spaces() {
    let dict = dictionary();
    let mut obj = study();
    obj.put(DataElement::new(Tag(0x0020, 0x4000), VR::LT, "Note:  "));
    for uid in [uids::IMPLICIT_VR_LITTLE_ENDIAN, uids::EXPLICIT_VR_LITTLE_ENDIAN] {
        let mut buffer = Vec::new();
        with_transfer_syntax(obj.clone(), uid)
            .save_to_buffer(&mut buffer)
            .unwrap();
        let read = FileDicomObject::from_buffer(&buffer, &dict).unwrap();
        assert_eq!(read.obj().raw_text(Tag(0x0020, 0x4000)), Some(&b"Note:  "[..]));
    }
}
