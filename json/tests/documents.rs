//! Documents through data sets and byte buffers, and back.

use dcmbridge_core::{DataElement, PrimitiveValue, Tag, VR};
use dcmbridge_dictionary_std::{tags, DataDictionaryRegistry};
use dcmbridge_encoding::Encoding;
use dcmbridge_json::{
    build_dataset, extract_summary, to_document, DicomToJsonFormat, DicomValue, FromJsonOptions,
    ToJsonOptions,
};
use dcmbridge_object::visit::{self, Action, TagVisitor};
use dcmbridge_object::{FileDicomObject, InMemDicomObject, UidRoots};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dictionary() -> DataDictionaryRegistry {
    DataDictionaryRegistry::with_standard_entries(true).unwrap()
}

fn short() -> ToJsonOptions {
    ToJsonOptions::new().format(DicomToJsonFormat::Short)
}

fn document() -> JsonValue {
    json!({
        "0008,0005": "ISO_IR 100",
        "0008,0016": "1.2.840.10008.5.1.4.1.1.7",
        "0008,0018": "2.25.1234",
        "0008,0020": "20230610",
        "0010,0010": "Hélène^Dupont",
        "0010,0020": "ID-1",
        "0010,1030": "71.5",
        "0018,9089": "0.5\\0.25\\-1",
        "0028,0010": "4",
        "0028,0009": "0018,1063",
        "0008,1140": [
            { "0008,1150": "1.2.840.10008.5.1.4.1.1.2", "0008,1155": "1.2.3.4" },
            {},
        ],
        "0008,1115": [],
    })
}

#[test]
fn short_documents_round_trip() {
    init_logging();
    let dict = dictionary();
    let obj = build_dataset(&dict, &document(), &FromJsonOptions::new()).unwrap();
    assert_eq!(obj.raw_text(tags::PATIENT_NAME), Some(&b"H\xE9l\xE8ne^Dupont"[..]));

    let out = to_document(&dict, &obj, &short()).unwrap();
    assert_eq!(out, document());
}

#[test]
fn documents_survive_the_buffer() {
    init_logging();
    let dict = dictionary();
    let obj = build_dataset(&dict, &document(), &FromJsonOptions::new()).unwrap();

    let mut buffer = Vec::new();
    FileDicomObject::from_object(obj)
        .save_to_buffer(&mut buffer)
        .unwrap();
    let read = FileDicomObject::from_buffer(&buffer, &dict).unwrap();

    let out = to_document(&dict, read.obj(), &short()).unwrap();
    assert_eq!(out, document());
}

#[test]
fn length_limit_is_recoverable() {
    let dict = dictionary();
    let obj = InMemDicomObject::from_element_iter([
        DataElement::new(tags::PATIENT_NAME, VR::PN, "Doe^John"),
        DataElement::new(Tag(0x0008, 0x1030), VR::LO, "Brain MRI with contrast"),
    ]);

    let limited = ToJsonOptions::new().max_string_length(10);
    assert_eq!(
        to_document(&dict, &obj, &limited).unwrap(),
        json!({
            "0010,0010": { "Name": "PatientName", "Type": "String", "Value": "Doe^John" },
            "0008,1030": { "Name": "StudyDescription", "Type": "TooLong", "Value": null },
        })
    );
    assert_eq!(
        to_document(&dict, &obj, &short().max_string_length(10)).unwrap(),
        json!({ "0010,0010": "Doe^John", "0008,1030": null })
    );

    let exempt = short()
        .max_string_length(10)
        .ignore_length(Tag(0x0008, 0x1030));
    let unlimited = short();
    for options in [exempt, unlimited] {
        assert_eq!(
            to_document(&dict, &obj, &options).unwrap(),
            json!({ "0010,0010": "Doe^John", "0008,1030": "Brain MRI with contrast" })
        );
    }
}

#[test]
fn latin1_text_in_both_directions() {
    let dict = dictionary();
    let obj = InMemDicomObject::from_element_iter([
        DataElement::new(tags::SPECIFIC_CHARACTER_SET, VR::CS, "ISO_IR 100"),
        DataElement::new(tags::PATIENT_NAME, VR::PN, PrimitiveValue::Text(vec![0xE9])),
    ]);
    let human = ToJsonOptions::new().format(DicomToJsonFormat::Human);
    let out = to_document(&dict, &obj, &human).unwrap();
    assert_eq!(out["PatientName"], json!("é"));

    let rebuilt = build_dataset(&dict, &out, &FromJsonOptions::new()).unwrap();
    assert_eq!(rebuilt.raw_text(tags::PATIENT_NAME), Some(&[0xE9][..]));
}

#[test]
fn summaries_of_built_data_sets() {
    let dict = dictionary();
    let obj = build_dataset(&dict, &document(), &FromJsonOptions::new()).unwrap();
    let summary = extract_summary(&dict, &obj, 0, Encoding::Ascii).unwrap();

    assert_eq!(
        summary.value(tags::PATIENT_NAME),
        Some(&DicomValue::from("Hélène^Dupont"))
    );
    assert_eq!(summary.value(Tag(0x0028, 0x0010)), Some(&DicomValue::from("4")));
    assert!(!summary.has_tag(Tag(0x0008, 0x1140)));
    assert_eq!(
        summary.to_json(&dict, true)["PatientWeight"],
        json!("71.5")
    );
}

#[test]
fn identifiers_for_bare_documents() {
    let dict = dictionary();
    let options = FromJsonOptions::new()
        .generate_identifiers(true)
        .uid_roots(UidRoots::default());
    let obj = build_dataset(&dict, &json!({ "PatientName": "Doe^John" }), &options).unwrap();

    let human = ToJsonOptions::new().format(DicomToJsonFormat::Human);
    let out = to_document(&dict, &obj, &human).unwrap();
    let patient_id = out["PatientID"].as_str().unwrap();
    assert_eq!(patient_id.len(), 36);
    assert_eq!(patient_id.matches('-').count(), 4);
    for (name, root) in [
        ("StudyInstanceUID", "1.2.276.0.7230010.3.1.2."),
        ("SeriesInstanceUID", "1.2.276.0.7230010.3.1.3."),
        ("SOPInstanceUID", "1.2.276.0.7230010.3.1.4."),
    ] {
        let uid = out[name].as_str().unwrap();
        assert!(uid.starts_with(root));
        assert!(uid.len() <= 64);
        assert!(uid.bytes().all(|b| b.is_ascii_digit() || b == b'.'));
    }
}

struct Redact;

impl TagVisitor for Redact {
    fn visit_string(&mut self, _: &[Tag], _: &[usize], _: Tag, _: VR, _: &str) -> Action {
        Action::Replace("REDACTED".to_string())
    }
}

#[test]
fn redacted_strings_leave_numbers_alone() {
    let dict = dictionary();
    let mut obj = build_dataset(
        &dict,
        &json!({ "0010,0010": "Doe^John", "0028,0010": "512" }),
        &FromJsonOptions::new(),
    )
    .unwrap();
    obj.remove_element(tags::SPECIFIC_CHARACTER_SET);
    visit::apply(&mut obj, &mut Redact, Encoding::Latin1, 64).unwrap();

    assert_eq!(
        to_document(&dict, &obj, &short()).unwrap(),
        json!({ "0010,0010": "REDACTED", "0028,0010": "512" })
    );
}

#[test]
fn private_attributes_keep_their_creator() {
    let dict = dictionary();
    let document = json!({
        "0019,0010": "GEMS_ACQU_01",
        "0019,1002": "64",
    });
    let obj = build_dataset(&dict, &document, &FromJsonOptions::new()).unwrap();

    let out = to_document(&dict, &obj, &ToJsonOptions::new()).unwrap();
    assert_eq!(
        out["0019,1002"],
        json!({
            "Name": "GEAcquisitionNumberOfCellsInDetector",
            "PrivateCreator": "GEMS_ACQU_01",
            "Type": "String",
            "Value": "64",
        })
    );
}
