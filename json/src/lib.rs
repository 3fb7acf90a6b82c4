//! DICOM JSON bridge module
//!
//! This library converts DICOM data sets
//! into generic JSON documents and back,
//! and extracts flat summaries of their top level attributes.
//!
//! Documents come in three shapes ([`DicomToJsonFormat`]):
//! keyed by tag with typed nodes (`Full`),
//! keyed by tag with bare values (`Short`),
//! or keyed by attribute name (`Human`).
//! Short and human documents can be turned back into data sets
//! with [`build_dataset`].
//!
//! # Example
//!
//! ```rust
//! # use dcmbridge_core::{PrimitiveValue, VR};
//! # use dcmbridge_dictionary_std::{tags, DataDictionaryRegistry};
//! # use dcmbridge_object::mem::{InMemDicomObject, InMemElement};
//! use dcmbridge_json::{build_dataset, to_document, DicomToJsonFormat, FromJsonOptions, ToJsonOptions};
//!
//! let dict = DataDictionaryRegistry::with_standard_entries(false)?;
//! let obj = InMemDicomObject::from_element_iter([
//!     InMemElement::new(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from("Doe^John")),
//!     InMemElement::new(tags::PATIENT_ID, VR::LO, PrimitiveValue::from("1234")),
//! ]);
//!
//! let options = ToJsonOptions::new().format(DicomToJsonFormat::Short);
//! let document = to_document(&dict, &obj, &options)?;
//! assert_eq!(
//!     document,
//!     serde_json::json!({
//!         "0010,0010": "Doe^John",
//!         "0010,0020": "1234",
//!     }),
//! );
//!
//! let rebuilt = build_dataset(&dict, &document, &FromJsonOptions::new())?;
//! assert_eq!(rebuilt.raw_text(tags::PATIENT_ID), Some(&b"1234"[..]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod de;
mod map;
mod options;
pub mod ser;
mod value;

pub use crate::de::{build_dataset, build_element, extract_encoding};
pub use crate::map::{extract_summary, DicomMap};
pub use crate::options::{DicomToJsonFlags, DicomToJsonFormat, FromJsonOptions, ToJsonOptions};
pub use crate::ser::{extract_value, header_to_json, to_document, LeafContext};
pub use crate::value::{format_data_uri, parse_data_uri, DicomValue, URI_SCHEME_PREFIX_BINARY};
