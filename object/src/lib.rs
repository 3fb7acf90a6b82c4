#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

//! This crate contains a high-level abstraction for reading, manipulating
//! and converting DICOM data sets held in memory.
//!
//! A data set is an [`InMemDicomObject`]:
//! an ordered collection of data elements, at most one per tag,
//! in which every sequence owns its items.
//! A [`FileDicomObject`] pairs a data set with its file meta group,
//! and converts it to and from a byte buffer.
//!
//! # Examples
//!
//! Build a data set, save it to a buffer and read it back:
//!
//! ```
//! # use dcmbridge_core::{DataElement, VR};
//! # use dcmbridge_dictionary_std::{tags, DataDictionaryRegistry};
//! # use dcmbridge_object::{FileDicomObject, InMemDicomObject};
//! let mut obj = InMemDicomObject::new_empty();
//! obj.put(DataElement::new(tags::PATIENT_NAME, VR::PN, "Doe^John"));
//! obj.put(DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4"));
//!
//! let mut buffer = Vec::new();
//! FileDicomObject::from_object(obj.clone()).save_to_buffer(&mut buffer)?;
//!
//! let dict = DataDictionaryRegistry::with_standard_entries(false)?;
//! let file = FileDicomObject::from_buffer(&buffer, &dict)?;
//! assert_eq!(file.obj(), &obj);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Other operations over data sets live in their own modules:
//!
//! - [`charset`] detects the character set of a data set
//!   and transcodes all of its text;
//! - [`visit`] walks a data set leaf by leaf,
//!   optionally replacing text values;
//! - [`uid`] generates fresh identifiers for each resource level.

pub mod charset;
pub mod file;
pub mod mem;
pub mod meta;
pub mod read;
pub mod uid;
pub mod visit;
pub mod write;

pub use crate::charset::{change_encoding, detect_encoding};
pub use crate::file::FileDicomObject;
pub use crate::mem::{InMemDicomObject, InMemElement};
pub use crate::meta::{FileMetaTable, FileMetaTableBuilder};
pub use crate::read::ReadOptions;
pub use crate::uid::{generate_identifier, ResourceLevel, UidRoots};
pub use crate::write::WriteOptions;

/// The implementation class UID written to the file meta group.
pub const IMPLEMENTATION_CLASS_UID: &str = "1.2.826.0.1.3680043.10.1108.1";

/// The implementation version name written to the file meta group.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMBRIDGE_010";
