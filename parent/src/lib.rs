//! # dcmbridge library
//!
//! This crate serves as a parent for the library crates of the dcmbridge project,
//! which moves DICOM data between its binary form
//! and generic representations:
//! JSON documents and flat maps from tags to values.
//! The modules below are also available as crates
//! which can be fetched independently,
//! named with the `dcmbridge-` prefix.
//! For instance, the module `object`
//! lives in the crate named `dcmbridge-object`.
//!
//! ## Basic
//!
//! - The [`core`] crate contains the data types
//!   that the other crates rely on,
//!   including types for DICOM Tags ([`Tag`](dcmbridge_core::Tag)),
//!   value representations ([`VR`](dcmbridge_core::VR)),
//!   and in-memory representations of [DICOM values](dcmbridge_core::DicomValue),
//!   contained in [data elements](dcmbridge_core::DataElement).
//!   For convenience, the [`dicom_value!`] macro
//!   has been re-exported here as well.
//! - The attribute dictionary is in [`dictionary_std`].
//!   Its registry is built once by the application
//!   and extended at run-time with private attributes.
//!   Constants for well known tags live
//!   in the [`tags`][dictionary_std::tags] module.
//! - For in-memory data sets, byte buffers,
//!   traversal with visitors and identifier generation,
//!   see the [`object`] module.
//! - The [`json`] module turns data sets into documents and back.
//!
//! ## Advanced
//!
//! - [`encoding`] holds the legacy character sets,
//!   the transfer syntax registry
//!   and the low level element decoders and encoders.

pub use dcmbridge_core as core;
pub use dcmbridge_dictionary_std as dictionary_std;
pub use dcmbridge_encoding as encoding;
#[cfg(feature = "json")]
pub use dcmbridge_json as json;
pub use dcmbridge_object as object;

// re-export dicom_value macro
pub use dcmbridge_core::dicom_value;
