#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

//! DICOM encoding and decoding primitives.
//!
//! This crate provides interfaces and data structures for reading and writing
//! data in accordance to the DICOM standard:
//!
//! - [`text`] converts character strings between the character sets
//!   declared by data sets and UTF-8;
//! - [`decode`] and [`encode`] read and write element headers and
//!   primitive values in each of the native encodings;
//! - [`transfer_syntax`] hosts the registry of known transfer syntaxes,
//!   which produces the right decoder and encoder at run-time.
//!
//! All APIs are based on synchronous I/O.

pub mod decode;
pub mod encode;
pub mod text;
pub mod transfer_syntax;

pub use byteordered::Endianness;
pub use decode::Decode;
pub use encode::Encode;
pub use text::Encoding;
pub use transfer_syntax::{Codec, TransferSyntax, TransferSyntaxRegistry};
