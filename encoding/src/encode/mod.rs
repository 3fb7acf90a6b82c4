//! This module contains all DICOM data element encoding logic.

use byteordered::Endianness;
use dcmbridge_core::header::DataElementHeader;
use dcmbridge_core::value::PrimitiveValue;
use dcmbridge_core::{Length, Tag, VR};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::{self, Write};

pub mod basic;
pub mod explicit;
pub mod implicit_le;
pub mod primitive_value;

use self::basic::BasicEncoder;

/// Module-level error type:
/// for errors which may occur while encoding DICOM data.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to write the tag of element {}", tag))]
    WriteTag {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write the value representation of element {}", tag))]
    WriteVr {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write the length of element {}", tag))]
    WriteLength {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write an item header"))]
    WriteItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write the value of element {}", tag))]
    WriteValue {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Length {} of element {} does not fit in a {} header", len, tag, vr))]
    LengthTooLong {
        tag: Tag,
        vr: VR,
        len: Length,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type trait for writing DICOM data elements and item delimiters
/// in a specific transfer syntax.
///
/// Implementors only need to define how element headers are written;
/// items, delimiters and primitive values
/// only depend on the byte order.
pub trait Encode {
    /// Retrieve the destination's endianness, as expected by this encoder.
    fn endianness(&self) -> Endianness;

    /// Encode and write an element tag.
    fn encode_tag(&self, to: &mut dyn Write, tag: Tag) -> Result<()> {
        BasicEncoder::new(self.endianness())
            .encode_tag(to, tag)
            .context(WriteTagSnafu { tag })
    }

    /// Encode and write a data element header to the given destination.
    /// Returns the number of bytes effectively written on success.
    fn encode_element_header(&self, to: &mut dyn Write, de: DataElementHeader) -> Result<usize>;

    /// Encode and write a DICOM sequence item header to the given destination.
    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()> {
        let basic = BasicEncoder::new(self.endianness());
        basic
            .encode_tag(&mut *to, Tag(0xFFFE, 0xE000))
            .context(WriteItemHeaderSnafu)?;
        basic.encode_ul(to, len).context(WriteItemHeaderSnafu)
    }

    /// Encode and write a DICOM sequence item delimiter to the given destination.
    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        let basic = BasicEncoder::new(self.endianness());
        basic
            .encode_tag(&mut *to, Tag(0xFFFE, 0xE00D))
            .context(WriteItemHeaderSnafu)?;
        basic.encode_ul(to, 0).context(WriteItemHeaderSnafu)
    }

    /// Encode and write a DICOM sequence delimiter to the given destination.
    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        let basic = BasicEncoder::new(self.endianness());
        basic
            .encode_tag(&mut *to, Tag(0xFFFE, 0xE0DD))
            .context(WriteItemHeaderSnafu)?;
        basic.encode_ul(to, 0).context(WriteItemHeaderSnafu)
    }

    /// Encode and write a primitive element,
    /// header and value with padding included.
    /// Returns the number of bytes effectively written on success.
    fn encode_element(
        &self,
        to: &mut dyn Write,
        tag: Tag,
        vr: VR,
        value: &PrimitiveValue,
    ) -> Result<usize> {
        let bytes = primitive_value::value_bytes(value, vr, self.endianness());
        let header = DataElementHeader::new(tag, vr, Length(bytes.len() as u32));
        let n = self.encode_element_header(&mut *to, header)?;
        to.write_all(&bytes).context(WriteValueSnafu { tag })?;
        Ok(n + bytes.len())
    }
}

impl<T: ?Sized> Encode for Box<T>
where
    T: Encode,
{
    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }

    fn encode_element_header(&self, to: &mut dyn Write, de: DataElementHeader) -> Result<usize> {
        (**self).encode_element_header(to, de)
    }
}

impl<'a, T: ?Sized> Encode for &'a T
where
    T: Encode,
{
    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }

    fn encode_element_header(&self, to: &mut dyn Write, de: DataElementHeader) -> Result<usize> {
        (**self).encode_element_header(to, de)
    }
}
