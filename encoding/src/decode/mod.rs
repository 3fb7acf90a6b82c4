//! This module contains all DICOM data element decoding logic.

use self::explicit::ExplicitVRDecoder;
use byteordered::Endianness;
use dcmbridge_core::header::{DataElementHeader, SequenceItemHeader, UnexpectedItemTagError};
use dcmbridge_core::value::PrimitiveValue;
use dcmbridge_core::{Length, Tag, VR};
use snafu::{Backtrace, Snafu};
use std::io::{self, Read};

pub mod basic;
pub mod explicit;
pub mod implicit_le;
pub mod primitive_value;

/// Module-level error type:
/// for errors which may occur while decoding DICOM data.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to read the beginning (tag) of the header"))]
    ReadHeaderTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the item header"))]
    ReadItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's item length field"))]
    ReadItemLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's tag field"))]
    ReadTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's reserved bytes"))]
    ReadReserved {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's element length field"))]
    ReadLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's value representation"))]
    ReadVr {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the value of element {}", tag))]
    ReadValue {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Bad sequence item header"))]
    BadSequenceHeader { source: UnexpectedItemTagError },
    #[snafu(display(
        "Length {} of element {} is not a multiple of the {} value width",
        len,
        tag,
        vr
    ))]
    InvalidValueLength {
        tag: Tag,
        vr: VR,
        len: Length,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/** Obtain a data element decoder for reading the data elements in a DICOM
 * file's Meta information. According to the standard, these are always
 * encoded in Explicit VR Little Endian.
 */
pub fn file_header_decoder() -> ExplicitVRDecoder {
    ExplicitVRDecoder::little_endian()
}

/** Type trait for reading and decoding DICOM data elements.
 *
 * The specific behaviour of decoding, even when abstracted from the original
 * source, may depend on the transfer syntax.
 * The methods take type-erased sources so that decoders
 * can be picked at run-time from a transfer syntax.
 */
pub trait Decode {
    /// Retrieve the source's endianness, as expected by this decoder.
    fn endianness(&self) -> Endianness;

    /** Fetch and decode the next data element header from the given source.
     * This method returns only the header of the element. At the end of this operation, the source
     * will be pointing at the element's value data,
     * which should be read or skipped as necessary.
     *
     * Decoding an item or sequence delimiter is considered valid, and so should be properly handled
     * by the decoder. The value representation in this case should be `UN`.
     *
     * Returns the expected header and the exact number of bytes read from the source.
     */
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)>;

    /** Fetch and decode the next sequence item head from the given source. It is a separate method
     * because value representation is always implicit when reading item headers and delimiters.
     * This method returns only the header of the item. At the end of this operation, the source
     * will be pointing at the beginning of the item's data, which should be traversed if necessary.
     */
    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader>;

    /// Decode a DICOM attribute tag from the given source.
    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag>;

    /// Read and decode the primitive value described by the given header.
    fn read_value(
        &self,
        source: &mut dyn Read,
        header: &DataElementHeader,
    ) -> Result<PrimitiveValue> {
        primitive_value::read_value(source, header, self.endianness())
    }

    /// Settle the value representation of a decoded header
    /// against the _Pixel Representation_ of the enclosing data set.
    /// Decoders which read the VR from the source keep the header as is.
    fn resolve_vr(&self, header: DataElementHeader, _pixel_representation: u16) -> DataElementHeader {
        header
    }
}

impl<T: ?Sized> Decode for Box<T>
where
    T: Decode,
{
    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }

    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        (**self).decode_header(source)
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        (**self).decode_item_header(source)
    }

    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag> {
        (**self).decode_tag(source)
    }

    fn read_value(
        &self,
        source: &mut dyn Read,
        header: &DataElementHeader,
    ) -> Result<PrimitiveValue> {
        (**self).read_value(source, header)
    }

    fn resolve_vr(&self, header: DataElementHeader, pixel_representation: u16) -> DataElementHeader {
        (**self).resolve_vr(header, pixel_representation)
    }
}

impl<'a, T: ?Sized> Decode for &'a T
where
    T: Decode,
{
    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }

    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        (**self).decode_header(source)
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        (**self).decode_item_header(source)
    }

    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag> {
        (**self).decode_tag(source)
    }

    fn read_value(
        &self,
        source: &mut dyn Read,
        header: &DataElementHeader,
    ) -> Result<PrimitiveValue> {
        (**self).read_value(source, header)
    }

    fn resolve_vr(&self, header: DataElementHeader, pixel_representation: u16) -> DataElementHeader {
        (**self).resolve_vr(header, pixel_representation)
    }
}
