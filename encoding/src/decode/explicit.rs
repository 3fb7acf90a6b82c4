//! Explicit VR transfer syntax implementation,
//! in either byte order.

use crate::decode::basic::BasicDecoder;
use crate::decode::{
    BadSequenceHeaderSnafu, Decode, ReadHeaderTagSnafu, ReadItemHeaderSnafu, ReadItemLengthSnafu,
    ReadLengthSnafu, ReadReservedSnafu, ReadTagSnafu, ReadVrSnafu, Result,
};
use byteordered::Endianness;
use dcmbridge_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmbridge_core::{Tag, VR};
use snafu::ResultExt;
use std::io::Read;

/// A data element decoder for the Explicit VR transfer syntaxes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRDecoder {
    basic: BasicDecoder,
}

impl ExplicitVRDecoder {
    /// A decoder for Explicit VR Little Endian.
    pub fn little_endian() -> Self {
        ExplicitVRDecoder {
            basic: BasicDecoder::new(Endianness::Little),
        }
    }

    /// A decoder for Explicit VR Big Endian.
    pub fn big_endian() -> Self {
        ExplicitVRDecoder {
            basic: BasicDecoder::new(Endianness::Big),
        }
    }
}

impl Decode for ExplicitVRDecoder {
    fn endianness(&self) -> Endianness {
        self.basic.endianness()
    }

    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        // retrieve tag
        let Tag(group, element) = self
            .basic
            .decode_tag(&mut *source)
            .context(ReadHeaderTagSnafu)?;

        if group == 0xFFFE {
            // item delimiters do not have VR or reserved field
            let len = self
                .basic
                .decode_ul(&mut *source)
                .context(ReadItemLengthSnafu)?;
            return Ok((
                DataElementHeader::new((group, element), VR::UN, Length(len)),
                8, // tag + len
            ));
        }

        // retrieve explicit VR
        let mut buf = [0u8; 2];
        source.read_exact(&mut buf).context(ReadVrSnafu)?;
        let vr = VR::from_binary(buf).unwrap_or(VR::UN);

        // PS3.5 7.1.2:
        // some VRs have a 16-bit Value Length Field right after the VR,
        // all others have 2 reserved bytes and then a 32-bit length
        let (len, bytes_read) = if vr.has_short_length() {
            let len = self
                .basic
                .decode_us(&mut *source)
                .context(ReadLengthSnafu)?;
            (u32::from(len), 8)
        } else {
            source.read_exact(&mut buf).context(ReadReservedSnafu)?;
            let len = self
                .basic
                .decode_ul(&mut *source)
                .context(ReadLengthSnafu)?;
            (len, 12)
        };

        Ok((
            DataElementHeader::new((group, element), vr, Length(len)),
            bytes_read,
        ))
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        let tag = self
            .basic
            .decode_tag(&mut *source)
            .context(ReadItemHeaderSnafu)?;
        let len = self
            .basic
            .decode_ul(&mut *source)
            .context(ReadItemHeaderSnafu)?;
        SequenceItemHeader::new(tag, Length(len)).context(BadSequenceHeaderSnafu)
    }

    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag> {
        self.basic.decode_tag(source).context(ReadTagSnafu)
    }
}
