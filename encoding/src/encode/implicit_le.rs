//! Implicit VR Little Endian syntax transfer implementation.

use crate::encode::basic::BasicEncoder;
use crate::encode::{Encode, Result, WriteLengthSnafu};
use byteordered::Endianness;
use dcmbridge_core::header::DataElementHeader;
use snafu::ResultExt;
use std::io::Write;

/// A concrete encoder for the transfer syntax ImplicitVRLittleEndian
#[derive(Debug, Default, Clone, Copy)]
pub struct ImplicitVRLittleEndianEncoder {
    basic: BasicEncoder,
}

impl Encode for ImplicitVRLittleEndianEncoder {
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn encode_element_header(&self, to: &mut dyn Write, de: DataElementHeader) -> Result<usize> {
        self.encode_tag(&mut *to, de.tag)?;
        self.basic
            .encode_ul(to, de.len.0)
            .context(WriteLengthSnafu { tag: de.tag })?;
        Ok(8)
    }
}

#[cfg(test)]
mod tests {
    use super::ImplicitVRLittleEndianEncoder;
    use crate::encode::Encode;
    use dcmbridge_core::header::{DataElementHeader, Length};
    use dcmbridge_core::{Tag, VR};

    #[test]
    fn encode_implicit_header_and_items() {
        let enc = ImplicitVRLittleEndianEncoder::default();
        let mut out = Vec::new();
        enc.encode_element_header(
            &mut out,
            DataElementHeader::new(Tag(0x0008, 0x1140), VR::SQ, Length(16)),
        )
        .unwrap();
        enc.encode_item_header(&mut out, 8).unwrap();
        enc.encode_item_delimiter(&mut out).unwrap();
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x08, 0x00, 0x40, 0x11, 0x10, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0x00, 0xE0, 0x08, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(&out[..], expected);
    }
}
