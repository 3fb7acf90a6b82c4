//! Implicit VR Little Endian syntax transfer implementation

use crate::decode::basic::BasicDecoder;
use crate::decode::{
    BadSequenceHeaderSnafu, Decode, ReadHeaderTagSnafu, ReadItemHeaderSnafu, ReadLengthSnafu,
    ReadTagSnafu, Result,
};
use byteordered::Endianness;
use dcmbridge_core::dictionary::DataDictionary;
use dcmbridge_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmbridge_core::{Tag, VR};
use snafu::ResultExt;
use std::fmt;
use std::io::Read;

/// A data element decoder for the Implicit VR Little Endian transfer syntax.
/// This type contains an attribute dictionary for resolving
/// value representations.
pub struct ImplicitVRLittleEndianDecoder<D> {
    dict: D,
    basic: BasicDecoder,
}

impl<D> fmt::Debug for ImplicitVRLittleEndianDecoder<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ImplicitVRLittleEndianDecoder")
            .field("dict", &"«omitted»")
            .field("basic", &self.basic)
            .finish()
    }
}

impl<D> ImplicitVRLittleEndianDecoder<D>
where
    D: DataDictionary,
{
    /// Retrieve this decoder using a custom data dictionary.
    pub fn with_dict(dictionary: D) -> Self {
        ImplicitVRLittleEndianDecoder {
            dict: dictionary,
            basic: BasicDecoder::new(Endianness::Little),
        }
    }
}

impl<D> Decode for ImplicitVRLittleEndianDecoder<D>
where
    D: DataDictionary,
{
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        let tag = self
            .basic
            .decode_tag(&mut *source)
            .context(ReadHeaderTagSnafu)?;
        let len = self
            .basic
            .decode_ul(&mut *source)
            .context(ReadLengthSnafu)?;

        // VR resolution is done with the help of the data dictionary.
        // In Implicit VR Little Endian,
        // the VR of OW must be used for Pixel Data (7FE0,0010)
        // and Overlay Data (60xx,3000).
        let vr = if tag.group() == 0xFFFE {
            VR::UN
        } else if tag == Tag(0x7FE0, 0x0010) || (tag.0 >> 8 == 0x60 && tag.1 == 0x3000) {
            VR::OW
        } else if len == 0xFFFF_FFFF && self.dict.by_tag(tag).is_none() {
            // an unknown element of undefined length can only be a sequence
            VR::SQ
        } else {
            self.dict
                .by_tag(tag)
                .map(|entry| entry.vr)
                .unwrap_or(VR::UN)
        };
        Ok((DataElementHeader::new(tag, vr, Length(len)), 8))
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

    #[inline]
    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag> {
        self.basic.decode_tag(source).context(ReadTagSnafu)
    }

    fn resolve_vr(
        &self,
        mut header: DataElementHeader,
        pixel_representation: u16,
    ) -> DataElementHeader {
        if header.vr == VR::US {
            if let Some(entry) = self.dict.by_tag(header.tag) {
                header.vr = entry.vr_for_pixel_representation(pixel_representation);
            }
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::ImplicitVRLittleEndianDecoder;
    use crate::decode::Decode;
    use dcmbridge_core::dictionary::stub::StubDataDictionary;
    use dcmbridge_core::header::Length;
    use dcmbridge_core::{PrimitiveValue, Tag, VR};
    use dcmbridge_dictionary_std::DataDictionaryRegistry;
    use std::io::Cursor;

    #[rustfmt::skip]
    const RAW: &[u8] = &[
        0x02, 0x00, 0x02, 0x00,     // (0002,0002) (LE) Media Storage SOP Class UID
            0x1a, 0x00, 0x00, 0x00, // Length: 26 bytes (LE)
                b'1', b'.', b'2', b'.', b'8', b'4', b'0', b'.', b'1', b'0', b'0', b'0', b'8', b'.',
                b'5', b'.', b'1', b'.', b'4', b'.', b'1', b'.', b'1', b'.', b'1',
                0x00,               // Padding to make length even
        0x10, 0x00, 0x10, 0x10,     // (0010,1010) (LE) Patient's Age
            0x04, 0x00, 0x00, 0x00, // Length: 4 bytes (LE)
                b'0', b'3', b'0', b'Y',
        0xE0, 0x7F, 0x10, 0x00,     // (7FE0,0010) Pixel Data
            0x02, 0x00, 0x00, 0x00,
                0x01, 0x02,
    ];

    #[test]
    fn decode_with_dictionary() {
        let dict = DataDictionaryRegistry::with_standard_entries(false).unwrap();
        let dec = ImplicitVRLittleEndianDecoder::with_dict(&dict);
        let mut cursor = Cursor::new(RAW);

        let (header, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(header.tag, Tag(0x0002, 0x0002));
        assert_eq!(header.vr, VR::UI);
        assert_eq!(header.len, Length(26));
        assert_eq!(bytes_read, 8);
        let value = dec.read_value(&mut cursor, &header).unwrap();
        assert_eq!(value, PrimitiveValue::from("1.2.840.10008.5.1.4.1.1.1"));

        let (header, _) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(header.tag, Tag(0x0010, 0x1010));
        assert_eq!(header.vr, VR::AS);
        let value = dec.read_value(&mut cursor, &header).unwrap();
        assert_eq!(value, PrimitiveValue::from("030Y"));

        let (header, _) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(header.vr, VR::OW);
        let value = dec.read_value(&mut cursor, &header).unwrap();
        assert_eq!(value, PrimitiveValue::from(0x0201u16));
    }

    #[test]
    fn unknown_tags_decode_as_un() {
        let dec = ImplicitVRLittleEndianDecoder::with_dict(StubDataDictionary);
        let mut cursor = Cursor::new(RAW);
        let (header, _) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(header.vr, VR::UN);
        let value = dec.read_value(&mut cursor, &header).unwrap();
        assert_eq!(value.byte_len(), 26);
    }

    #[test]
    fn pixel_values_follow_the_pixel_representation() {
        #[rustfmt::skip]
        const SMALLEST: &[u8] = &[
            0x28, 0x00, 0x06, 0x01,     // (0028,0106) Smallest Image Pixel Value
                0x02, 0x00, 0x00, 0x00,
                    0x00, 0xFC,
        ];
        let dict = DataDictionaryRegistry::with_standard_entries(false).unwrap();
        let dec = ImplicitVRLittleEndianDecoder::with_dict(&dict);

        let (header, _) = dec.decode_header(&mut Cursor::new(SMALLEST)).unwrap();
        assert_eq!(header.vr, VR::US);
        assert_eq!(dec.resolve_vr(header, 0).vr, VR::US);
        let header = dec.resolve_vr(header, 1);
        assert_eq!(header.vr, VR::SS);
        let value = dec.read_value(&mut &SMALLEST[8..], &header).unwrap();
        assert_eq!(value, PrimitiveValue::from(-1024_i16));

        let (rows, _) = dec
            .decode_header(&mut Cursor::new(&[0x28, 0x00, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00][..]))
            .unwrap();
        assert_eq!(dec.resolve_vr(rows, 1).vr, VR::US);
    }
}
