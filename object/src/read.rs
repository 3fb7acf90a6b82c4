//! Reading of in-memory data sets from their binary encoding.
//!
//! The reader works over a byte slice,
//! so that every declared length can be checked
//! against the bytes which are actually available.
use crate::mem::{InMemDicomObject, InMemElement};
use dcmbridge_core::header::{DataElementHeader, HasLength, SequenceItemHeader};
use dcmbridge_core::value::{PixelFragmentSequence, Value, C};
use dcmbridge_core::{DataElement, Length, Tag, DEFAULT_MAX_DEPTH};
use dcmbridge_dictionary_std::tags;
use byteordered::ByteOrdered;
use dcmbridge_encoding::decode::{self, Decode};
use serde::Deserialize;
use snafu::{ensure, Backtrace, ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Could not decode the header of the next data element.
    #[snafu(display("Could not decode element header at offset {}", offset))]
    DecodeHeader {
        offset: usize,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    /// Could not decode the header of a sequence item.
    #[snafu(display("Could not decode item header at offset {}", offset))]
    DecodeItemHeader {
        offset: usize,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    /// Could not read the value of a data element.
    #[snafu(display("Could not read the value of {}", tag))]
    ReadValue {
        tag: Tag,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    /// A declared length exceeds the data available.
    #[snafu(display(
        "Element {} declares {} bytes but only {} are left",
        tag,
        len,
        available
    ))]
    PrematureEnd {
        tag: Tag,
        len: Length,
        available: usize,
        backtrace: Backtrace,
    },
    /// A delimiter or item showed up where it does not belong.
    #[snafu(display("Unexpected {} at offset {}", tag, offset))]
    UnexpectedTag {
        tag: Tag,
        offset: usize,
        backtrace: Backtrace,
    },
    /// Could not read the basic offset table of encapsulated pixel data.
    #[snafu(display("Could not read the basic offset table"))]
    ReadOffsetTable {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    /// The data set nests sequences too deeply.
    #[snafu(display("Sequence nesting exceeds the limit of {} levels", max_depth))]
    MaxDepthExceeded { max_depth: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Options for reading a data set from its binary form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// The maximum level of sequence nesting accepted.
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReadOptions {
    /// Create the default set of options.
    pub fn new() -> Self {
        ReadOptions::default()
    }

    /// Override the maximum level of sequence nesting.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Read a complete data set from the given bytes,
/// which must hold nothing else.
pub fn read_dataset(
    data: &[u8],
    decoder: &dyn Decode,
    options: ReadOptions,
) -> Result<InMemDicomObject> {
    let mut reader = DataSetReader {
        decoder,
        total: data.len(),
        max_depth: options.max_depth,
        pixel_representation: 0,
    };
    let mut source = data;
    reader.read_object(&mut source, 0, false)
}

/// A recursive descent reader of a data set.
struct DataSetReader<'a> {
    decoder: &'a dyn Decode,
    /// the size of the whole input, for error reporting
    total: usize,
    max_depth: usize,
    /// the Pixel Representation in force, inherited by nested items
    pixel_representation: u16,
}

impl DataSetReader<'_> {
    fn offset(&self, source: &[u8]) -> usize {
        self.total - source.len()
    }

    /// Split off the next `len` bytes of the source.
    fn take<'s>(&self, source: &mut &'s [u8], tag: Tag, len: Length) -> Result<&'s [u8]> {
        let n = len.0 as usize;
        ensure!(
            n <= source.len(),
            PrematureEndSnafu {
                tag,
                len,
                available: source.len(),
            }
        );
        let (head, tail) = source.split_at(n);
        *source = tail;
        Ok(head)
    }

    /// Read the elements of an object.
    /// A delimited object ends at an item delimiter,
    /// otherwise it ends with the source.
    fn read_object(
        &mut self,
        source: &mut &[u8],
        depth: usize,
        delimited: bool,
    ) -> Result<InMemDicomObject> {
        let mut obj = InMemDicomObject::new_empty();
        let inherited = self.pixel_representation;
        loop {
            if source.is_empty() {
                ensure!(
                    !delimited,
                    PrematureEndSnafu {
                        tag: tags::ITEM_DELIMITATION_ITEM,
                        len: Length(8),
                        available: 0_usize,
                    }
                );
                break;
            }

            let offset = self.offset(*source);
            let (header, _) = self
                .decoder
                .decode_header(source)
                .context(DecodeHeaderSnafu { offset })?;

            match header.tag {
                tags::ITEM_DELIMITATION_ITEM if delimited => break,
                tags::ITEM | tags::ITEM_DELIMITATION_ITEM | tags::SEQUENCE_DELIMITATION_ITEM => {
                    return UnexpectedTagSnafu {
                        tag: header.tag,
                        offset,
                    }
                    .fail();
                }
                _ => {}
            }

            let header = self.decoder.resolve_vr(header, self.pixel_representation);
            let element = self.read_element(source, header, depth)?;
            let tag = element.tag();
            obj.put(element);
            if tag == tags::PIXEL_REPRESENTATION {
                self.pixel_representation = obj.pixel_representation();
            }
        }
        self.pixel_representation = inherited;
        Ok(obj)
    }

    fn read_element(
        &mut self,
        source: &mut &[u8],
        header: DataElementHeader,
        depth: usize,
    ) -> Result<InMemElement> {
        let tag = header.tag;
        if header.is_encapsulated_pixeldata() {
            let fragments = self.read_fragments(source)?;
            return Ok(DataElement::new(tag, header.vr, fragments));
        }

        if header.is_non_primitive() {
            ensure!(
                depth < self.max_depth,
                MaxDepthExceededSnafu {
                    max_depth: self.max_depth,
                }
            );
            let items = match header.length().get() {
                Some(_) => {
                    let mut content = self.take(source, tag, header.length())?;
                    self.read_items(&mut content, depth + 1, false)?
                }
                None => self.read_items(source, depth + 1, true)?,
            };
            return Ok(DataElement::new(tag, header.vr, Value::Sequence(items)));
        }

        let mut content = self.take(source, tag, header.length())?;
        let value = self
            .decoder
            .read_value(&mut content, &header)
            .context(ReadValueSnafu { tag })?;
        Ok(DataElement::new(tag, header.vr, value))
    }

    /// Read the items of a sequence.
    /// A delimited sequence ends at a sequence delimiter,
    /// otherwise it ends with the source.
    fn read_items(
        &mut self,
        source: &mut &[u8],
        depth: usize,
        delimited: bool,
    ) -> Result<Vec<InMemDicomObject>> {
        let mut items = Vec::new();
        loop {
            if source.is_empty() {
                ensure!(
                    !delimited,
                    PrematureEndSnafu {
                        tag: tags::SEQUENCE_DELIMITATION_ITEM,
                        len: Length(8),
                        available: 0_usize,
                    }
                );
                break;
            }

            let offset = self.offset(*source);
            let header = self
                .decoder
                .decode_item_header(source)
                .context(DecodeItemHeaderSnafu { offset })?;
            match header {
                SequenceItemHeader::Item { len } if len.is_undefined() => {
                    items.push(self.read_object(source, depth, true)?);
                }
                SequenceItemHeader::Item { len } => {
                    let mut content = self.take(source, tags::ITEM, len)?;
                    items.push(self.read_object(&mut content, depth, false)?);
                }
                SequenceItemHeader::SequenceDelimiter if delimited => break,
                other => {
                    return UnexpectedTagSnafu {
                        tag: other.tag(),
                        offset,
                    }
                    .fail();
                }
            }
        }
        Ok(items)
    }

    /// Read the items of an encapsulated pixel data element,
    /// up to its sequence delimiter.
    fn read_fragments(&mut self, source: &mut &[u8]) -> Result<PixelFragmentSequence> {
        let mut offset_table: Option<C<u32>> = None;
        let mut fragments: C<Vec<u8>> = C::new();
        loop {
            ensure!(
                !source.is_empty(),
                PrematureEndSnafu {
                    tag: tags::SEQUENCE_DELIMITATION_ITEM,
                    len: Length(8),
                    available: 0_usize,
                }
            );
            let offset = self.offset(*source);
            let header = self
                .decoder
                .decode_item_header(source)
                .context(DecodeItemHeaderSnafu { offset })?;
            match header {
                SequenceItemHeader::Item { len } if !len.is_undefined() => {
                    let bytes = self.take(source, tags::ITEM, len)?;
                    if offset_table.is_none() {
                        // the basic offset table is always little endian
                        let mut table = ByteOrdered::le(bytes);
                        offset_table = Some(
                            (0..bytes.len() / 4)
                                .map(|_| table.read_u32())
                                .collect::<std::io::Result<_>>()
                                .context(ReadOffsetTableSnafu)?,
                        );
                    } else {
                        fragments.push(bytes.to_vec());
                    }
                }
                SequenceItemHeader::SequenceDelimiter => break,
                other => {
                    return UnexpectedTagSnafu {
                        tag: other.tag(),
                        offset,
                    }
                    .fail();
                }
            }
        }
        Ok(PixelFragmentSequence::new(
            offset_table.unwrap_or_default(),
            fragments,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmbridge_core::dictionary::stub::StubDataDictionary;
    use dcmbridge_core::{PrimitiveValue, VR};
    use dcmbridge_encoding::decode::explicit::ExplicitVRDecoder;
    use dcmbridge_encoding::decode::implicit_le::ImplicitVRLittleEndianDecoder;
    use pretty_assertions::assert_eq;

    #[rustfmt::skip]
    const EXPLICIT_WITH_SEQUENCE: &[u8] = &[
        // (0008,0060) CS "MR"
        0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'M', b'R',
        // (0040,A730) SQ, undefined length
        0x40, 0x00, 0x30, 0xA7, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        // item, defined length 10
        0xFE, 0xFF, 0x00, 0xE0, 0x0A, 0x00, 0x00, 0x00,
        // (0040,A040) CS "T"
        0x40, 0x00, 0x40, 0xA0, b'C', b'S', 0x02, 0x00, b'T', b' ',
        // item, undefined length
        0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
        // item delimiter
        0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
        // sequence delimiter
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        // (0028,0010) US 512
        0x28, 0x00, 0x10, 0x00, b'U', b'S', 0x02, 0x00, 0x00, 0x02,
    ];

    #[test]
    fn read_nested_explicit_le() {
        let decoder = ExplicitVRDecoder::little_endian();
        let obj = read_dataset(EXPLICIT_WITH_SEQUENCE, &decoder, ReadOptions::default()).unwrap();

        assert_eq!(obj.len(), 3);
        assert_eq!(obj.raw_text(tags::MODALITY), Some(&b"MR"[..]));
        let items = obj.element(Tag(0x0040, 0xA730)).unwrap().items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].raw_text(Tag(0x0040, 0xA040)), Some(&b"T"[..]));
        assert!(items[1].is_empty());
        assert_eq!(
            obj.element(Tag(0x0028, 0x0010)).unwrap().value().primitive(),
            Some(&PrimitiveValue::from(512_u16))
        );
    }

    #[test]
    fn depth_limit_is_enforced() {
        let decoder = ExplicitVRDecoder::little_endian();
        let options = ReadOptions::default().max_depth(0);
        let err = read_dataset(EXPLICIT_WITH_SEQUENCE, &decoder, options).unwrap_err();
        assert!(matches!(err, Error::MaxDepthExceeded { max_depth: 0, .. }));
    }

    #[test]
    fn truncated_value_is_an_error() {
        let decoder = ExplicitVRDecoder::little_endian();
        let err = read_dataset(&EXPLICIT_WITH_SEQUENCE[..9], &decoder, ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::PrematureEnd { available: 1, .. }));
    }

    #[test]
    fn unterminated_sequence_is_an_error() {
        let decoder = ExplicitVRDecoder::little_endian();
        let err = read_dataset(&EXPLICIT_WITH_SEQUENCE[..40], &decoder, ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::PrematureEnd { .. }));
    }

    #[rustfmt::skip]
    const IMPLICIT_PIXEL_SEQUENCE: &[u8] = &[
        // (7FE0,0010), undefined length
        0xE0, 0x7F, 0x10, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        // basic offset table with one entry
        0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // one fragment
        0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0xFF, 0xD8, 0xFF, 0xD9,
        // sequence delimiter
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn read_encapsulated_pixel_data() {
        let decoder = ImplicitVRLittleEndianDecoder::with_dict(StubDataDictionary);
        let obj =
            read_dataset(IMPLICIT_PIXEL_SEQUENCE, &decoder, ReadOptions::default()).unwrap();
        let elt = obj.element(tags::PIXEL_DATA).unwrap();
        assert_eq!(elt.vr(), VR::OW);
        let fragments = elt.value().fragments().unwrap();
        assert_eq!(fragments.offset_table(), &[0]);
        assert_eq!(fragments.fragments(), &[vec![0xFF, 0xD8, 0xFF, 0xD9]]);
    }

    #[test]
    fn stray_delimiter_is_an_error() {
        let decoder = ExplicitVRDecoder::little_endian();
        let data: &[u8] = &[0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00];
        let err = read_dataset(data, &decoder, ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnexpectedTag { offset: 0, .. }));
    }

    #[rustfmt::skip]
    const IMPLICIT_SIGNED_PIXELS: &[u8] = &[
        // (0028,0103) Pixel Representation 1
        0x28, 0x00, 0x03, 0x01, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00,
        // (0028,0106) Smallest Image Pixel Value
        0x28, 0x00, 0x06, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0xFC,
        // (0040,A730), one item of 10 bytes
        0x40, 0x00, 0x30, 0xA7, 0x12, 0x00, 0x00, 0x00,
        0xFE, 0xFF, 0x00, 0xE0, 0x0A, 0x00, 0x00, 0x00,
        // (0028,0107) Largest Image Pixel Value
        0x28, 0x00, 0x07, 0x01, 0x02, 0x00, 0x00, 0x00, 0xFF, 0x03,
    ];

    #[test]
    fn pixel_values_follow_the_pixel_representation() {
        let dict = dcmbridge_dictionary_std::DataDictionaryRegistry::with_standard_entries(false)
            .unwrap();
        let decoder = ImplicitVRLittleEndianDecoder::with_dict(&dict);
        let obj =
            read_dataset(IMPLICIT_SIGNED_PIXELS, &decoder, ReadOptions::default()).unwrap();

        let smallest = obj.element(tags::SMALLEST_IMAGE_PIXEL_VALUE).unwrap();
        assert_eq!(smallest.vr(), VR::SS);
        assert_eq!(smallest.value().primitive(), Some(&PrimitiveValue::from(-1024_i16)));

        let items = obj.element(Tag(0x0040, 0xA730)).unwrap().items().unwrap();
        let largest = items[0].element(tags::LARGEST_IMAGE_PIXEL_VALUE).unwrap();
        assert_eq!(largest.vr(), VR::SS);
        assert_eq!(largest.value().primitive(), Some(&PrimitiveValue::from(1023_i16)));

        // unsigned without a Pixel Representation
        let obj = read_dataset(&IMPLICIT_SIGNED_PIXELS[10..20], &decoder, ReadOptions::default())
            .unwrap();
        let smallest = obj.element(tags::SMALLEST_IMAGE_PIXEL_VALUE).unwrap();
        assert_eq!(smallest.vr(), VR::US);
        assert_eq!(smallest.value().primitive(), Some(&PrimitiveValue::from(0xFC00_u16)));
    }
}
