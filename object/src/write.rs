//! Writing of in-memory data sets in a native transfer syntax.
//!
//! Sequences and items are always written with defined lengths,
//! which are computed ahead of each element.
//! Encapsulated pixel data is written as a delimited fragment sequence.
use crate::mem::{InMemDicomObject, InMemElement};
use byteordered::ByteOrdered;
use dcmbridge_core::header::DataElementHeader;
use dcmbridge_core::value::{PixelFragmentSequence, Value};
use dcmbridge_core::{Length, Tag, DEFAULT_MAX_DEPTH, VR};
use dcmbridge_encoding::encode::{self, primitive_value, Encode};
use dcmbridge_encoding::TransferSyntax;
use serde::Deserialize;
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The transfer syntax has no native encoder.
    #[snafu(display("Unsupported transfer syntax {}", uid))]
    UnsupportedTransferSyntax {
        uid: &'static str,
        backtrace: Backtrace,
    },
    /// Could not write a data element.
    #[snafu(display("Could not write element {}", tag))]
    WriteElement {
        tag: Tag,
        #[snafu(backtrace)]
        source: encode::Error,
    },
    /// Could not write the raw bytes of a pixel data fragment.
    #[snafu(display("Could not write pixel data fragment"))]
    WriteFragment {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    /// The contents of an element do not fit in a 32-bit length.
    #[snafu(display("Element {} is too long to be encoded", tag))]
    LengthOverflow { tag: Tag, backtrace: Backtrace },
    /// The data set nests sequences too deeply.
    #[snafu(display("Sequence nesting exceeds the limit of {} levels", max_depth))]
    MaxDepthExceeded { max_depth: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Options for writing a data set in its binary form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// The maximum level of sequence nesting accepted.
    pub max_depth: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl WriteOptions {
    /// Create the default set of options.
    pub fn new() -> Self {
        WriteOptions::default()
    }

    /// Override the maximum level of sequence nesting.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Whether an element is written out.
///
/// Group length elements are recomputed by readers when needed,
/// and the file meta group only exists in the file header.
fn is_written(elt: &InMemElement, top_level: bool) -> bool {
    let tag = elt.tag();
    !tag.is_group_length() && !(top_level && tag.group() == 0x0002)
}

/// A writer of data sets in a specific transfer syntax.
pub struct DataSetWriter {
    encoder: Box<dyn Encode>,
    explicit_vr: bool,
    max_depth: usize,
}

impl std::fmt::Debug for DataSetWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSetWriter")
            .field("encoder", &self.encoder.endianness())
            .field("explicit_vr", &self.explicit_vr)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl DataSetWriter {
    /// Create a writer for the given transfer syntax.
    pub fn new(ts: &TransferSyntax, options: WriteOptions) -> Result<Self> {
        let encoder = ts
            .encoder()
            .context(UnsupportedTransferSyntaxSnafu { uid: ts.uid() })?;
        Ok(DataSetWriter {
            encoder,
            explicit_vr: ts.explicit_vr(),
            max_depth: options.max_depth,
        })
    }

    /// The number of bytes that the given data set takes once written.
    pub fn encoded_len(&self, obj: &InMemDicomObject) -> Result<usize> {
        Ok(self.object_len(obj, 0, true)? as usize)
    }

    /// Write a whole data set.
    /// Returns the number of bytes written.
    pub fn write_dataset(&self, to: &mut dyn Write, obj: &InMemDicomObject) -> Result<usize> {
        self.write_object(to, obj, 0, true)
    }

    fn header_len(&self, vr: VR) -> u64 {
        if !self.explicit_vr || vr.has_short_length() {
            8
        } else {
            12
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        ensure!(
            depth < self.max_depth,
            MaxDepthExceededSnafu {
                max_depth: self.max_depth,
            }
        );
        Ok(())
    }

    fn object_len(&self, obj: &InMemDicomObject, depth: usize, top_level: bool) -> Result<u64> {
        let mut len = 0;
        for elt in obj.iter().filter(|e| is_written(e, top_level)) {
            len += self.header_len(elt.vr()) + self.value_len(elt, depth)?;
        }
        Ok(len)
    }

    fn value_len(&self, elt: &InMemElement, depth: usize) -> Result<u64> {
        match elt.value() {
            Value::Primitive(v) => Ok(primitive_value::encoded_len(v) as u64),
            Value::Sequence(items) => {
                self.check_depth(depth)?;
                let mut len = 0;
                for item in items {
                    len += 8 + self.object_len(item, depth + 1, false)?;
                }
                Ok(len)
            }
            Value::PixelSequence(seq) => Ok(fragments_len(seq)),
        }
    }

    fn write_object(
        &self,
        to: &mut dyn Write,
        obj: &InMemDicomObject,
        depth: usize,
        top_level: bool,
    ) -> Result<usize> {
        let mut written = 0;
        for elt in obj
            .sorted_elements()
            .into_iter()
            .filter(|e| is_written(e, top_level))
        {
            written += self.write_element(to, elt, depth)?;
        }
        Ok(written)
    }

    fn write_element(&self, to: &mut dyn Write, elt: &InMemElement, depth: usize) -> Result<usize> {
        let tag = elt.tag();
        match elt.value() {
            Value::Primitive(v) => self
                .encoder
                .encode_element(to, tag, elt.vr(), v)
                .context(WriteElementSnafu { tag }),
            Value::Sequence(items) => {
                let len = self.value_len(elt, depth)?;
                let len = u32::try_from(len)
                    .ok()
                    .filter(|l| *l != u32::MAX)
                    .context(LengthOverflowSnafu { tag })?;
                let mut written = self
                    .encoder
                    .encode_element_header(&mut *to, DataElementHeader::new(tag, VR::SQ, Length(len)))
                    .context(WriteElementSnafu { tag })?;
                for item in items {
                    let item_len = self.object_len(item, depth + 1, false)? as u32;
                    self.encoder
                        .encode_item_header(&mut *to, item_len)
                        .context(WriteElementSnafu { tag })?;
                    written += 8 + self.write_object(to, item, depth + 1, false)?;
                }
                Ok(written)
            }
            Value::PixelSequence(seq) => {
                let header = DataElementHeader::new(tag, elt.vr(), Length::UNDEFINED);
                let mut written = self
                    .encoder
                    .encode_element_header(&mut *to, header)
                    .context(WriteElementSnafu { tag })?;
                written += self.write_fragments(to, tag, seq)?;
                Ok(written)
            }
        }
    }

    fn write_fragments(
        &self,
        to: &mut dyn Write,
        tag: Tag,
        seq: &PixelFragmentSequence,
    ) -> Result<usize> {
        let mut table = Vec::with_capacity(seq.offset_table().len() * 4);
        {
            let mut table = ByteOrdered::le(&mut table);
            for offset in seq.offset_table() {
                table.write_u32(*offset).context(WriteFragmentSnafu)?;
            }
        }
        let mut written = 0;
        for fragment in std::iter::once(&table).chain(seq.fragments()) {
            let padded_len = fragment.len() + (fragment.len() & 1);
            self.encoder
                .encode_item_header(&mut *to, padded_len as u32)
                .context(WriteElementSnafu { tag })?;
            to.write_all(fragment).context(WriteFragmentSnafu)?;
            if padded_len > fragment.len() {
                to.write_all(&[0]).context(WriteFragmentSnafu)?;
            }
            written += 8 + padded_len;
        }
        self.encoder
            .encode_sequence_delimiter(to)
            .context(WriteElementSnafu { tag })?;
        Ok(written + 8)
    }
}

/// The length of an encapsulated pixel data value,
/// from the offset table item to the sequence delimiter.
fn fragments_len(seq: &PixelFragmentSequence) -> u64 {
    let table = 8 + 4 * seq.offset_table().len() as u64;
    let fragments: u64 = seq
        .fragments()
        .iter()
        .map(|f| 8 + (f.len() + (f.len() & 1)) as u64)
        .sum();
    table + fragments + 8
}
