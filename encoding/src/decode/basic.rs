//! This module provides a primitive decoder of data,
//! which may be in either Little Endian or Big Endian.

use byteordered::{ByteOrdered, Endianness};
use dcmbridge_core::Tag;
use std::io::Read;

type Result<T> = std::io::Result<T>;

/// A basic decoder of primitive elements
/// with the byte order chosen at run-time.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct BasicDecoder {
    endianness: Endianness,
}

impl Default for BasicDecoder {
    fn default() -> Self {
        BasicDecoder::new(Endianness::Little)
    }
}

impl From<Endianness> for BasicDecoder {
    fn from(endianness: Endianness) -> Self {
        BasicDecoder::new(endianness)
    }
}

impl BasicDecoder {
    /// Create a basic decoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        BasicDecoder { endianness }
    }

    /// Retrieve the source's endianness, as expected by this decoder.
    pub fn endianness(self) -> Endianness {
        self.endianness
    }

    /// Decode an unsigned short value from the given source.
    pub fn decode_us<S: Read>(self, source: S) -> Result<u16> {
        ByteOrdered::runtime(source, self.endianness).read_u16()
    }

    /// Decode an unsigned long value from the given source.
    pub fn decode_ul<S: Read>(self, source: S) -> Result<u32> {
        ByteOrdered::runtime(source, self.endianness).read_u32()
    }

    /// Decode a DICOM attribute tag from the given source.
    pub fn decode_tag<S: Read>(self, mut source: S) -> Result<Tag> {
        let g = self.decode_us(&mut source)?;
        let e = self.decode_us(source)?;
        Ok(Tag(g, e))
    }

    /// Decode a sequence of unsigned shorts into the given buffer.
    pub fn decode_us_into<S: Read>(self, source: S, target: &mut [u16]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_u16_into(target)
    }

    /// Decode a sequence of signed shorts into the given buffer.
    pub fn decode_ss_into<S: Read>(self, source: S, target: &mut [i16]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_i16_into(target)
    }

    /// Decode a sequence of unsigned longs into the given buffer.
    pub fn decode_ul_into<S: Read>(self, source: S, target: &mut [u32]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_u32_into(target)
    }

    /// Decode a sequence of signed longs into the given buffer.
    pub fn decode_sl_into<S: Read>(self, source: S, target: &mut [i32]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_i32_into(target)
    }

    /// Decode a sequence of unsigned very longs into the given buffer.
    pub fn decode_uv_into<S: Read>(self, source: S, target: &mut [u64]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_u64_into(target)
    }

    /// Decode a sequence of signed very longs into the given buffer.
    pub fn decode_sv_into<S: Read>(self, source: S, target: &mut [i64]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_i64_into(target)
    }

    /// Decode a sequence of single precision floats into the given buffer.
    pub fn decode_fl_into<S: Read>(self, source: S, target: &mut [f32]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_f32_into(target)
    }

    /// Decode a sequence of double precision floats into the given buffer.
    pub fn decode_fd_into<S: Read>(self, source: S, target: &mut [f64]) -> Result<()> {
        ByteOrdered::runtime(source, self.endianness).read_f64_into(target)
    }
}
