//! This module provides a primitive encoder of data,
//! which may be in either Little Endian or Big Endian.

use byteordered::{ByteOrdered, Endianness};
use dcmbridge_core::Tag;
use std::io::Write;

type Result<T> = std::io::Result<T>;

/// A basic encoder of primitive elements
/// with the byte order chosen at run-time.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct BasicEncoder {
    endianness: Endianness,
}

impl Default for BasicEncoder {
    fn default() -> Self {
        BasicEncoder::new(Endianness::Little)
    }
}

impl From<Endianness> for BasicEncoder {
    fn from(endianness: Endianness) -> Self {
        BasicEncoder::new(endianness)
    }
}

impl BasicEncoder {
    /// Create a basic encoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        BasicEncoder { endianness }
    }

    /// Retrieve the destination's endianness, as expected by this encoder.
    pub fn endianness(self) -> Endianness {
        self.endianness
    }

    /// Encode an unsigned short value to the given writer.
    pub fn encode_us<W: Write>(self, to: W, value: u16) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_u16(value)
    }

    /// Encode an unsigned long value to the given writer.
    pub fn encode_ul<W: Write>(self, to: W, value: u32) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_u32(value)
    }

    /// Encode an unsigned very long value to the given writer.
    pub fn encode_uv<W: Write>(self, to: W, value: u64) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_u64(value)
    }

    /// Encode a signed short value to the given writer.
    pub fn encode_ss<W: Write>(self, to: W, value: i16) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_i16(value)
    }

    /// Encode a signed long value to the given writer.
    pub fn encode_sl<W: Write>(self, to: W, value: i32) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_i32(value)
    }

    /// Encode a signed very long value to the given writer.
    pub fn encode_sv<W: Write>(self, to: W, value: i64) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_i64(value)
    }

    /// Encode a single precision float value to the given writer.
    pub fn encode_fl<W: Write>(self, to: W, value: f32) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_f32(value)
    }

    /// Encode a double precision float value to the given writer.
    pub fn encode_fd<W: Write>(self, to: W, value: f64) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness).write_f64(value)
    }

    /// Encode a DICOM attribute tag to the given writer.
    pub fn encode_tag<W: Write>(self, mut to: W, tag: Tag) -> Result<()> {
        self.encode_us(&mut to, tag.group())?;
        self.encode_us(to, tag.element())
    }
}
