//! Explicit VR transfer syntax implementation,
//! in either byte order.

use crate::encode::basic::BasicEncoder;
use crate::encode::{Encode, LengthTooLongSnafu, Result, WriteLengthSnafu, WriteVrSnafu};
use byteordered::Endianness;
use dcmbridge_core::header::DataElementHeader;
use snafu::{ensure, ResultExt};
use std::io::Write;

/// A concrete encoder for the transfer syntaxes with explicit VR.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVREncoder {
    basic: BasicEncoder,
}

impl ExplicitVREncoder {
    /// An encoder for Explicit VR Little Endian.
    pub fn little_endian() -> Self {
        ExplicitVREncoder {
            basic: BasicEncoder::new(Endianness::Little),
        }
    }

    /// An encoder for Explicit VR Big Endian.
    pub fn big_endian() -> Self {
        ExplicitVREncoder {
            basic: BasicEncoder::new(Endianness::Big),
        }
    }
}

impl Encode for ExplicitVREncoder {
    fn endianness(&self) -> Endianness {
        self.basic.endianness()
    }

    fn encode_element_header(&self, to: &mut dyn Write, de: DataElementHeader) -> Result<usize> {
        let tag = de.tag;
        self.encode_tag(&mut *to, tag)?;
        to.write_all(&de.vr.to_bytes())
            .context(WriteVrSnafu { tag })?;
        if de.vr.has_short_length() {
            ensure!(
                de.len.0 <= u32::from(u16::MAX),
                LengthTooLongSnafu {
                    tag,
                    vr: de.vr,
                    len: de.len,
                }
            );
            self.basic
                .encode_us(&mut *to, de.len.0 as u16)
                .context(WriteLengthSnafu { tag })?;
            Ok(8)
        } else {
            to.write_all(&[0, 0]).context(WriteLengthSnafu { tag })?;
            self.basic
                .encode_ul(&mut *to, de.len.0)
                .context(WriteLengthSnafu { tag })?;
            Ok(12)
        }
    }
}
