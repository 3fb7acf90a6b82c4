//! Decoding of primitive values,
//! driven by the value representation in the element header.

use crate::decode::basic::BasicDecoder;
use crate::decode::{InvalidValueLengthSnafu, ReadValueSnafu, Result};
use byteordered::Endianness;
use dcmbridge_core::header::DataElementHeader;
use dcmbridge_core::value::{PrimitiveValue, C};
use dcmbridge_core::{Tag, VrCategory, VR};
use snafu::{ensure, OptionExt, ResultExt};
use std::io::{self, Read};

/// Read the value of a primitive data element.
///
/// Character strings are kept as raw bytes without the trailing padding.
/// Binary numbers are decoded in the given byte order.
pub fn read_value(
    source: &mut dyn Read,
    header: &DataElementHeader,
    endianness: Endianness,
) -> Result<PrimitiveValue> {
    let tag = header.tag;
    let len = header.len.get().context(InvalidValueLengthSnafu {
        tag,
        vr: header.vr,
        len: header.len,
    })? as usize;
    if len == 0 {
        return Ok(PrimitiveValue::Empty);
    }

    if let Some(width) = header.vr.unit_width() {
        ensure!(
            len % width == 0,
            InvalidValueLengthSnafu {
                tag,
                vr: header.vr,
                len: header.len,
            }
        );
    }

    let bytes = read_bytes(source, len).context(ReadValueSnafu { tag })?;
    let basic = BasicDecoder::new(endianness);
    let n = |width: usize| len / width;

    let value = match header.vr {
        vr if vr.category() == VrCategory::String => {
            let mut text = bytes;
            trim_padding(&mut text, header.vr);
            PrimitiveValue::Text(text)
        }
        VR::OB | VR::UN => PrimitiveValue::U8(C::from_vec(bytes)),
        VR::AT => {
            let mut words = vec![0u16; n(2)];
            basic
                .decode_us_into(&bytes[..], &mut words)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::Tags(words.chunks(2).map(|w| Tag(w[0], w[1])).collect())
        }
        VR::OW | VR::US => {
            let mut out = vec![0u16; n(2)];
            basic
                .decode_us_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::U16(C::from_vec(out))
        }
        VR::SS => {
            let mut out = vec![0i16; n(2)];
            basic
                .decode_ss_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::I16(C::from_vec(out))
        }
        VR::UL | VR::OL => {
            let mut out = vec![0u32; n(4)];
            basic
                .decode_ul_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::U32(C::from_vec(out))
        }
        VR::SL => {
            let mut out = vec![0i32; n(4)];
            basic
                .decode_sl_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::I32(C::from_vec(out))
        }
        VR::UV | VR::OV => {
            let mut out = vec![0u64; n(8)];
            basic
                .decode_uv_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::U64(C::from_vec(out))
        }
        VR::SV => {
            let mut out = vec![0i64; n(8)];
            basic
                .decode_sv_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::I64(C::from_vec(out))
        }
        VR::FL | VR::OF => {
            let mut out = vec![0f32; n(4)];
            basic
                .decode_fl_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::F32(C::from_vec(out))
        }
        VR::FD | VR::OD => {
            let mut out = vec![0f64; n(8)];
            basic
                .decode_fd_into(&bytes[..], &mut out)
                .context(ReadValueSnafu { tag })?;
            PrimitiveValue::F64(C::from_vec(out))
        }
        // sequences never reach this point
        _ => PrimitiveValue::U8(C::from_vec(bytes)),
    };
    Ok(value)
}

/// Read exactly `len` bytes,
/// without trusting the length for the initial allocation.
fn read_bytes(source: &mut dyn Read, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(1 << 16));
    source.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "value ends before its declared length",
        ));
    }
    Ok(buf)
}

/// Remove trailing spaces and null characters.
///
/// Free text (LT, ST and UT) keeps its trailing spaces
/// and only loses the byte padding it to an even length.
pub fn trim_padding(text: &mut Vec<u8>, vr: VR) {
    if matches!(vr, VR::LT | VR::ST | VR::UT) {
        if text.len() % 2 == 0 && matches!(text.last(), Some(b' ') | Some(0)) {
            text.pop();
        }
        return;
    }
    while matches!(text.last(), Some(b' ') | Some(0)) {
        text.pop();
    }
}
