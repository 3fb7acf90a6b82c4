//! Encoding of primitive values into their binary form.

use crate::encode::basic::BasicEncoder;
use byteordered::Endianness;
use dcmbridge_core::value::PrimitiveValue;
use dcmbridge_core::VR;

/// The number of bytes that the value takes once encoded,
/// including the padding to an even length.
pub fn encoded_len(value: &PrimitiveValue) -> usize {
    let len = value.byte_len();
    len + (len & 1)
}

/// Encode a primitive value in the given byte order,
/// padded to an even length with the padding character of the VR.
pub fn value_bytes(value: &PrimitiveValue, vr: VR, endianness: Endianness) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    // writing into a vector cannot fail
    let _ = write_value(&mut out, value, BasicEncoder::new(endianness));
    if out.len() % 2 == 1 {
        out.push(vr.padding());
    }
    out
}

fn write_value(
    out: &mut Vec<u8>,
    value: &PrimitiveValue,
    basic: BasicEncoder,
) -> std::io::Result<()> {
    use PrimitiveValue::*;
    match value {
        Empty => {}
        Text(bytes) => out.extend_from_slice(bytes),
        U8(c) => out.extend_from_slice(c),
        Tags(c) => {
            for tag in c {
                basic.encode_tag(&mut *out, *tag)?;
            }
        }
        I16(c) => {
            for v in c {
                basic.encode_ss(&mut *out, *v)?;
            }
        }
        U16(c) => {
            for v in c {
                basic.encode_us(&mut *out, *v)?;
            }
        }
        I32(c) => {
            for v in c {
                basic.encode_sl(&mut *out, *v)?;
            }
        }
        U32(c) => {
            for v in c {
                basic.encode_ul(&mut *out, *v)?;
            }
        }
        I64(c) => {
            for v in c {
                basic.encode_sv(&mut *out, *v)?;
            }
        }
        U64(c) => {
            for v in c {
                basic.encode_uv(&mut *out, *v)?;
            }
        }
        F32(c) => {
            for v in c {
                basic.encode_fl(&mut *out, *v)?;
            }
        }
        F64(c) => {
            for v in c {
                basic.encode_fd(&mut *out, *v)?;
            }
        }
    }
    Ok(())
}
