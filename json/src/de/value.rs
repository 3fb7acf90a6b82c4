//! Filling primitive values from the text of a document,
//! according to the value representation of the element.

use crate::de::{InvalidBinaryLengthSnafu, OutOfRangeValueSnafu, Result};
use dcmbridge_core::value::{PrimitiveValue, C};
use dcmbridge_core::{Tag, VrCategory, VR};
use dcmbridge_encoding::text::{validate_da, validate_dt, validate_tm, TextValidationOutcome};
use num_traits::Num;
use snafu::{ensure, OptionExt};
use tracing::warn;

/// Fill a value with raw little endian bytes,
/// laid out by the unit width of the VR.
pub(crate) fn fill_binary(tag: Tag, vr: VR, bytes: &[u8]) -> Result<PrimitiveValue> {
    if bytes.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }
    let width = vr.unit_width().unwrap_or(1);
    if bytes.len() % width != 0 {
        if vr == VR::OW {
            warn!("A tag with OW VR must have an even number of bytes");
        }
        return InvalidBinaryLengthSnafu {
            tag,
            vr,
            len: bytes.len(),
        }
        .fail();
    }

    let value = match vr {
        VR::OW | VR::US => PrimitiveValue::U16(
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        VR::SS => PrimitiveValue::I16(
            bytes
                .chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        VR::OF | VR::FL => PrimitiveValue::F32(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        VR::OL | VR::UL => PrimitiveValue::U32(
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        VR::SL => PrimitiveValue::I32(
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        VR::OD | VR::FD => PrimitiveValue::F64(
            bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        VR::OV | VR::UV => PrimitiveValue::U64(
            bytes
                .chunks_exact(8)
                .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        VR::SV => PrimitiveValue::I64(
            bytes
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        _ => PrimitiveValue::U8(C::from_slice(bytes)),
    };
    Ok(value)
}

/// Fill a value of a string VR,
/// checking the repertoire of dates and times.
pub(crate) fn fill_text(tag: Tag, vr: VR, bytes: Vec<u8>) -> Result<PrimitiveValue> {
    if bytes.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }
    let outcome = match vr {
        VR::DA => validate_da(&bytes),
        VR::TM => validate_tm(&bytes),
        VR::DT => validate_dt(&bytes),
        _ => TextValidationOutcome::Ok,
    };
    ensure!(
        outcome == TextValidationOutcome::Ok,
        OutOfRangeValueSnafu {
            tag,
            value: String::from_utf8_lossy(&bytes),
        }
    );
    Ok(PrimitiveValue::Text(bytes))
}

/// Fill a value of a numeric or attribute tag VR
/// from backslash separated decimal (or `gggg,eeee`) literals.
pub(crate) fn fill_parsed(tag: Tag, vr: VR, text: &str) -> Result<PrimitiveValue> {
    let text = text.trim_matches(|c| c == ' ' || c == '\0');
    if text.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }
    let value = match vr {
        VR::SS => PrimitiveValue::I16(parse_numbers(tag, text)?),
        VR::US => PrimitiveValue::U16(parse_numbers(tag, text)?),
        VR::SL => PrimitiveValue::I32(parse_numbers(tag, text)?),
        VR::UL => PrimitiveValue::U32(parse_numbers(tag, text)?),
        VR::SV => PrimitiveValue::I64(parse_numbers(tag, text)?),
        VR::UV => PrimitiveValue::U64(parse_numbers(tag, text)?),
        VR::FL => PrimitiveValue::F32(parse_numbers(tag, text)?),
        VR::FD => PrimitiveValue::F64(parse_numbers(tag, text)?),
        VR::AT => PrimitiveValue::Tags(
            text.split('\\')
                .map(|t| t.trim().parse::<Tag>().ok())
                .collect::<Option<_>>()
                .context(OutOfRangeValueSnafu { tag, value: text })?,
        ),
        _ => {
            debug_assert!(vr.category() != VrCategory::Numeric);
            return OutOfRangeValueSnafu { tag, value: text }.fail();
        }
    };
    Ok(value)
}

fn parse_numbers<T: Num>(tag: Tag, text: &str) -> Result<C<T>> {
    text.split('\\')
        .map(|part| T::from_str_radix(part.trim(), 10).ok())
        .collect::<Option<C<T>>>()
        .context(OutOfRangeValueSnafu { tag, value: text })
}
