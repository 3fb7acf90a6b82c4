//! Declaration and implementation of a DICOM primitive value.
//!
//! See [`PrimitiveValue`](./enum.PrimitiveValue.html).

use super::C;
use crate::header::Tag;
use itertools::Itertools;

/// An enum representing a primitive value from a DICOM element.
///
/// Character strings are kept as the raw bytes found in the data set,
/// in whichever character set the data set declares,
/// with multiple values separated by backslashes
/// and without the trailing padding.
/// Decoding them into text is left to the consumer,
/// which knows the character set in effect.
///
/// Binary numbers are decoded into native values.
/// Multiple elements are contained in a [`smallvec`] vector,
/// conveniently aliased to the type [`C`].
///
/// [`smallvec`]: ../../smallvec/index.html
/// [`C`]: ./type.C.html
#[derive(Debug, PartialEq, Clone)]
pub enum PrimitiveValue {
    /// No data. Usually employed for zero-lengthed values.
    Empty,

    /// Raw character string data.
    /// Used for AE, AS, CS, DA, DS, DT, IS, LO, LT, PN, SH, ST, TM, UC, UI, UR and UT.
    Text(Vec<u8>),

    /// A sequence of attribute tags.
    /// Used specifically for AT.
    Tags(C<Tag>),

    /// A sequence of bytes.
    /// Used for OB and UN.
    U8(C<u8>),

    /// A sequence of signed 16-bit integers.
    /// Used for SS.
    I16(C<i16>),

    /// A sequence of unsigned 16-bit integers.
    /// Used for US and OW.
    U16(C<u16>),

    /// A sequence of signed 32-bit integers.
    /// Used for SL.
    I32(C<i32>),

    /// A sequence of unsigned 32-bit integers.
    /// Used for UL and OL.
    U32(C<u32>),

    /// A sequence of signed 64-bit integers.
    /// Used for SV.
    I64(C<i64>),

    /// A sequence of unsigned 64-bit integers.
    /// Used for UV and OV.
    U64(C<u64>),

    /// A sequence of 32-bit floating point numbers.
    /// Used for OF and FL.
    F32(C<f32>),

    /// A sequence of 64-bit floating point numbers.
    /// Used for OD and FD.
    F64(C<f64>),
}

/// A utility macro for implementing the conversion from a core type into a
/// DICOM primitive value with a single element.
macro_rules! impl_from_for_primitive {
    ($typ: ty, $variant: ident) => {
        impl From<$typ> for PrimitiveValue {
            fn from(value: $typ) -> Self {
                PrimitiveValue::$variant(C::from_elem(value, 1))
            }
        }
    };
}

impl_from_for_primitive!(u8, U8);
impl_from_for_primitive!(u16, U16);
impl_from_for_primitive!(i16, I16);
impl_from_for_primitive!(u32, U32);
impl_from_for_primitive!(i32, I32);
impl_from_for_primitive!(u64, U64);
impl_from_for_primitive!(i64, I64);
impl_from_for_primitive!(f32, F32);
impl_from_for_primitive!(f64, F64);
impl_from_for_primitive!(Tag, Tags);

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::Text(value.as_bytes().to_vec())
    }
}

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::Text(value.into_bytes())
    }
}

impl From<&[u8]> for PrimitiveValue {
    fn from(value: &[u8]) -> Self {
        PrimitiveValue::U8(C::from_slice(value))
    }
}

impl PrimitiveValue {
    /// Obtain the number of individual elements.
    /// A character string counts its backslash-separated values.
    pub fn multiplicity(&self) -> u32 {
        use self::PrimitiveValue::*;
        match self {
            Empty => 0,
            Text(bytes) => bytes.iter().filter(|b| **b == b'\\').count() as u32 + 1,
            Tags(c) => c.len() as u32,
            U8(c) => c.len() as u32,
            I16(c) => c.len() as u32,
            U16(c) => c.len() as u32,
            I32(c) => c.len() as u32,
            U32(c) => c.len() as u32,
            I64(c) => c.len() as u32,
            U64(c) => c.len() as u32,
            F32(c) => c.len() as u32,
            F64(c) => c.len() as u32,
        }
    }

    /// Check whether the value holds no data.
    pub fn is_empty(&self) -> bool {
        self.multiplicity() == 0 || matches!(self, PrimitiveValue::Text(b) if b.is_empty())
    }

    /// The raw bytes of a character string value.
    pub fn text(&self) -> Option<&[u8]> {
        match self {
            PrimitiveValue::Text(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The number of bytes of the value when encoded, without padding.
    pub fn byte_len(&self) -> usize {
        use self::PrimitiveValue::*;
        match self {
            Empty => 0,
            Text(bytes) => bytes.len(),
            Tags(c) => c.len() * 4,
            U8(c) => c.len(),
            I16(c) => c.len() * 2,
            U16(c) => c.len() * 2,
            I32(c) => c.len() * 4,
            U32(c) => c.len() * 4,
            I64(c) => c.len() * 8,
            U64(c) => c.len() * 8,
            F32(c) => c.len() * 4,
            F64(c) => c.len() * 8,
        }
    }

    /// Obtain the value's bytes in little endian order,
    /// as they would be found in a little endian data set.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        use self::PrimitiveValue::*;
        match self {
            Empty => Vec::new(),
            Text(bytes) => bytes.clone(),
            U8(c) => c.to_vec(),
            Tags(c) => c
                .iter()
                .flat_map(|t| {
                    let [g0, g1] = t.0.to_le_bytes();
                    let [e0, e1] = t.1.to_le_bytes();
                    [g0, g1, e0, e1]
                })
                .collect(),
            I16(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
            U16(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
            I32(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
            U32(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
            I64(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
            U64(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
            F32(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
            F64(c) => c.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    /// Format each numeric value as a decimal string.
    ///
    /// Returns `None` for values which are not binary numbers.
    ///
    /// ```
    /// # use dcmbridge_core::dicom_value;
    /// let value = dicom_value!(U16, [512, 1, 0]);
    /// assert_eq!(value.to_decimal_strings().unwrap(), vec!["512", "1", "0"]);
    /// ```
    pub fn to_decimal_strings(&self) -> Option<Vec<String>> {
        use self::PrimitiveValue::*;
        let out = match self {
            U8(c) => c.iter().map(|v| v.to_string()).collect(),
            I16(c) => c.iter().map(|v| v.to_string()).collect(),
            U16(c) => c.iter().map(|v| v.to_string()).collect(),
            I32(c) => c.iter().map(|v| v.to_string()).collect(),
            U32(c) => c.iter().map(|v| v.to_string()).collect(),
            I64(c) => c.iter().map(|v| v.to_string()).collect(),
            U64(c) => c.iter().map(|v| v.to_string()).collect(),
            F32(c) => c.iter().map(|v| v.to_string()).collect(),
            F64(c) => c.iter().map(|v| v.to_string()).collect(),
            Empty | Text(_) | Tags(_) => return None,
        };
        Some(out)
    }

    /// Format the numeric values as a backslash-separated decimal string.
    pub fn to_joined_decimal_string(&self) -> Option<String> {
        self.to_decimal_strings().map(|values| values.iter().join("\\"))
    }

    /// Obtain the integer values, widened to 64 bits.
    ///
    /// Unsigned 64-bit values which do not fit are not converted.
    pub fn to_i64s(&self) -> Option<Vec<i64>> {
        use self::PrimitiveValue::*;
        match self {
            I16(c) => Some(c.iter().map(|v| i64::from(*v)).collect()),
            U16(c) => Some(c.iter().map(|v| i64::from(*v)).collect()),
            I32(c) => Some(c.iter().map(|v| i64::from(*v)).collect()),
            U32(c) => Some(c.iter().map(|v| i64::from(*v)).collect()),
            I64(c) => Some(c.to_vec()),
            U64(c) => c.iter().map(|v| i64::try_from(*v).ok()).collect(),
            _ => None,
        }
    }

    /// Obtain the floating point values, widened to 64 bits.
    pub fn to_f64s(&self) -> Option<Vec<f64>> {
        match self {
            PrimitiveValue::F32(c) => Some(c.iter().map(|v| f64::from(*v)).collect()),
            PrimitiveValue::F64(c) => Some(c.to_vec()),
            _ => None,
        }
    }

    /// Obtain the attribute tag values.
    pub fn tags(&self) -> Option<&[Tag]> {
        match self {
            PrimitiveValue::Tags(c) => Some(c),
            _ => None,
        }
    }
}
