//! This module includes a high level abstraction over a DICOM data element's value.

use crate::header::{HasLength, Length};
use smallvec::SmallVec;

mod primitive;

pub use self::primitive::PrimitiveValue;

/// An aggregation of one or more elements in a value.
pub type C<T> = SmallVec<[T; 2]>;

/// Type alias for the in-memory pixel data fragment data.
pub type InMemFragment = Vec<u8>;

/// Representation of a full DICOM value, which may be either primitive or
/// a sequence of nested items.
///
/// `I` is the type of the nested data set items.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<I> {
    /// Primitive value.
    Primitive(PrimitiveValue),
    /// A sequence of items, each exclusively owned by the sequence.
    Sequence(Vec<I>),
    /// A sequence of encapsulated pixel data fragments.
    PixelSequence(PixelFragmentSequence),
}

impl<I> Value<I> {
    /// Obtain the number of individual values.
    /// In a sequence, this is the number of items.
    pub fn multiplicity(&self) -> u32 {
        match self {
            Value::Primitive(v) => v.multiplicity(),
            Value::Sequence(items) => items.len() as u32,
            Value::PixelSequence(..) => 1,
        }
    }

    /// Get a reference to the primitive value, if it is one.
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// Get the items of a sequence value.
    pub fn items(&self) -> Option<&[I]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Get a mutable reference to the items of a sequence value.
    pub fn items_mut(&mut self) -> Option<&mut Vec<I>> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Get the encapsulated pixel data fragments.
    pub fn fragments(&self) -> Option<&PixelFragmentSequence> {
        match self {
            Value::PixelSequence(seq) => Some(seq),
            _ => None,
        }
    }
}

impl<I> From<PrimitiveValue> for Value<I> {
    #[inline]
    fn from(v: PrimitiveValue) -> Self {
        Value::Primitive(v)
    }
}

impl<I> From<&str> for Value<I> {
    #[inline]
    fn from(text: &str) -> Self {
        Value::Primitive(PrimitiveValue::from(text))
    }
}

impl<I> From<String> for Value<I> {
    #[inline]
    fn from(text: String) -> Self {
        Value::Primitive(PrimitiveValue::from(text))
    }
}

impl<I> From<Vec<I>> for Value<I> {
    #[inline]
    fn from(items: Vec<I>) -> Self {
        Value::Sequence(items)
    }
}

impl<I> From<PixelFragmentSequence> for Value<I> {
    #[inline]
    fn from(seq: PixelFragmentSequence) -> Self {
        Value::PixelSequence(seq)
    }
}

/// A sequence of compressed pixel data fragments,
/// preceded by the basic offset table.
///
/// The contents are kept exactly as they were read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelFragmentSequence {
    offset_table: C<u32>,
    fragments: C<InMemFragment>,
}

impl PixelFragmentSequence {
    /// Construct a pixel data fragment sequence
    /// from an offset table and a list of fragments.
    pub fn new(offset_table: impl Into<C<u32>>, fragments: impl Into<C<InMemFragment>>) -> Self {
        PixelFragmentSequence {
            offset_table: offset_table.into(),
            fragments: fragments.into(),
        }
    }

    /// The basic offset table.
    pub fn offset_table(&self) -> &[u32] {
        &self.offset_table
    }

    /// The compressed fragments.
    pub fn fragments(&self) -> &[InMemFragment] {
        &self.fragments
    }
}

impl HasLength for PixelFragmentSequence {
    /// Always undefined: encapsulated pixel data is delimited.
    fn length(&self) -> Length {
        Length::UNDEFINED
    }
}

/// Construct a DICOM primitive value.
///
/// ```
/// # use dcmbridge_core::{dicom_value, PrimitiveValue};
/// # use dcmbridge_core::smallvec::smallvec;
/// let value = dicom_value!(U16, [256, 0, 16]);
/// assert_eq!(value, PrimitiveValue::U16(smallvec![256, 0, 16]));
///
/// let value = dicom_value!(F64, 1.5);
/// assert_eq!(value, PrimitiveValue::F64(smallvec![1.5]));
/// ```
#[macro_export]
macro_rules! dicom_value {
    ($typ: ident, [ $($elem: expr),* ]) => {
        {
            use $crate::smallvec::smallvec;
            $crate::value::PrimitiveValue :: $typ (smallvec![$($elem,)*])
        }
    };
    ($typ: ident, $elem: expr) => {
        $crate::value::PrimitiveValue :: $typ ($crate::value::C::from_elem($elem, 1))
    };
}
