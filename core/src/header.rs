//! This module contains the data types for DICOM element headers:
//! tags, value representations and lengths,
//! plus the owned [`DataElement`] built on top of them.

use crate::value::{PrimitiveValue, Value};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::fmt;
use std::str::{from_utf8, FromStr};

/// Error type for parsing a DICOM tag from text.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ParseTagError {
    /// The text does not have the shape of a hexadecimal tag.
    #[snafu(display("Invalid tag `{}`, expected `gggg,eeee` or `ggggeeee`", text))]
    InvalidFormat { text: String, backtrace: Backtrace },
    /// One of the two components is not a hexadecimal number.
    #[snafu(display("Invalid hexadecimal component in tag `{}`", text))]
    InvalidHex {
        text: String,
        source: std::num::ParseIntError,
        backtrace: Backtrace,
    },
}

/// Trait for any DICOM entity (element or item) which may have a length.
pub trait HasLength {
    /// Retrieve the value data's length as specified by the data element or
    /// item, in bytes.
    ///
    /// It is named `length` to make it distinct from the conventional method
    /// signature `len(&self) -> usize` for the number of elements of a
    /// collection.
    fn length(&self) -> Length;

    /// Check whether the value is empty (0 length).
    fn is_empty(&self) -> bool {
        self.length() == Length(0)
    }
}

/// Idiomatic alias for a tag (group, element) tuple.
///
/// Every data element has a unique tag.
/// Tags sort by group first, then by element.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    /// Getter for the tag's group value.
    #[inline]
    pub const fn group(self) -> u16 {
        self.0
    }

    /// Getter for the tag's element value.
    #[inline]
    pub const fn element(self) -> u16 {
        self.1
    }

    /// Check whether this tag belongs to a private group:
    /// an odd group other than 0001, 0003, 0005, 0007 and FFFF.
    ///
    /// ```
    /// # use dcmbridge_core::Tag;
    /// assert!(Tag(0x0009, 0x1001).is_private());
    /// assert!(!Tag(0x0008, 0x0010).is_private());
    /// assert!(!Tag(0x0003, 0x0010).is_private());
    /// ```
    #[inline]
    pub const fn is_private(self) -> bool {
        self.0 % 2 == 1 && !matches!(self.0, 0x0001 | 0x0003 | 0x0005 | 0x0007 | 0xFFFF)
    }

    /// Check whether this tag is a private creator element,
    /// `(gggg,0010)` to `(gggg,00FF)` in a private group.
    #[inline]
    pub const fn is_private_creator(self) -> bool {
        self.is_private() && self.1 >= 0x0010 && self.1 <= 0x00FF
    }

    /// Check whether this is a group length element `(gggg,0000)`.
    #[inline]
    pub const fn is_group_length(self) -> bool {
        self.1 == 0x0000
    }

    /// Obtain the tag of the private creator element
    /// which reserves the block containing this private data element.
    ///
    /// ```
    /// # use dcmbridge_core::Tag;
    /// assert_eq!(Tag(0x0029, 0x1108).private_creator_tag(), Some(Tag(0x0029, 0x0011)));
    /// assert_eq!(Tag(0x0029, 0x0011).private_creator_tag(), None);
    /// assert_eq!(Tag(0x0028, 0x1108).private_creator_tag(), None);
    /// ```
    pub fn private_creator_tag(self) -> Option<Tag> {
        if self.is_private() && self.1 >= 0x1000 {
            Some(Tag(self.0, self.1 >> 8))
        } else {
            None
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:#06X?}, {:#06X?})", self.0, self.1)
    }
}

/// Formats the tag as `(GGGG,EEEE)`.
impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

/// Formats the tag as `gggg,eeee`,
/// the key used in generic documents.
///
/// ```
/// # use dcmbridge_core::Tag;
/// assert_eq!(format!("{:x}", Tag(0x7FE0, 0x0010)), "7fe0,0010");
/// ```
impl fmt::LowerHex for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04x},{:04x}", self.0, self.1)
    }
}

/// Parses `gggg,eeee` or `ggggeeee` in either letter case.
impl FromStr for Tag {
    type Err = ParseTagError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        ensure!(text.is_ascii(), InvalidFormatSnafu { text });
        let (group, element) = match text.len() {
            9 if text.as_bytes()[4] == b',' => (&text[0..4], &text[5..9]),
            8 => (&text[0..4], &text[4..8]),
            _ => return InvalidFormatSnafu { text }.fail(),
        };
        ensure!(
            group.bytes().chain(element.bytes()).all(|b| b.is_ascii_hexdigit()),
            InvalidFormatSnafu { text }
        );
        let group = u16::from_str_radix(group, 16).context(InvalidHexSnafu { text })?;
        let element = u16::from_str_radix(element, 16).context(InvalidHexSnafu { text })?;
        Ok(Tag(group, element))
    }
}

impl From<(u16, u16)> for Tag {
    #[inline]
    fn from(value: (u16, u16)) -> Tag {
        Tag(value.0, value.1)
    }
}

impl From<[u16; 2]> for Tag {
    #[inline]
    fn from(value: [u16; 2]) -> Tag {
        Tag(value[0], value[1])
    }
}

/// An enum type for a DICOM value representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Universal Resource Locator (URI/URL)
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
}

/// The broad category of a value representation,
/// which decides how its content is decoded and converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VrCategory {
    /// Character strings, subject to the data set's character set.
    String,
    /// Binary numbers with a fixed width.
    Numeric,
    /// Opaque bytes or words.
    Binary,
    /// Attribute tags.
    AttributeTag,
    /// Sequence of items.
    Sequence,
}

impl VR {
    /// Obtain the value representation corresponding to the given two bytes.
    /// Each byte should represent an alphabetic character in upper case.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        from_utf8(chars.as_ref())
            .ok()
            .and_then(|s| VR::from_str(s).ok())
    }

    /// Retrieve a string representation of this VR.
    pub fn to_string(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
        }
    }

    /// Retrieve a copy of this VR's byte representation.
    /// The function returns two alphabetic characters in upper case.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.to_string().as_bytes();
        [bytes[0], bytes[1]]
    }

    /// Obtain the category of this value representation.
    pub fn category(self) -> VrCategory {
        use VR::*;
        match self {
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UI | UR | UT => {
                VrCategory::String
            }
            FL | FD | SL | SS | SV | UL | US | UV => VrCategory::Numeric,
            OB | OD | OF | OL | OV | OW | UN => VrCategory::Binary,
            AT => VrCategory::AttributeTag,
            SQ => VrCategory::Sequence,
        }
    }

    /// Whether values of this VR are character strings.
    #[inline]
    pub fn is_string(self) -> bool {
        self.category() == VrCategory::String
    }

    /// Whether values of this VR are binary numbers.
    #[inline]
    pub fn is_numeric(self) -> bool {
        self.category() == VrCategory::Numeric
    }

    /// Whether values of this VR are opaque binary data.
    #[inline]
    pub fn is_binary(self) -> bool {
        self.category() == VrCategory::Binary
    }

    /// The width in bytes of a single value,
    /// for VRs made of fixed-width units.
    pub fn unit_width(self) -> Option<usize> {
        use VR::*;
        match self {
            OB | UN => Some(1),
            OW | SS | US => Some(2),
            AT => Some(4),
            FL | OF | OL | SL | UL => Some(4),
            FD | OD | OV | SV | UV => Some(8),
            _ => None,
        }
    }

    /// Whether an explicit VR header of this VR
    /// encodes the value length in 2 bytes rather than 4.
    pub fn has_short_length(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS | AT | CS | DA | DS | DT | FL | FD | IS | LO | LT | PN | SH | SL | SS | ST
                | TM | UI | UL | US
        )
    }

    /// The byte used to pad values of this VR to an even length.
    pub fn padding(self) -> u8 {
        match self {
            VR::UI | VR::OB | VR::UN => 0,
            _ => b' ',
        }
    }
}

/// Obtain the value representation corresponding to the given string.
/// The string should hold exactly two UTF-8 encoded alphabetic characters
/// in upper case, otherwise no match is made.
impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> std::result::Result<Self, Self::Err> {
        use VR::*;
        match string {
            "AE" => Ok(AE),
            "AS" => Ok(AS),
            "AT" => Ok(AT),
            "CS" => Ok(CS),
            "DA" => Ok(DA),
            "DS" => Ok(DS),
            "DT" => Ok(DT),
            "FL" => Ok(FL),
            "FD" => Ok(FD),
            "IS" => Ok(IS),
            "LO" => Ok(LO),
            "LT" => Ok(LT),
            "OB" => Ok(OB),
            "OD" => Ok(OD),
            "OF" => Ok(OF),
            "OL" => Ok(OL),
            "OV" => Ok(OV),
            "OW" => Ok(OW),
            "PN" => Ok(PN),
            "SH" => Ok(SH),
            "SL" => Ok(SL),
            "SQ" => Ok(SQ),
            "SS" => Ok(SS),
            "ST" => Ok(ST),
            "SV" => Ok(SV),
            "TM" => Ok(TM),
            "UC" => Ok(UC),
            "UI" => Ok(UI),
            "UL" => Ok(UL),
            "UN" => Ok(UN),
            "UR" => Ok(UR),
            "US" => Ok(US),
            "UT" => Ok(UT),
            "UV" => Ok(UV),
            _ => Err("no such value representation"),
        }
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(VR::to_string(*self))
    }
}

/// A type for representing data set content length, in bytes.
/// An internal value of `0xFFFF_FFFF` represents an undefined
/// (unspecified) length, which would have to be determined
/// with a traversal based on the content's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Length(pub u32);

const UNDEFINED_LEN: u32 = 0xFFFF_FFFF;

impl Length {
    /// A length that is undefined.
    pub const UNDEFINED: Self = Length(UNDEFINED_LEN);

    /// Check whether this length is undefined (unknown).
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == UNDEFINED_LEN
    }

    /// Fetch the concrete length value, if available.
    /// Returns `None` if it represents an undefined length.
    #[inline]
    pub fn get(self) -> Option<u32> {
        if self.is_undefined() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl From<u32> for Length {
    #[inline]
    fn from(o: u32) -> Self {
        Length(o)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some(len) => write!(f, "{}", len),
            None => f.write_str("U/L"),
        }
    }
}

/// A data structure for a data element header, containing
/// a tag, value representation and specified length.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DataElementHeader {
    /// DICOM tag
    pub tag: Tag,
    /// Value Representation
    pub vr: VR,
    /// Element length
    pub len: Length,
}

impl HasLength for DataElementHeader {
    #[inline]
    fn length(&self) -> Length {
        self.len
    }
}

impl DataElementHeader {
    /// Create a new data element header with the given properties.
    #[inline]
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, len: Length) -> DataElementHeader {
        DataElementHeader {
            tag: tag.into(),
            vr,
            len,
        }
    }

    /// Check whether the header suggests the value to be a sequence value:
    /// if the value representation is SQ or the length is undefined.
    #[inline]
    pub fn is_non_primitive(&self) -> bool {
        self.vr == VR::SQ || self.len.is_undefined()
    }

    /// Check whether this is the header of an encapsulated pixel data.
    #[inline]
    pub fn is_encapsulated_pixeldata(&self) -> bool {
        self.tag == Tag(0x7FE0, 0x0010) && self.len.is_undefined()
    }
}

/// Error type for an unexpected item header.
#[derive(Debug, Snafu)]
#[snafu(display("Unexpected tag {} for a sequence item header", tag))]
pub struct UnexpectedItemTagError {
    tag: Tag,
    backtrace: Backtrace,
}

/// Data type for describing a sequence item data element.
/// If the element represents an item, it will also contain
/// the specified length.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SequenceItemHeader {
    /// The cursor contains an item.
    Item {
        /// the length of the item in bytes (can be 0xFFFFFFFF if undefined)
        len: Length,
    },
    /// The cursor read an item delimiter.
    /// The element ends here and should not be read any further.
    ItemDelimiter,
    /// The cursor read a sequence delimiter.
    /// The element ends here and should not be read any further.
    SequenceDelimiter,
}

impl SequenceItemHeader {
    /// Create a sequence item header using the element's raw properties.
    /// An error can be raised if the given properties do not relate to a
    /// sequence item, a sequence item delimiter or a sequence delimiter.
    pub fn new<T: Into<Tag>>(tag: T, len: Length) -> Result<SequenceItemHeader, UnexpectedItemTagError> {
        match tag.into() {
            Tag(0xFFFE, 0xE000) => Ok(SequenceItemHeader::Item { len }),
            Tag(0xFFFE, 0xE00D) => Ok(SequenceItemHeader::ItemDelimiter),
            Tag(0xFFFE, 0xE0DD) => Ok(SequenceItemHeader::SequenceDelimiter),
            tag => UnexpectedItemTagSnafu { tag }.fail(),
        }
    }

    /// Retrieve the sequence item's attribute tag.
    pub fn tag(&self) -> Tag {
        match self {
            SequenceItemHeader::Item { .. } => Tag(0xFFFE, 0xE000),
            SequenceItemHeader::ItemDelimiter => Tag(0xFFFE, 0xE00D),
            SequenceItemHeader::SequenceDelimiter => Tag(0xFFFE, 0xE0DD),
        }
    }
}

/// An owned data element: a tag, a value representation
/// and a value which is either primitive, a sequence of items `I`,
/// or an encapsulated pixel data fragment sequence.
#[derive(Debug, PartialEq, Clone)]
pub struct DataElement<I> {
    tag: Tag,
    vr: VR,
    value: Value<I>,
}

impl<I> DataElement<I> {
    /// Create a data element from the given parts.
    pub fn new<T: Into<Tag>, V: Into<Value<I>>>(tag: T, vr: VR, value: V) -> Self {
        DataElement {
            tag: tag.into(),
            vr,
            value: value.into(),
        }
    }

    /// Create an empty leaf data element.
    pub fn empty<T: Into<Tag>>(tag: T, vr: VR) -> Self {
        DataElement::new(tag, vr, PrimitiveValue::Empty)
    }

    /// Retrieve the element's tag.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Retrieve the element's value representation.
    #[inline]
    pub fn vr(&self) -> VR {
        self.vr
    }

    /// Retrieve the data value.
    #[inline]
    pub fn value(&self) -> &Value<I> {
        &self.value
    }

    /// Retrieve a mutable reference to the data value.
    #[inline]
    pub fn value_mut(&mut self) -> &mut Value<I> {
        &mut self.value
    }

    /// Move the data value out of the element, discarding the rest.
    #[inline]
    pub fn into_value(self) -> Value<I> {
        self.value
    }

    /// Whether this element is a leaf (not a sequence of items).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        !matches!(self.value, Value::Sequence(_))
    }

    /// Retrieve the items of a sequence element.
    pub fn items(&self) -> Option<&[I]> {
        self.value.items()
    }

    /// Retrieve the items of a sequence element for modification.
    pub fn items_mut(&mut self) -> Option<&mut Vec<I>> {
        self.value.items_mut()
    }
}
