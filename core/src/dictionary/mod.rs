//! This module contains the concept of a DICOM data dictionary.
//!
//! A dictionary translates attribute names and tags to an entry
//! describing the attribute:
//! its typical value representation, its name and its multiplicity.
//! Private attributes are only resolved together with
//! the private creator which reserved their block.

pub mod stub;

use crate::header::{Tag, VR};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// The name given to tags which no dictionary entry describes.
pub const UNKNOWN_TAG_NAME: &str = "Unknown Tag & Data";

/** Type trait for a dictionary of DICOM attributes. Attribute dictionaries provide the
 * means to convert a tag to an alias and vice versa, as well as a form of retrieving
 * additional information about the attribute.
 *
 * Entries are returned by value,
 * so that implementations are free to keep them behind a lock.
 *
 * The methods herein have no generic parameters, so as to enable being
 * used as a trait object.
 */
pub trait DataDictionary: Debug {
    /// Fetch an entry by its usual alias (e.g. "PatientName" or "SOPInstanceUID").
    /// Aliases are case sensitive and not separated by spaces.
    fn by_name(&self, name: &str) -> Option<DictionaryEntryBuf>;

    /// Fetch a public entry by its tag.
    /// Private attributes registered with a private creator are not matched.
    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntryBuf>;

    /// Fetch an entry of a private attribute,
    /// as reserved by the given private creator.
    fn by_private_tag(&self, tag: Tag, private_creator: &str) -> Option<DictionaryEntryBuf>;

    /// Fetch an entry by tag, with an optional private creator.
    fn by_tag_with_creator(
        &self,
        tag: Tag,
        private_creator: Option<&str>,
    ) -> Option<DictionaryEntryBuf> {
        match private_creator {
            Some(creator) if tag.is_private() => self.by_private_tag(tag, creator),
            _ => self.by_tag(tag),
        }
    }
}

impl<T: ?Sized + DataDictionary> DataDictionary for &T {
    fn by_name(&self, name: &str) -> Option<DictionaryEntryBuf> {
        (**self).by_name(name)
    }

    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntryBuf> {
        (**self).by_tag(tag)
    }

    fn by_private_tag(&self, tag: Tag, private_creator: &str) -> Option<DictionaryEntryBuf> {
        (**self).by_private_tag(tag, private_creator)
    }
}

impl<T: ?Sized + DataDictionary> DataDictionary for Box<T> {
    fn by_name(&self, name: &str) -> Option<DictionaryEntryBuf> {
        (**self).by_name(name)
    }

    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntryBuf> {
        (**self).by_tag(tag)
    }

    fn by_private_tag(&self, tag: Tag, private_creator: &str) -> Option<DictionaryEntryBuf> {
        (**self).by_private_tag(tag, private_creator)
    }
}

impl<T: ?Sized + DataDictionary> DataDictionary for Arc<T> {
    fn by_name(&self, name: &str) -> Option<DictionaryEntryBuf> {
        (**self).by_name(name)
    }

    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntryBuf> {
        (**self).by_tag(tag)
    }

    fn by_private_tag(&self, tag: Tag, private_creator: &str) -> Option<DictionaryEntryBuf> {
        (**self).by_private_tag(tag, private_creator)
    }
}

/// The range of tags covered by a dictionary entry.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum TagRange {
    /// Only a specific tag
    Single(Tag),
    /// The two rightmost digits of the _group_ portion are open:
    /// `(GGxx,EEEE)`
    Group100(Tag),
    /// The two rightmost digits of the _element_ portion are open:
    /// `(GGGG,EExx)`
    Element100(Tag),
    /// Generic group length tag,
    /// refers to any attribute of the form `(GGGG,0000)`.
    GroupLength,
    /// Generic private creator tag,
    /// refers to any tag from (GGGG,0010) to (GGGG,00FF),
    /// where `GGGG` is an odd number.
    PrivateCreator,
}

impl TagRange {
    /// Retrieve the inner tag representation of this range.
    ///
    /// Open components are zeroed out.
    /// Returns a zeroed out tag
    /// (equivalent to _(0000,0000)_)
    /// if this is a generic group length tag
    /// or a generic private creator tag.
    pub fn inner(self) -> Tag {
        match self {
            TagRange::Single(tag) => tag,
            TagRange::Group100(tag) => tag,
            TagRange::Element100(tag) => tag,
            TagRange::GroupLength => Tag(0x0000, 0x0000),
            TagRange::PrivateCreator => Tag(0x0000, 0x0000),
        }
    }

    /// Check whether the given tag falls in this range.
    pub fn contains(self, tag: Tag) -> bool {
        match self {
            TagRange::Single(t) => t == tag,
            TagRange::Group100(t) => t.element() == tag.element() && t.group() == tag.group() & 0xFF00,
            TagRange::Element100(t) => t.group() == tag.group() && t.element() == tag.element() & 0xFF00,
            TagRange::GroupLength => tag.is_group_length(),
            TagRange::PrivateCreator => tag.is_private_creator(),
        }
    }
}

/// The value multiplicity of an attribute:
/// a minimum number of values and an optional maximum,
/// `None` meaning unbounded.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct Multiplicity {
    /// the minimum number of values, at least 1
    pub min: u32,
    /// the maximum number of values, if bounded
    pub max: Option<u32>,
}

impl Multiplicity {
    /// Exactly one value.
    pub const ONE: Multiplicity = Multiplicity { min: 1, max: Some(1) };

    /// Create a multiplicity from its bounds.
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Multiplicity { min, max }
    }
}

impl Default for Multiplicity {
    fn default() -> Self {
        Multiplicity::ONE
    }
}

/// Formats as `1`, `1-3` or `1-n`.
impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{}-{}", self.min, max),
            None => write!(f, "{}-n", self.min),
        }
    }
}

/// A value representation which depends on the context of the attribute.
///
/// Dictionary entries with one of these
/// also carry its relaxed form as their typical VR.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum VirtualVr {
    /// A pixel sample value of 16 bits,
    /// signed ([`SS`](VR::SS)) when the _Pixel Representation_ is `1`
    /// and unsigned ([`US`](VR::US)) otherwise.
    Xs,
    /// Overlay or pixel data, either [`OB`](VR::OB) or [`OW`](VR::OW).
    Ox,
    /// LUT data, either [`US`](VR::US), [`SS`](VR::SS) or [`OW`](VR::OW).
    Lt,
}

impl VirtualVr {
    /// The value representation to assume when the context is unknown.
    pub fn relaxed(self) -> VR {
        match self {
            VirtualVr::Xs => VR::US,
            VirtualVr::Ox | VirtualVr::Lt => VR::OW,
        }
    }
}

/// A data type for a dictionary entry with full ownership.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DictionaryEntryBuf {
    /// The attribute tag or tag range
    pub tag: TagRange,
    /// The alias of the attribute, with no spaces, usually InCapitalizedCamelCase
    pub alias: String,
    /// The _typical_  value representation of the attribute
    pub vr: VR,
    /// The value multiplicity
    pub vm: Multiplicity,
    /// The private creator which owns this attribute, for private entries
    pub private_creator: Option<String>,
    /// The context-dependent value representation, if any
    pub virtual_vr: Option<VirtualVr>,
}

impl DictionaryEntryBuf {
    /// Create a public dictionary entry for a single tag.
    pub fn new(tag: Tag, alias: impl Into<String>, vr: VR, vm: Multiplicity) -> Self {
        DictionaryEntryBuf {
            tag: TagRange::Single(tag),
            alias: alias.into(),
            vr,
            vm,
            private_creator: None,
            virtual_vr: None,
        }
    }

    /// The attribute tag, with open components zeroed out for tag ranges.
    pub fn tag(&self) -> Tag {
        self.tag.inner()
    }

    /// The alias of the attribute.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The typical value representation of the attribute.
    pub fn vr(&self) -> VR {
        self.vr
    }

    /// Resolve the value representation of the attribute
    /// given the _Pixel Representation_ of its data set.
    pub fn vr_for_pixel_representation(&self, pixel_representation: u16) -> VR {
        match self.virtual_vr {
            Some(VirtualVr::Xs) if pixel_representation == 1 => VR::SS,
            _ => self.vr,
        }
    }
}
