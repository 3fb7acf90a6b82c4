//! Options of the conversions between data sets and documents.

use bitflags::bitflags;
use dcmbridge_core::{Tag, DEFAULT_MAX_DEPTH};
use dcmbridge_encoding::Encoding;
use dcmbridge_object::UidRoots;
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// The shape of the documents produced from data sets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum DicomToJsonFormat {
    /// Keyed by tag, with the name, type and value of each element.
    #[default]
    Full,
    /// Keyed by tag, with the bare values.
    Short,
    /// Keyed by attribute name, with the bare values.
    Human,
}

bitflags! {
    /// Which elements make it into a document and how binary content is shown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DicomToJsonFlags: u32 {
        /// Keep private tags.
        const INCLUDE_PRIVATE_TAGS = 1 << 0;
        /// Keep tags which are not in the dictionary.
        const INCLUDE_UNKNOWN_TAGS = 1 << 1;
        /// Keep binary elements other than Pixel Data.
        const INCLUDE_BINARY = 1 << 2;
        /// Keep Pixel Data (7FE0,0010).
        const INCLUDE_PIXEL_DATA = 1 << 3;
        /// Show binary values as ASCII text instead of data URIs.
        const CONVERT_BINARY_TO_ASCII = 1 << 4;
        /// Show binary values as null.
        const CONVERT_BINARY_TO_NULL = 1 << 5;
    }
}

impl Default for DicomToJsonFlags {
    fn default() -> Self {
        DicomToJsonFlags::INCLUDE_BINARY
            | DicomToJsonFlags::INCLUDE_PIXEL_DATA
            | DicomToJsonFlags::INCLUDE_PRIVATE_TAGS
            | DicomToJsonFlags::INCLUDE_UNKNOWN_TAGS
            | DicomToJsonFlags::CONVERT_BINARY_TO_NULL
    }
}

/// Flags are written as the list of their names.
impl Serialize for DicomToJsonFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(None)?;
        for (name, _) in self.iter_names() {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for DicomToJsonFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(DicomToJsonFlags::empty(), |flags, name| {
            DicomToJsonFlags::from_name(name)
                .map(|flag| flags | flag)
                .ok_or_else(|| D::Error::custom(format!("unknown flag `{}`", name)))
        })
    }
}

/// Options for turning a data set into a document.
///
/// ```
/// # use dcmbridge_core::Tag;
/// # use dcmbridge_json::{DicomToJsonFlags, DicomToJsonFormat, ToJsonOptions};
/// let options = ToJsonOptions::new()
///     .format(DicomToJsonFormat::Short)
///     .flags(DicomToJsonFlags::empty())
///     .max_string_length(256)
///     .ignore_length(Tag(0x0010, 0x0010));
/// assert!(options.ignore_length.contains(&Tag(0x0010, 0x0010)));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToJsonOptions {
    /// the shape of the document
    pub format: DicomToJsonFormat,
    /// element filtering and binary rendering
    pub flags: DicomToJsonFlags,
    /// strings longer than this many bytes are left out, 0 for no limit
    pub max_string_length: u32,
    /// the encoding of data sets without a Specific Character Set
    #[serde(deserialize_with = "deserialize_encoding")]
    pub default_encoding: Encoding,
    /// tags exempt from the string length limit
    #[serde(deserialize_with = "deserialize_tags")]
    pub ignore_length: BTreeSet<Tag>,
    /// the maximum level of sequence nesting
    pub max_depth: usize,
}

impl Default for ToJsonOptions {
    fn default() -> Self {
        ToJsonOptions {
            format: DicomToJsonFormat::default(),
            flags: DicomToJsonFlags::default(),
            max_string_length: 0,
            default_encoding: Encoding::Latin1,
            ignore_length: BTreeSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ToJsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: DicomToJsonFormat) -> Self {
        self.format = format;
        self
    }

    pub fn flags(mut self, flags: DicomToJsonFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn max_string_length(mut self, max_string_length: u32) -> Self {
        self.max_string_length = max_string_length;
        self
    }

    pub fn default_encoding(mut self, encoding: Encoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    /// Exempt one more tag from the string length limit.
    pub fn ignore_length(mut self, tag: Tag) -> Self {
        self.ignore_length.insert(tag);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Options for building a data set from a document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FromJsonOptions {
    /// fill in the patient, study, series and instance identifiers
    /// which the document leaves out
    pub generate_identifiers: bool,
    /// decode string values given as binary data URIs into raw bytes
    pub decode_data_uri: bool,
    /// the encoding of documents without a Specific Character Set
    #[serde(deserialize_with = "deserialize_encoding")]
    pub default_encoding: Encoding,
    /// the roots of generated UIDs
    pub uid_roots: UidRoots,
    /// the maximum level of sequence nesting
    pub max_depth: usize,
}

impl Default for FromJsonOptions {
    fn default() -> Self {
        FromJsonOptions {
            generate_identifiers: false,
            decode_data_uri: true,
            default_encoding: Encoding::Latin1,
            uid_roots: UidRoots::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FromJsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_identifiers(mut self, generate_identifiers: bool) -> Self {
        self.generate_identifiers = generate_identifiers;
        self
    }

    pub fn decode_data_uri(mut self, decode_data_uri: bool) -> Self {
        self.decode_data_uri = decode_data_uri;
        self
    }

    pub fn default_encoding(mut self, encoding: Encoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    pub fn uid_roots(mut self, uid_roots: UidRoots) -> Self {
        self.uid_roots = uid_roots;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn deserialize_encoding<'de, D>(deserializer: D) -> Result<Encoding, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    name.parse().map_err(D::Error::custom)
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeSet<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|text| text.parse::<Tag>().map_err(D::Error::custom))
        .collect()
}
