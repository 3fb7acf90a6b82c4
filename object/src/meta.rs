//! Module containing data structures and readers of DICOM file meta information tables.
use crate::mem::{InMemDicomObject, InMemElement};
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};
use dcmbridge_core::header::HasLength;
use dcmbridge_core::value::PrimitiveValue;
use dcmbridge_core::{dicom_value, DataElement, Length, Tag, VR};
use dcmbridge_dictionary_std::tags;
use dcmbridge_encoding::decode::{self, file_header_decoder, Decode};
use dcmbridge_encoding::encode::explicit::ExplicitVREncoder;
use dcmbridge_encoding::encode::{self, primitive_value::encoded_len, Encode};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::{Read, Write};

/// The magic code which precedes the file meta group.
pub const DICM_MAGIC_CODE: [u8; 4] = *b"DICM";

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The file meta group parser could not read
    /// the magic code `DICM` from its source.
    #[snafu(display("Could not start reading DICOM data"))]
    ReadMagicCode {
        backtrace: Backtrace,
        source: std::io::Error,
    },

    /// The magic code could not be written.
    #[snafu(display("Could not write the magic code"))]
    WriteMagicCode {
        backtrace: Backtrace,
        source: std::io::Error,
    },

    /// Invalid DICOM data, detected from checking the `DICM` code.
    #[snafu(display("Invalid DICOM data"))]
    NotDicom { backtrace: Backtrace },

    /// An issue occurred while decoding the next data element
    /// in the file meta data set.
    #[snafu(display("Could not decode data element"))]
    DecodeElement {
        #[snafu(backtrace)]
        source: decode::Error,
    },

    /// A data element with an unexpected tag was retrieved:
    /// the parser was expecting another tag first,
    /// or at least one that is part of the the file meta group.
    #[snafu(display("Unexpected data element tagged {}", tag))]
    UnexpectedTag { tag: Tag, backtrace: Backtrace },

    /// A required file meta data element is missing.
    #[snafu(display("Missing data element `{}`", alias))]
    MissingElement {
        alias: &'static str,
        backtrace: Backtrace,
    },

    /// The value length of a data elements in the file meta group
    /// was unexpected.
    #[snafu(display("Unexpected length {} for data element tagged {}", length, tag))]
    UnexpectedDataValueLength {
        tag: Tag,
        length: Length,
        backtrace: Backtrace,
    },

    /// The value length of a data element is undefined,
    /// but knowing the length is required in its context.
    #[snafu(display("Undefined value length for data element tagged {}", tag))]
    UndefinedValueLength { tag: Tag, backtrace: Backtrace },

    /// The file meta group could not be written.
    #[snafu(display("Could not write file meta group"))]
    WriteElement {
        #[snafu(backtrace)]
        source: encode::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// DICOM File Meta Information Table.
///
/// This data type contains the relevant parts of the file meta information table.
/// Text values are kept without their trailing padding.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    /// File Meta Information Group Length
    pub information_group_length: u32,
    /// File Meta Information Version
    pub information_version: [u8; 2],
    /// Media Storage SOP Class UID
    pub media_storage_sop_class_uid: String,
    /// Media Storage SOP Instance UID
    pub media_storage_sop_instance_uid: String,
    /// Transfer Syntax UID
    pub transfer_syntax: String,
    /// Implementation Class UID
    pub implementation_class_uid: String,

    /// Implementation Version Name
    pub implementation_version_name: Option<String>,
    /// Source Application Entity Title
    pub source_application_entity_title: Option<String>,
    /// Sending Application Entity Title
    pub sending_application_entity_title: Option<String>,
    /// Receiving Application Entity Title
    pub receiving_application_entity_title: Option<String>,
    /// Private Information Creator UID
    pub private_information_creator_uid: Option<String>,
    /// Private Information
    pub private_information: Option<Vec<u8>>,
}

fn text_of(tag: Tag, value: &PrimitiveValue) -> Result<String> {
    match value {
        PrimitiveValue::Empty => Ok(String::new()),
        PrimitiveValue::Text(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => UnexpectedDataValueLengthSnafu {
            tag,
            length: Length(value.byte_len() as u32),
        }
        .fail(),
    }
}

fn bytes_of(value: &PrimitiveValue) -> Vec<u8> {
    match value {
        PrimitiveValue::Empty => Vec::new(),
        PrimitiveValue::U8(bytes) => bytes.to_vec(),
        other => other.to_le_bytes(),
    }
}

impl FileMetaTable {
    /// Read the file meta group from the given source,
    /// starting at the `DICM` magic code.
    ///
    /// The source is left at the first byte after the group.
    pub fn from_reader<R: Read>(mut file: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).context(ReadMagicCodeSnafu)?;
        ensure!(magic == DICM_MAGIC_CODE, NotDicomSnafu);
        Self::read_group(&mut file)
    }

    fn read_group(source: &mut dyn Read) -> Result<Self> {
        let decoder = file_header_decoder();

        let (header, _) = decoder.decode_header(source).context(DecodeElementSnafu)?;
        ensure!(
            header.tag == tags::FILE_META_INFORMATION_GROUP_LENGTH,
            UnexpectedTagSnafu { tag: header.tag }
        );
        ensure!(
            header.length() == Length(4),
            UnexpectedDataValueLengthSnafu {
                tag: header.tag,
                length: header.length(),
            }
        );
        let group_length = decoder
            .read_value(source, &header)
            .context(DecodeElementSnafu)?
            .to_i64s()
            .and_then(|v| v.first().copied())
            .unwrap_or(0) as u32;

        let mut builder = FileMetaTableBuilder::new().group_length(group_length);
        let mut remaining = group_length as usize;
        while remaining > 0 {
            let (header, header_len) =
                decoder.decode_header(source).context(DecodeElementSnafu)?;
            let tag = header.tag;
            let len = header
                .length()
                .get()
                .context(UndefinedValueLengthSnafu { tag })? as usize;
            ensure!(
                header_len + len <= remaining,
                UnexpectedDataValueLengthSnafu {
                    tag,
                    length: header.length(),
                }
            );
            remaining -= header_len + len;

            let value = decoder
                .read_value(source, &header)
                .context(DecodeElementSnafu)?;
            builder = match tag {
                tags::FILE_META_INFORMATION_VERSION => {
                    let bytes = bytes_of(&value);
                    ensure!(
                        bytes.len() == 2,
                        UnexpectedDataValueLengthSnafu {
                            tag,
                            length: header.length(),
                        }
                    );
                    builder.information_version([bytes[0], bytes[1]])
                }
                tags::MEDIA_STORAGE_SOP_CLASS_UID => {
                    builder.media_storage_sop_class_uid(text_of(tag, &value)?)
                }
                tags::MEDIA_STORAGE_SOP_INSTANCE_UID => {
                    builder.media_storage_sop_instance_uid(text_of(tag, &value)?)
                }
                tags::TRANSFER_SYNTAX_UID => builder.transfer_syntax(text_of(tag, &value)?),
                tags::IMPLEMENTATION_CLASS_UID => {
                    builder.implementation_class_uid(text_of(tag, &value)?)
                }
                tags::IMPLEMENTATION_VERSION_NAME => {
                    builder.implementation_version_name(text_of(tag, &value)?)
                }
                tags::SOURCE_APPLICATION_ENTITY_TITLE => {
                    builder.source_application_entity_title(text_of(tag, &value)?)
                }
                tags::SENDING_APPLICATION_ENTITY_TITLE => {
                    builder.sending_application_entity_title(text_of(tag, &value)?)
                }
                tags::RECEIVING_APPLICATION_ENTITY_TITLE => {
                    builder.receiving_application_entity_title(text_of(tag, &value)?)
                }
                tags::PRIVATE_INFORMATION_CREATOR_UID => {
                    builder.private_information_creator_uid(text_of(tag, &value)?)
                }
                tags::PRIVATE_INFORMATION => builder.private_information(bytes_of(&value)),
                tag if tag.group() == 0x0002 => {
                    tracing::debug!("Ignoring file meta element {}", tag);
                    builder
                }
                tag => return UnexpectedTagSnafu { tag }.fail(),
            };
        }

        builder.build()
    }

    /// Obtain the data elements of the file meta group,
    /// in ascending tag order, with the group length element first.
    pub fn to_element_vec(&self) -> Vec<InMemElement> {
        let mut elements = vec![DataElement::new(
            tags::FILE_META_INFORMATION_GROUP_LENGTH,
            VR::UL,
            dicom_value!(U32, [self.information_group_length]),
        )];
        elements.extend(self.group_elements());
        elements
    }

    /// Collect the file meta group into a new data set,
    /// as used for presenting the header of a file.
    pub fn to_object(&self) -> InMemDicomObject {
        InMemDicomObject::from_element_iter(self.to_element_vec())
    }

    /// The elements of the group, excluding the group length.
    fn group_elements(&self) -> Vec<InMemElement> {
        let mut elements = vec![
            DataElement::new(
                tags::FILE_META_INFORMATION_VERSION,
                VR::OB,
                PrimitiveValue::from(&self.information_version[..]),
            ),
            DataElement::new(
                tags::MEDIA_STORAGE_SOP_CLASS_UID,
                VR::UI,
                self.media_storage_sop_class_uid.as_str(),
            ),
            DataElement::new(
                tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
                VR::UI,
                self.media_storage_sop_instance_uid.as_str(),
            ),
            DataElement::new(
                tags::TRANSFER_SYNTAX_UID,
                VR::UI,
                self.transfer_syntax.as_str(),
            ),
            DataElement::new(
                tags::IMPLEMENTATION_CLASS_UID,
                VR::UI,
                self.implementation_class_uid.as_str(),
            ),
        ];
        let optional = [
            (
                tags::IMPLEMENTATION_VERSION_NAME,
                VR::SH,
                &self.implementation_version_name,
            ),
            (
                tags::SOURCE_APPLICATION_ENTITY_TITLE,
                VR::AE,
                &self.source_application_entity_title,
            ),
            (
                tags::SENDING_APPLICATION_ENTITY_TITLE,
                VR::AE,
                &self.sending_application_entity_title,
            ),
            (
                tags::RECEIVING_APPLICATION_ENTITY_TITLE,
                VR::AE,
                &self.receiving_application_entity_title,
            ),
            (
                tags::PRIVATE_INFORMATION_CREATOR_UID,
                VR::UI,
                &self.private_information_creator_uid,
            ),
        ];
        for (tag, vr, value) in optional {
            if let Some(value) = value {
                elements.push(DataElement::new(tag, vr, value.as_str()));
            }
        }
        if let Some(info) = &self.private_information {
            elements.push(DataElement::new(
                tags::PRIVATE_INFORMATION,
                VR::OB,
                PrimitiveValue::from(&info[..]),
            ));
        }
        elements
    }

    /// The number of bytes of the encoded group,
    /// including the magic code and the group length element.
    pub fn encoded_len(&self) -> usize {
        4 + 12 + self.information_group_length as usize
    }

    /// Write the magic code and the file meta group to the given writer.
    /// Returns the number of bytes written.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<usize> {
        let encoder = ExplicitVREncoder::little_endian();
        writer
            .write_all(&DICM_MAGIC_CODE)
            .context(WriteMagicCodeSnafu)?;
        let mut written = DICM_MAGIC_CODE.len();
        for elt in self.to_element_vec() {
            if let Some(value) = elt.value().primitive() {
                written += encoder
                    .encode_element(&mut writer, elt.tag(), elt.vr(), value)
                    .context(WriteElementSnafu)?;
            }
        }
        Ok(written)
    }
}

/// Compute the value of the group length element
/// for the given group elements.
fn group_length_of(elements: &[InMemElement]) -> u32 {
    elements
        .iter()
        .filter_map(|e| e.value().primitive().map(|v| (e.vr(), v)))
        .map(|(vr, v)| {
            let header_len = if vr.has_short_length() { 8 } else { 12 };
            header_len + encoded_len(v)
        })
        .sum::<usize>() as u32
}

/// A builder for DICOM meta information tables.
#[derive(Debug, Default, Clone)]
pub struct FileMetaTableBuilder {
    /// File Meta Information Group Length (UL)
    information_group_length: Option<u32>,
    /// File Meta Information Version (OB)
    information_version: Option<[u8; 2]>,
    /// Media Storage SOP Class UID (UI)
    media_storage_sop_class_uid: Option<String>,
    /// Media Storage SOP Instance UID (UI)
    media_storage_sop_instance_uid: Option<String>,
    /// Transfer Syntax UID (UI)
    transfer_syntax: Option<String>,
    /// Implementation Class UID (UI)
    implementation_class_uid: Option<String>,

    /// Implementation Version Name (SH)
    implementation_version_name: Option<String>,
    /// Source Application Entity Title (AE)
    source_application_entity_title: Option<String>,
    /// Sending Application Entity Title (AE)
    sending_application_entity_title: Option<String>,
    /// Receiving Application Entity Title (AE)
    receiving_application_entity_title: Option<String>,
    /// Private Information Creator UID (UI)
    private_information_creator_uid: Option<String>,
    /// Private Information (OB)
    private_information: Option<Vec<u8>>,
}

impl FileMetaTableBuilder {
    /// Create a new, empty builder.
    pub fn new() -> FileMetaTableBuilder {
        FileMetaTableBuilder::default()
    }

    /// Define the meta information group length.
    /// When absent, it is computed from the other fields.
    pub fn group_length(mut self, value: u32) -> FileMetaTableBuilder {
        self.information_group_length = Some(value);
        self
    }

    /// Define the meta information version.
    pub fn information_version(mut self, value: [u8; 2]) -> FileMetaTableBuilder {
        self.information_version = Some(value);
        self
    }

    /// Define the media storage SOP class UID.
    pub fn media_storage_sop_class_uid<T: Into<String>>(mut self, value: T) -> FileMetaTableBuilder {
        self.media_storage_sop_class_uid = Some(value.into());
        self
    }

    /// Define the media storage SOP instance UID.
    pub fn media_storage_sop_instance_uid<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.media_storage_sop_instance_uid = Some(value.into());
        self
    }

    /// Define the transfer syntax UID.
    pub fn transfer_syntax<T: Into<String>>(mut self, value: T) -> FileMetaTableBuilder {
        self.transfer_syntax = Some(value.into());
        self
    }

    /// Define the implementation class UID.
    pub fn implementation_class_uid<T: Into<String>>(mut self, value: T) -> FileMetaTableBuilder {
        self.implementation_class_uid = Some(value.into());
        self
    }

    /// Define the implementation version name.
    pub fn implementation_version_name<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.implementation_version_name = Some(value.into());
        self
    }

    /// Define the source application entity title.
    pub fn source_application_entity_title<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.source_application_entity_title = Some(value.into());
        self
    }

    /// Define the sending application entity title.
    pub fn sending_application_entity_title<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.sending_application_entity_title = Some(value.into());
        self
    }

    /// Define the receiving application entity title.
    pub fn receiving_application_entity_title<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.receiving_application_entity_title = Some(value.into());
        self
    }

    /// Define the private information creator UID.
    pub fn private_information_creator_uid<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.private_information_creator_uid = Some(value.into());
        self
    }

    /// Define the private information as a vector of bytes.
    pub fn private_information<T: Into<Vec<u8>>>(mut self, value: T) -> FileMetaTableBuilder {
        self.private_information = Some(value.into());
        self
    }

    /// Build the table.
    ///
    /// The implementation class UID and version name
    /// default to those of this library.
    pub fn build(self) -> Result<FileMetaTable> {
        // Missing information version, assume (00H, 01H)
        let information_version = self.information_version.unwrap_or([0, 1]);
        let media_storage_sop_class_uid =
            self.media_storage_sop_class_uid
                .context(MissingElementSnafu {
                    alias: "MediaStorageSOPClassUID",
                })?;
        let media_storage_sop_instance_uid =
            self.media_storage_sop_instance_uid
                .context(MissingElementSnafu {
                    alias: "MediaStorageSOPInstanceUID",
                })?;
        let transfer_syntax = self.transfer_syntax.context(MissingElementSnafu {
            alias: "TransferSyntax",
        })?;
        let (implementation_class_uid, implementation_version_name) =
            match self.implementation_class_uid {
                Some(uid) => (uid, self.implementation_version_name),
                None => (
                    IMPLEMENTATION_CLASS_UID.to_string(),
                    self.implementation_version_name
                        .or_else(|| Some(IMPLEMENTATION_VERSION_NAME.to_string())),
                ),
            };

        let mut table = FileMetaTable {
            information_group_length: 0,
            information_version,
            media_storage_sop_class_uid,
            media_storage_sop_instance_uid,
            transfer_syntax,
            implementation_class_uid,
            implementation_version_name,
            source_application_entity_title: self.source_application_entity_title,
            sending_application_entity_title: self.sending_application_entity_title,
            receiving_application_entity_title: self.receiving_application_entity_title,
            private_information_creator_uid: self.private_information_creator_uid,
            private_information: self.private_information,
        };
        table.information_group_length = self
            .information_group_length
            .unwrap_or_else(|| group_length_of(&table.group_elements()));
        Ok(table)
    }
}
