//! Module containing the DICOM Transfer Syntax data structure and related methods.
//!
//! A [`TransferSyntax`] describes how a data set is laid out in binary form:
//! the byte order, whether value representations are explicit,
//! and whether the pixel data or the whole data set
//! is subject to a codec.
//! The [`TransferSyntaxRegistry`] lists every transfer syntax known here
//! and produces the matching decoder and encoder at run-time.

use crate::decode::explicit::ExplicitVRDecoder;
use crate::decode::implicit_le::ImplicitVRLittleEndianDecoder;
use crate::decode::Decode;
use crate::encode::explicit::ExplicitVREncoder;
use crate::encode::implicit_le::ImplicitVRLittleEndianEncoder;
use crate::encode::Encode;
use byteordered::Endianness;
use dcmbridge_core::dictionary::DataDictionary;
use dcmbridge_dictionary_std::uids;

/// A decoder with its type erased.
pub type DynDecoder<'d> = Box<dyn Decode + 'd>;

/// An encoder with its type erased.
pub type DynEncoder = Box<dyn Encode>;

/// The codec requirements of a transfer syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// No codec is required for this transfer syntax.
    None,
    /// Pixel data is encapsulated in compressed fragments,
    /// which are carried through untouched.
    EncapsulatedPixelData,
    /// The whole data set is compressed,
    /// which this library does not support.
    Dataset,
}

/// A DICOM transfer syntax specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntax {
    /// The unique identifier of the transfer syntax.
    uid: &'static str,
    /// The name of the transfer syntax.
    name: &'static str,
    /// The byte order of data.
    byte_order: Endianness,
    /// Whether the transfer syntax mandates an explicit value representation,
    /// or the VR is implicit.
    explicit_vr: bool,
    /// The transfer syntax' requirements.
    codec: Codec,
}

impl TransferSyntax {
    /// Create a new transfer syntax descriptor.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        byte_order: Endianness,
        explicit_vr: bool,
        codec: Codec,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            byte_order,
            explicit_vr,
            codec,
        }
    }

    /// Obtain this transfer syntax' unique identifier.
    pub const fn uid(&self) -> &'static str {
        self.uid
    }

    /// Obtain the name of this transfer syntax.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Obtain this transfer syntax' expected endianness.
    pub const fn endianness(&self) -> Endianness {
        self.byte_order
    }

    /// Whether value representations are written next to each tag.
    pub const fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Obtain this transfer syntax' codec specification.
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Check whether data sets in this transfer syntax
    /// can be read and written.
    pub fn is_supported(&self) -> bool {
        self.codec != Codec::Dataset
    }

    /// Check whether the pixel data is encapsulated.
    pub fn is_encapsulated_pixel_data(&self) -> bool {
        self.codec == Codec::EncapsulatedPixelData
    }

    /// Retrieve the appropriate data element decoder for this transfer syntax.
    /// The dictionary resolves value representations when they are implicit.
    ///
    /// Returns `None` if the transfer syntax is not supported.
    pub fn decoder<'d, D>(&self, dict: D) -> Option<DynDecoder<'d>>
    where
        D: DataDictionary + 'd,
    {
        if !self.is_supported() {
            return None;
        }
        let decoder: DynDecoder<'d> = match (self.byte_order, self.explicit_vr) {
            (Endianness::Little, false) => Box::new(ImplicitVRLittleEndianDecoder::with_dict(dict)),
            (Endianness::Little, true) => Box::new(ExplicitVRDecoder::little_endian()),
            (Endianness::Big, true) => Box::new(ExplicitVRDecoder::big_endian()),
            (Endianness::Big, false) => return None,
        };
        Some(decoder)
    }

    /// Retrieve the appropriate data element encoder for this transfer syntax.
    ///
    /// Returns `None` if the transfer syntax is not supported.
    pub fn encoder(&self) -> Option<DynEncoder> {
        if !self.is_supported() {
            return None;
        }
        let encoder: DynEncoder = match (self.byte_order, self.explicit_vr) {
            (Endianness::Little, false) => Box::<ImplicitVRLittleEndianEncoder>::default(),
            (Endianness::Little, true) => Box::new(ExplicitVREncoder::little_endian()),
            (Endianness::Big, true) => Box::new(ExplicitVREncoder::big_endian()),
            (Endianness::Big, false) => return None,
        };
        Some(encoder)
    }
}

const fn native(
    uid: &'static str,
    name: &'static str,
    byte_order: Endianness,
    explicit_vr: bool,
) -> TransferSyntax {
    TransferSyntax::new(uid, name, byte_order, explicit_vr, Codec::None)
}

const fn encapsulated(uid: &'static str, name: &'static str) -> TransferSyntax {
    TransferSyntax::new(uid, name, Endianness::Little, true, Codec::EncapsulatedPixelData)
}

/// Implicit VR Little Endian,
/// the default transfer syntax of DICOM.
pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = native(
    uids::IMPLICIT_VR_LITTLE_ENDIAN,
    "Implicit VR Little Endian",
    Endianness::Little,
    false,
);

/// Explicit VR Little Endian.
pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = native(
    uids::EXPLICIT_VR_LITTLE_ENDIAN,
    "Explicit VR Little Endian",
    Endianness::Little,
    true,
);

/// Explicit VR Big Endian (retired).
#[allow(deprecated)]
pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = native(
    uids::EXPLICIT_VR_BIG_ENDIAN,
    "Explicit VR Big Endian",
    Endianness::Big,
    true,
);

static ENTRIES: [TransferSyntax; 13] = [
    IMPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_BIG_ENDIAN,
    TransferSyntax::new(
        uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        "Deflated Explicit VR Little Endian",
        Endianness::Little,
        true,
        Codec::Dataset,
    ),
    encapsulated(uids::JPEG_BASELINE8_BIT, "JPEG Baseline (Process 1)"),
    encapsulated(uids::JPEG_EXTENDED12_BIT, "JPEG Extended (Process 2 & 4)"),
    encapsulated(uids::JPEG_LOSSLESS, "JPEG Lossless, Non-Hierarchical (Process 14)"),
    encapsulated(
        uids::JPEG_LOSSLESS_SV1,
        "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
    ),
    encapsulated(uids::JPEG_LS_LOSSLESS, "JPEG-LS Lossless Image Compression"),
    encapsulated(uids::JPEG_LS_NEAR_LOSSLESS, "JPEG-LS Lossy (Near-Lossless) Image Compression"),
    encapsulated(uids::JPEG2000_LOSSLESS, "JPEG 2000 Image Compression (Lossless Only)"),
    encapsulated(uids::JPEG2000, "JPEG 2000 Image Compression"),
    encapsulated(uids::RLE_LOSSLESS, "RLE Lossless"),
];

/// The index of all transfer syntaxes known to this library.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntaxRegistry;

impl TransferSyntaxRegistry {
    /// Obtain a DICOM transfer syntax by its respective UID.
    ///
    /// Trailing null characters and spaces in `uid` are ignored.
    ///
    /// ```
    /// # use dcmbridge_encoding::TransferSyntaxRegistry;
    /// let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2.1\0").unwrap();
    /// assert_eq!(ts.name(), "Explicit VR Little Endian");
    /// ```
    pub fn get(&self, uid: &str) -> Option<&'static TransferSyntax> {
        let uid = uid.trim_end_matches(|c| c == '\0' || c == ' ');
        ENTRIES.iter().find(|ts| ts.uid == uid)
    }

    /// Iterate over all known transfer syntaxes.
    pub fn iter(&self) -> impl Iterator<Item = &'static TransferSyntax> {
        ENTRIES.iter()
    }
}
