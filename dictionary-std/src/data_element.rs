//! The mutable attribute dictionary registry.
//!
//! A [`DataDictionaryRegistry`] is created explicitly by the host,
//! usually once at start-up through [`DataDictionaryRegistry::with_standard_entries`],
//! and then shared by reference with everything that needs attribute lookups.
//! Every query and every mutation holds the registry lock
//! for its own duration only.

use crate::source::{parse_source, SourceEntry};
use crate::tags;
use dcmbridge_core::dictionary::{
    DataDictionary, DictionaryEntryBuf, Multiplicity, TagRange, UNKNOWN_TAG_NAME,
};
use dcmbridge_core::{Tag, VR};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use snafu::{ensure, Backtrace, OptionExt, Snafu};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// The embedded source of the standard data dictionary.
pub const STANDARD_DICTIONARY_SOURCE: &str = include_str!("../data/dicom.dic");

/// The embedded source of the private data dictionary.
pub const PRIVATE_DICTIONARY_SOURCE: &str = include_str!("../data/private.dic");

/// Error type for dictionary registration and queries.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The multiplicity bounds are out of range.
    #[snafu(display(
        "Invalid multiplicity {}-{} for tag {}: the minimum must be at least 1 and not exceed a non-zero maximum",
        min,
        max,
        tag
    ))]
    InvalidMultiplicity {
        tag: Tag,
        min: u32,
        max: u32,
        backtrace: Backtrace,
    },
    /// A private creator was given for a tag outside the private groups.
    #[snafu(display(
        "Trying to register private tag {}, but it must have an odd group >= 0x0009",
        tag
    ))]
    InvalidPrivateGroup { tag: Tag, backtrace: Backtrace },
    /// The symbolic name is already taken.
    #[snafu(display("Cannot register two tags with the same symbolic name \"{}\"", name))]
    AlreadyExistingTag { name: String, backtrace: Backtrace },
    /// The text is neither a hexadecimal tag nor a known name.
    #[snafu(display("Unknown DICOM tag: \"{}\"", name))]
    UnknownTag { name: String, backtrace: Backtrace },
    /// A dictionary source line could not be parsed.
    #[snafu(display("Malformed dictionary source at line {}: {}", line, reason))]
    ParseSource {
        line: usize,
        reason: String,
        backtrace: Backtrace,
    },
    /// The loaded dictionary does not describe a well known attribute as expected.
    #[snafu(display(
        "The DICOM dictionary has not been correctly loaded: {} should be {}, found {:?}",
        tag,
        expected,
        found
    ))]
    Misconfigured {
        tag: Tag,
        expected: VR,
        found: Option<VR>,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Generic Group Length dictionary entry.
static GROUP_LENGTH_ENTRY: Lazy<DictionaryEntryBuf> = Lazy::new(|| DictionaryEntryBuf {
    tag: TagRange::GroupLength,
    alias: "GenericGroupLength".to_string(),
    vr: VR::UL,
    vm: Multiplicity::ONE,
    private_creator: None,
    virtual_vr: None,
});

/// Generic Private Creator dictionary entry.
static PRIVATE_CREATOR_ENTRY: Lazy<DictionaryEntryBuf> = Lazy::new(|| DictionaryEntryBuf {
    tag: TagRange::PrivateCreator,
    alias: "PrivateCreator".to_string(),
    vr: VR::LO,
    vm: Multiplicity::ONE,
    private_creator: None,
    virtual_vr: None,
});

/// The indexed entries, only reachable through the registry lock.
#[derive(Debug, Default)]
struct Entries {
    /// mapping: tag → public entry
    by_tag: HashMap<Tag, DictionaryEntryBuf>,
    /// mapping: name → entry
    by_name: HashMap<String, DictionaryEntryBuf>,
    /// repeating elements of the form (ggxx,eeee) or (gggg,eexx)
    repeating: Vec<DictionaryEntryBuf>,
    /// mapping: (tag, creator) → private entry
    private: HashMap<(Tag, String), DictionaryEntryBuf>,
    /// mapping: (group, element offset, creator) → private entry
    private_relative: HashMap<(u16, u8, String), DictionaryEntryBuf>,
}

impl Entries {
    fn len(&self) -> usize {
        self.by_tag.len() + self.repeating.len() + self.private.len() + self.private_relative.len()
    }

    fn index(&mut self, SourceEntry { entry, block_relative }: SourceEntry) {
        if !self.by_name.contains_key(&entry.alias) {
            self.by_name.insert(entry.alias.clone(), entry.clone());
        }
        match (entry.private_creator.clone(), entry.tag) {
            (Some(creator), TagRange::Single(tag)) if block_relative => {
                self.private_relative
                    .insert((tag.group(), tag.element() as u8, creator), entry);
            }
            (Some(creator), TagRange::Single(tag)) => {
                self.private.insert((tag, creator), entry);
            }
            (None, TagRange::Single(tag)) => {
                self.by_tag.insert(tag, entry);
            }
            _ => self.repeating.push(entry),
        }
    }

    fn public(&self, tag: Tag) -> Option<DictionaryEntryBuf> {
        self.by_tag
            .get(&tag)
            .or_else(|| self.repeating.iter().find(|e| e.tag.contains(tag)))
            .or_else(|| {
                if tag.is_private_creator() {
                    Some(&*PRIVATE_CREATOR_ENTRY)
                } else if tag.is_group_length() {
                    Some(&*GROUP_LENGTH_ENTRY)
                } else {
                    None
                }
            })
            .cloned()
    }

    fn private(&self, tag: Tag, creator: &str) -> Option<DictionaryEntryBuf> {
        self.private
            .get(&(tag, creator.to_string()))
            .or_else(|| {
                if tag.element() >= 0x1000 {
                    self.private_relative
                        .get(&(tag.group(), tag.element() as u8, creator.to_string()))
                } else {
                    None
                }
            })
            .cloned()
    }
}

/// A data element dictionary which can be extended at run-time.
///
/// The registry starts empty.
/// Entries are added from dictionary sources ([`load`](Self::load))
/// or one by one ([`register`](Self::register)),
/// and are never removed except by reloading.
/// The registry implements [`DataDictionary`]
/// and can be shared between threads.
pub struct DataDictionaryRegistry {
    entries: Mutex<Entries>,
}

impl fmt::Debug for DataDictionaryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DataDictionaryRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl Default for DataDictionaryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DataDictionaryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        DataDictionaryRegistry {
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Create a registry with the embedded standard dictionary,
    /// and optionally the embedded private dictionary.
    ///
    /// The result is checked against a well known attribute,
    /// Patient's Weight, which must be described as a decimal string.
    pub fn with_standard_entries(include_private: bool) -> Result<Self> {
        let registry = Self::new();
        registry.load(STANDARD_DICTIONARY_SOURCE)?;
        if include_private {
            registry.load_additional(PRIVATE_DICTIONARY_SOURCE)?;
        }
        registry.check_sanity()?;
        Ok(registry)
    }

    /// Clear the registry and load all entries from the given source.
    ///
    /// On error, the registry is left empty.
    pub fn load(&self, source: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        *entries = Entries::default();
        let parsed = parse_source(source)?;
        let count = parsed.len();
        parsed.into_iter().for_each(|e| entries.index(e));
        debug!("Loaded {} entries into the DICOM dictionary", count);
        Ok(())
    }

    /// Load all entries from the given source
    /// on top of the existing ones.
    ///
    /// Nothing is added if the source is malformed.
    pub fn load_additional(&self, source: &str) -> Result<()> {
        let parsed = parse_source(source)?;
        let count = parsed.len();
        let mut entries = self.entries.lock();
        parsed.into_iter().for_each(|e| entries.index(e));
        debug!("Loaded {} additional entries into the DICOM dictionary", count);
        Ok(())
    }

    /// Register a single attribute.
    ///
    /// - `min_multiplicity` must be at least 1;
    ///   `max_multiplicity` is either 0 (unbounded)
    ///   or not smaller than the minimum.
    /// - Giving a private creator requires a private tag
    ///   (odd group other than 0001, 0003, 0005, 0007 and FFFF).
    ///   An odd group tag without a private creator is accepted with a warning.
    /// - The name must not be in use already.
    pub fn register(
        &self,
        tag: Tag,
        vr: VR,
        name: &str,
        min_multiplicity: u32,
        max_multiplicity: u32,
        private_creator: Option<&str>,
    ) -> Result<()> {
        ensure!(
            min_multiplicity >= 1
                && (max_multiplicity == 0 || max_multiplicity >= min_multiplicity),
            InvalidMultiplicitySnafu {
                tag,
                min: min_multiplicity,
                max: max_multiplicity
            }
        );

        let private_creator = private_creator.filter(|creator| !creator.is_empty());
        match private_creator {
            None if tag.group() % 2 == 1 => {
                warn!(
                    "Registering private tag {} without an associated private creator",
                    tag
                );
            }
            Some(_) => ensure!(tag.is_private(), InvalidPrivateGroupSnafu { tag }),
            None => {}
        }

        let vm = Multiplicity::new(
            min_multiplicity,
            if max_multiplicity == 0 {
                None
            } else {
                Some(max_multiplicity)
            },
        );

        let mut entries = self.entries.lock();
        ensure!(
            !entries.by_name.contains_key(name),
            AlreadyExistingTagSnafu { name }
        );

        info!(
            "Registering tag in dictionary: {} {} {} (multiplicity: {})",
            tag, vr, name, vm
        );

        entries.index(SourceEntry {
            entry: DictionaryEntryBuf {
                tag: TagRange::Single(tag),
                alias: name.to_string(),
                vr,
                vm,
                private_creator: private_creator.map(str::to_string),
                virtual_vr: None,
            },
            block_relative: false,
        });
        Ok(())
    }

    /// The number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the tag of an attribute by its symbolic name.
    pub fn tag_by_name(&self, name: &str) -> Option<Tag> {
        self.entries.lock().by_name.get(name).map(|e| e.tag())
    }

    /// Parse a tag from either its hexadecimal form
    /// (`gggg,eeee` or `ggggeeee`) or its symbolic name.
    pub fn parse_tag(&self, text: &str) -> Result<Tag> {
        if let Ok(tag) = text.parse() {
            return Ok(tag);
        }
        self.tag_by_name(text).context(UnknownTagSnafu { name: text })
    }

    /// Obtain the symbolic name of a tag,
    /// resolving private tags through their private creator.
    /// Tags with no entry are named `"Unknown Tag & Data"`.
    pub fn tag_name(&self, tag: Tag, private_creator: Option<&str>) -> String {
        self.by_tag_with_creator(tag, private_creator)
            .map(|e| e.alias)
            .unwrap_or_else(|| UNKNOWN_TAG_NAME.to_string())
    }

    /// Obtain the public value representation of a tag,
    /// or `UN` if the tag is unknown.
    pub fn lookup_vr(&self, tag: Tag) -> VR {
        self.by_tag(tag).map(|e| e.vr).unwrap_or(VR::UN)
    }

    /// Check whether the tag is missing from the public dictionary.
    pub fn is_unknown_tag(&self, tag: Tag) -> bool {
        self.by_tag(tag).is_none()
    }

    fn check_sanity(&self) -> Result<()> {
        let found = self.by_tag(tags::PATIENT_WEIGHT).map(|e| e.vr);
        ensure!(
            found == Some(VR::DS),
            MisconfiguredSnafu {
                tag: tags::PATIENT_WEIGHT,
                expected: VR::DS,
                found
            }
        );
        Ok(())
    }
}

impl DataDictionary for DataDictionaryRegistry {
    fn by_name(&self, name: &str) -> Option<DictionaryEntryBuf> {
        self.entries.lock().by_name.get(name).cloned()
    }

    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntryBuf> {
        self.entries.lock().public(tag)
    }

    fn by_private_tag(&self, tag: Tag, private_creator: &str) -> Option<DictionaryEntryBuf> {
        self.entries.lock().private(tag, private_creator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmbridge_core::dictionary::TagRange::*;

    fn standard() -> DataDictionaryRegistry {
        DataDictionaryRegistry::with_standard_entries(true).unwrap()
    }

    // tests for just a few attributes to make sure that the entries
    // were well installed into the registry
    #[test]
    fn smoke_test() {
        let dict = standard();

        assert_eq!(
            dict.by_name("PatientName"),
            Some(DictionaryEntryBuf {
                tag: Single(Tag(0x0010, 0x0010)),
                alias: "PatientName".to_string(),
                vr: VR::PN,
                vm: Multiplicity::ONE,
                private_creator: None,
                virtual_vr: None,
            })
        );

        let modality = dict.by_tag(Tag(0x0008, 0x0060)).unwrap();
        assert_eq!(modality.alias, "Modality");
        assert_eq!(modality.vr, VR::CS);

        let pixel_data = dict
            .by_tag(Tag(0x7FE0, 0x0010))
            .expect("Pixel Data attribute should exist");
        assert_eq!(pixel_data.vr, VR::OW);

        let overlay_data = dict
            .by_tag(Tag(0x6002, 0x3000))
            .expect("Overlay Data attribute should exist");
        assert_eq!(overlay_data.tag, Group100(Tag(0x6000, 0x3000)));
        assert_eq!(overlay_data.alias, "OverlayData");
    }

    #[test]
    fn nuclear_medicine_attributes() {
        let dict = standard();
        let entry = dict.by_tag(Tag(0x0054, 0x0016)).unwrap();
        assert_eq!(entry.alias, "RadiopharmaceuticalInformationSequence");
        assert_eq!(entry.vr, VR::SQ);
        assert_eq!(dict.tag_by_name("RadionuclideTotalDose"), Some(Tag(0x0018, 0x1074)));
        assert_eq!(dict.lookup_vr(Tag(0x0018, 0x1072)), VR::TM);
        assert_eq!(dict.lookup_vr(Tag(0x0054, 0x0300)), VR::SQ);
        assert!(dict.len() > 2000);
    }

    #[test]
    fn generic_entries() {
        let dict = DataDictionaryRegistry::new();
        assert_eq!(dict.by_tag(Tag(0x0009, 0x0010)).unwrap().alias, "PrivateCreator");
        assert_eq!(dict.by_tag(Tag(0x0011, 0x0000)).unwrap().alias, "GenericGroupLength");
        assert!(dict.by_tag(Tag(0x0009, 0x1001)).is_none());
    }

    #[test]
    fn private_entries_need_their_creator() {
        let dict = standard();
        let tag = Tag(0x0029, 0x1010);
        assert!(dict.by_tag(tag).is_none());
        let entry = dict.by_private_tag(tag, "SIEMENS CSA HEADER").unwrap();
        assert_eq!(entry.vr, VR::OB);
        // any reserved block works
        let entry = dict.by_private_tag(Tag(0x0029, 0x1110), "SIEMENS CSA HEADER").unwrap();
        assert_eq!(entry.alias, "SiemensCSAImageHeaderInfo");
        assert!(dict.by_private_tag(tag, "SOMEONE ELSE").is_none());
        assert_eq!(
            dict.tag_name(tag, Some("SIEMENS CSA HEADER")),
            "SiemensCSAImageHeaderInfo"
        );
        assert_eq!(dict.tag_name(tag, None), UNKNOWN_TAG_NAME);
    }

    #[test]
    fn register_private_tag_with_creator() {
        let dict = standard();
        dict.register(Tag(0x0009, 0x0010), VR::LO, "AcmeCreatorSlot", 1, 1, Some("ACME"))
            .unwrap();
        let entry = dict.by_private_tag(Tag(0x0009, 0x0010), "ACME").unwrap();
        assert_eq!(entry.alias, "AcmeCreatorSlot");

        dict.register(Tag(0x0009, 0x1001), VR::DS, "AcmeThickness", 1, 0, Some("ACME"))
            .unwrap();
        let entry = dict.by_private_tag(Tag(0x0009, 0x1001), "ACME").unwrap();
        assert_eq!(entry.vm, Multiplicity::new(1, None));
    }

    #[test]
    fn register_even_group_without_creator() {
        let dict = standard();
        dict.register(Tag(0x0008, 0x0010), VR::SH, "LegacyRecognitionCode", 1, 1, None)
            .unwrap();
        assert_eq!(dict.lookup_vr(Tag(0x0008, 0x0010)), VR::SH);
        assert_eq!(dict.tag_by_name("LegacyRecognitionCode"), Some(Tag(0x0008, 0x0010)));
    }

    #[test]
    fn empty_creator_means_no_creator() {
        let dict = standard();
        dict.register(Tag(0x0008, 0x0010), VR::SH, "LegacyStationCode", 1, 1, Some(""))
            .unwrap();
        assert_eq!(dict.tag_by_name("LegacyStationCode"), Some(Tag(0x0008, 0x0010)));
        let entry = dict.by_tag(Tag(0x0008, 0x0010)).unwrap();
        assert_eq!(entry.alias, "LegacyStationCode");
        assert_eq!(entry.private_creator, None);
    }

    #[test]
    fn register_odd_group_without_creator_is_accepted() {
        let dict = standard();
        dict.register(Tag(0x0011, 0x1001), VR::LO, "LooseOddTag", 1, 1, None)
            .unwrap();
        assert_eq!(dict.lookup_vr(Tag(0x0011, 0x1001)), VR::LO);
    }

    #[test]
    fn register_reserved_groups_with_creator_fails() {
        let dict = standard();
        for group in [0x0001, 0x0003, 0x0005, 0x0007, 0xFFFF, 0x0008] {
            let err = dict
                .register(Tag(group, 0x0010), VR::LO, "Nope", 1, 1, Some("ACME"))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidPrivateGroup { .. }), "{}", err);
        }
        assert!(dict.tag_by_name("Nope").is_none());
    }

    #[test]
    fn register_invalid_multiplicity_fails() {
        let dict = standard();
        assert!(matches!(
            dict.register(Tag(0x0009, 0x1002), VR::LO, "A", 0, 1, Some("ACME")),
            Err(Error::InvalidMultiplicity { .. })
        ));
        assert!(matches!(
            dict.register(Tag(0x0009, 0x1002), VR::LO, "A", 3, 2, Some("ACME")),
            Err(Error::InvalidMultiplicity { .. })
        ));
    }

    #[test]
    fn register_duplicate_name_fails() {
        let dict = standard();
        let err = dict
            .register(Tag(0x0009, 0x1003), VR::LO, "PatientName", 1, 1, Some("ACME"))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExistingTag { .. }));
        // the registry is still usable after the failure
        assert_eq!(dict.tag_by_name("PatientName"), Some(Tag(0x0010, 0x0010)));
    }

    #[test]
    fn parse_tags_by_hex_or_name() {
        let dict = standard();
        assert_eq!(dict.parse_tag("0010,0020").unwrap(), Tag(0x0010, 0x0020));
        assert_eq!(dict.parse_tag("00100020").unwrap(), Tag(0x0010, 0x0020));
        assert_eq!(dict.parse_tag("PatientID").unwrap(), Tag(0x0010, 0x0020));
        assert!(matches!(
            dict.parse_tag("NoSuchAttribute"),
            Err(Error::UnknownTag { .. })
        ));
    }

    #[test]
    fn unknown_tags() {
        let dict = standard();
        assert!(dict.is_unknown_tag(Tag(0x0010, 0x9999)));
        assert!(!dict.is_unknown_tag(Tag(0x0010, 0x0010)));
        assert_eq!(dict.lookup_vr(Tag(0x0010, 0x9999)), VR::UN);
        assert_eq!(dict.tag_name(Tag(0x0010, 0x9999), None), UNKNOWN_TAG_NAME);
    }

    #[test]
    fn load_replaces_entries() {
        let dict = standard();
        dict.load("(0010,0010)\tPN\tPatientName\t1\tDICOM\n").unwrap();
        assert_eq!(dict.len(), 1);
        assert!(dict.by_tag(Tag(0x0010, 0x0020)).is_none());
    }

    #[test]
    fn sanity_check_rejects_broken_sources() {
        let dict = DataDictionaryRegistry::new();
        dict.load("(0010,1030)\tLO\tPatientWeight\t1\tDICOM\n").unwrap();
        assert!(matches!(dict.check_sanity(), Err(Error::Misconfigured { .. })));
    }

    #[test]
    fn concurrent_lookups_and_registration() {
        let dict = std::sync::Arc::new(standard());
        let handles: Vec<_> = (0..4u16)
            .map(|i| {
                let dict = dict.clone();
                std::thread::spawn(move || {
                    let name = format!("ThreadTag{}", i);
                    dict.register(Tag(0x0011, 0x1010 + i), VR::LO, &name, 1, 1, Some("THREADS"))
                        .unwrap();
                    assert_eq!(dict.lookup_vr(Tag(0x0010, 0x0010)), VR::PN);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for i in 0..4u16 {
            assert!(dict
                .by_private_tag(Tag(0x0011, 0x1010 + i), "THREADS")
                .is_some());
        }
    }
}
