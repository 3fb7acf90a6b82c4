//! Generation of fresh identifiers for patients, studies,
//! series and instances.
use serde::Deserialize;
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// The level of a resource in the DICOM model of the real world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ResourceLevel {
    /// A patient
    Patient,
    /// A study of a patient
    Study,
    /// A series of a study
    Series,
    /// A single instance of a series
    Instance,
}

impl fmt::Display for ResourceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceLevel::Patient => "Patient",
            ResourceLevel::Study => "Study",
            ResourceLevel::Series => "Series",
            ResourceLevel::Instance => "Instance",
        };
        f.write_str(name)
    }
}

/// The maximum length of a UID.
pub const MAX_UID_LENGTH: usize = 64;

/// The fewest random digits to follow a root in a generated UID.
const MIN_UID_SUFFIX_DIGITS: usize = 16;

const DEFAULT_STUDY_ROOT: &str = "1.2.276.0.7230010.3.1.2";
const DEFAULT_SERIES_ROOT: &str = "1.2.276.0.7230010.3.1.3";
const DEFAULT_INSTANCE_ROOT: &str = "1.2.276.0.7230010.3.1.4";

/// The UID roots under which new unique identifiers are generated,
/// one for each resource level with UIDs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UidRoots {
    /// root of Study Instance UIDs
    pub study: String,
    /// root of Series Instance UIDs
    pub series: String,
    /// root of SOP Instance UIDs
    pub instance: String,
}

impl Default for UidRoots {
    fn default() -> Self {
        UidRoots {
            study: DEFAULT_STUDY_ROOT.to_string(),
            series: DEFAULT_SERIES_ROOT.to_string(),
            instance: DEFAULT_INSTANCE_ROOT.to_string(),
        }
    }
}

impl UidRoots {
    /// Generate an identifier for a resource of the given level.
    ///
    /// Patients get a random UUID in its textual form,
    /// which fits in the 64 characters of a Patient ID.
    /// Other levels get the level's root
    /// followed by the decimal form of a random UUID,
    /// cut short so that the UID fits in [`MAX_UID_LENGTH`].
    /// A root leaving room for fewer than 16 random digits
    /// is replaced by the default root of the level.
    pub fn generate(&self, level: ResourceLevel) -> String {
        let (root, default_root) = match level {
            ResourceLevel::Patient => {
                let id = Uuid::new_v4().to_string();
                debug!("Generated {} identifier {}", level, id);
                return id;
            }
            ResourceLevel::Study => (&self.study, DEFAULT_STUDY_ROOT),
            ResourceLevel::Series => (&self.series, DEFAULT_SERIES_ROOT),
            ResourceLevel::Instance => (&self.instance, DEFAULT_INSTANCE_ROOT),
        };
        let root = if root.len() + 1 + MIN_UID_SUFFIX_DIGITS > MAX_UID_LENGTH {
            warn!(
                "UID root {} is too long for {} identifiers, using {}",
                root, level, default_root
            );
            default_root
        } else {
            root.as_str()
        };

        let mut suffix = Uuid::new_v4().as_u128().to_string();
        suffix.truncate(MAX_UID_LENGTH - root.len() - 1);
        let uid = format!("{}.{}", root, suffix);
        debug!("Generated {} identifier {}", level, uid);
        uid
    }
}

/// Generate an identifier for a resource of the given level,
/// under the default UID roots.
///
/// ```
/// # use dcmbridge_object::{generate_identifier, ResourceLevel};
/// let patient = generate_identifier(ResourceLevel::Patient);
/// assert_eq!(patient.len(), 36);
///
/// let study = generate_identifier(ResourceLevel::Study);
/// assert!(study.starts_with("1.2.276.0.7230010.3.1.2."));
/// assert!(study.len() <= 64);
/// ```
pub fn generate_identifier(level: ResourceLevel) -> String {
    UidRoots::default().generate(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_uid(uid: &str) -> bool {
        uid.len() <= 64
            && uid.split('.').all(|c| {
                !c.is_empty()
                    && c.bytes().all(|b| b.is_ascii_digit())
                    && (c == "0" || !c.starts_with('0'))
            })
    }

    #[test]
    fn patient_identifiers_are_uuids() {
        let id = generate_identifier(ResourceLevel::Patient);
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(&id).is_ok());
        let dashes: Vec<usize> = id.match_indices('-').map(|(i, _)| i).collect();
        assert_eq!(dashes, vec![8, 13, 18, 23]);
    }

    #[test]
    fn uids_use_the_level_roots() {
        for (level, root) in [
            (ResourceLevel::Study, "1.2.276.0.7230010.3.1.2."),
            (ResourceLevel::Series, "1.2.276.0.7230010.3.1.3."),
            (ResourceLevel::Instance, "1.2.276.0.7230010.3.1.4."),
        ] {
            let uid = generate_identifier(level);
            assert!(uid.starts_with(root), "{} should start with {}", uid, root);
            assert!(is_valid_uid(&uid), "{} is not a valid UID", uid);
        }
    }

    #[test]
    fn identifiers_are_unique() {
        let a = generate_identifier(ResourceLevel::Instance);
        let b = generate_identifier(ResourceLevel::Instance);
        assert_ne!(a, b);
    }

    #[test]
    fn custom_roots() {
        let roots = UidRoots {
            study: "2.25".to_string(),
            ..UidRoots::default()
        };
        assert!(roots.generate(ResourceLevel::Study).starts_with("2.25."));
        assert!(roots
            .generate(ResourceLevel::Series)
            .starts_with("1.2.276.0.7230010.3.1.3."));
    }

    #[test]
    fn long_roots_still_fit() {
        let root = "1.2.826.0.1.3680043.9.7433.1.12345678901234";
        let roots = UidRoots {
            instance: root.to_string(),
            ..UidRoots::default()
        };
        for _ in 0..32 {
            let uid = roots.generate(ResourceLevel::Instance);
            assert!(uid.starts_with(root), "{} should start with {}", uid, root);
            assert!(is_valid_uid(&uid), "{} is not a valid UID", uid);
            assert!(uid.len() - root.len() - 1 >= MIN_UID_SUFFIX_DIGITS);
        }
    }

    #[test]
    fn oversized_roots_fall_back_to_the_default() {
        let roots = UidRoots {
            study: "1.2.3.4.5.6.7.8.9.10.11.12.13.14.15.16.17.18.19.20.21.22".to_string(),
            ..UidRoots::default()
        };
        let uid = roots.generate(ResourceLevel::Study);
        assert!(uid.starts_with("1.2.276.0.7230010.3.1.2."), "{}", uid);
        assert!(is_valid_uid(&uid), "{} is not a valid UID", uid);
    }
}
