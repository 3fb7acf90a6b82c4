//! This crate implements the DICOM attribute dictionary of dcmbridge.
//!
//! ## Run-time dictionary
//!
//! - [`data_element`]: the [`DataDictionaryRegistry`],
//!   a lock-guarded registry of attributes
//!   which is loaded from dictionary sources in the DCMTK text format
//!   and can be extended one attribute at a time,
//!   including vendor-private attributes owned by a private creator.
//!   The crate embeds a source for the standard attributes
//!   and one for a few well known private attributes.
//!
//! The registry is an ordinary value:
//! create it once when the host starts
//! and share it by reference (or in an `Arc`) with the other layers.
//!
//! ## Constants
//!
//! The following modules contain constant declarations,
//! which perform an equivalent mapping at compile time,
//! thus without incurring a look-up cost:
//!
//! - [`tags`], which map an attribute alias to a DICOM tag
//! - [`uids`], for the transfer syntax unique identifiers
pub mod data_element;
mod source;
pub mod tags;
pub mod uids;

pub use data_element::{DataDictionaryRegistry, Error, Result};
