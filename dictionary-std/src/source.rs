//! Parser for dictionary sources in the DCMTK text format.
//!
//! Each non-empty line which does not start with `#` describes one attribute,
//! with tab separated fields:
//!
//! ```text
//! (0010,0010)	PN	PatientName	1	DICOM
//! (60xx,3000)	ox	OverlayData	1	DICOM
//! (0029,"SIEMENS CSA HEADER",10)	OB	CSAImageHeaderInfo	1	private
//! ```
//!
//! Lowercase `x` digits open a range of groups or elements.
//! Private attributes name their private creator,
//! and a two digit element is an offset inside whichever block
//! the creator has reserved.

use crate::data_element::{ParseSourceSnafu, Result};
use dcmbridge_core::dictionary::{DictionaryEntryBuf, Multiplicity, TagRange, VirtualVr};
use dcmbridge_core::{Tag, VR};
use std::str::FromStr;

/// An entry read from a dictionary source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceEntry {
    pub entry: DictionaryEntryBuf,
    /// the element only gives the offset inside a private block
    pub block_relative: bool,
}

pub(crate) fn parse_source(source: &str) -> Result<Vec<SourceEntry>> {
    let mut out = Vec::new();
    for (i, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = parse_line(line).map_err(|reason| {
            ParseSourceSnafu {
                line: i + 1,
                reason,
            }
            .build()
        })?;
        out.push(entry);
    }
    Ok(out)
}

fn parse_line(line: &str) -> Result<SourceEntry, String> {
    let fields: Vec<&str> = line
        .split('\t')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() < 4 {
        return Err(format!("expected at least 4 fields, found {}", fields.len()));
    }
    let (vr, virtual_vr) = parse_vr(fields[1])?;
    let alias = fields[2].to_string();
    let vm = parse_vm(fields[3])?;

    let tag_text = fields[0]
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| format!("tag `{}` is not enclosed in parentheses", fields[0]))?;

    if let (Some(open), Some(close)) = (tag_text.find('"'), tag_text.rfind('"')) {
        if open == close {
            return Err(format!("unterminated private creator in `{}`", tag_text));
        }
        let group = tag_text[..open].trim_end_matches(',');
        let creator = &tag_text[open + 1..close];
        let element = tag_text[close + 1..].trim_start_matches(',');
        let group = parse_hex(group)?;
        let (element, block_relative) = match element.len() {
            2 => (parse_hex(element)?, true),
            4 if element.starts_with("xx") => (parse_hex(&element[2..])?, true),
            4 => (parse_hex(element)?, false),
            _ => return Err(format!("invalid private element `{}`", element)),
        };
        return Ok(SourceEntry {
            entry: DictionaryEntryBuf {
                tag: TagRange::Single(Tag(group, element)),
                alias,
                vr,
                vm,
                private_creator: Some(creator.to_string()),
                virtual_vr,
            },
            block_relative,
        });
    }

    let (group, element) = tag_text
        .split_once(',')
        .ok_or_else(|| format!("invalid tag `{}`", tag_text))?;
    let tag = match (group.ends_with("xx"), element.ends_with("xx")) {
        (false, false) => TagRange::Single(Tag(parse_hex(group)?, parse_hex(element)?)),
        (true, false) => TagRange::Group100(Tag(
            parse_hex(&group[..2])? << 8,
            parse_hex(element)?,
        )),
        (false, true) => TagRange::Element100(Tag(
            parse_hex(group)?,
            parse_hex(&element[..2])? << 8,
        )),
        (true, true) => return Err(format!("too many open digits in `{}`", tag_text)),
    };
    Ok(SourceEntry {
        entry: DictionaryEntryBuf {
            tag,
            alias,
            vr,
            vm,
            private_creator: None,
            virtual_vr,
        },
        block_relative: false,
    })
}

fn parse_hex(text: &str) -> Result<u16, String> {
    if text.is_empty() || text.len() > 4 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid hexadecimal number `{}`", text));
    }
    u16::from_str_radix(text, 16).map_err(|e| e.to_string())
}

/// Resolve a VR, including the DCMTK pseudo VRs
/// for attributes which may take more than one representation.
/// These resolve to their relaxed form.
fn parse_vr(text: &str) -> Result<(VR, Option<VirtualVr>), String> {
    let virtual_vr = match text {
        "ox" | "OB/OW" | "OW/OB" => VirtualVr::Ox,
        "xs" | "US/SS" | "SS/US" => VirtualVr::Xs,
        "lt" | "US/SS/OW" => VirtualVr::Lt,
        "up" => return Ok((VR::UL, None)),
        _ => {
            return VR::from_str(text)
                .map(|vr| (vr, None))
                .map_err(|_| format!("unknown VR `{}`", text))
        }
    };
    Ok((virtual_vr.relaxed(), Some(virtual_vr)))
}

/// Parse a value multiplicity such as `1`, `1-3`, `1-n` or `2-2n`.
fn parse_vm(text: &str) -> Result<Multiplicity, String> {
    let bad = || format!("invalid multiplicity `{}`", text);
    match text.split_once('-') {
        None => {
            let n = text.parse().map_err(|_| bad())?;
            Ok(Multiplicity::new(n, Some(n)))
        }
        Some((min, max)) => {
            let min = min.parse().map_err(|_| bad())?;
            if max.ends_with('n') {
                Ok(Multiplicity::new(min, None))
            } else {
                let max = max.parse().map_err(|_| bad())?;
                Ok(Multiplicity::new(min, Some(max)))
            }
        }
    }
}
