//! DNA encoding and decoding
//!
//! A DNA is one `id:filename` entry per layer, in layer order, joined by
//! [`DNA_DELIMITER`]. An entry may carry a query string of options; the only
//! option today is `bypassDNA=true`, which excludes the entry from the
//! uniqueness comparison.

use std::fmt;

use crate::catalog::{BlendMode, Layer, TraitElement};
use crate::error::{Result, StrataError};

/// Separator between the per-layer entries of an encoded DNA.
pub const DNA_DELIMITER: char = '-';

/// Separator between an entry and its query options.
pub const OPTION_SEPARATOR: char = '?';

/// Separator between an element id and its filename.
pub const ID_SEPARATOR: char = ':';

/// Query option marking an entry as excluded from uniqueness.
pub const BYPASS_OPTION: &str = "bypassDNA";

/// One layer's contribution to a DNA.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnaEntry {
    pub element_id: u32,
    pub filename: String,
    pub bypass: bool,
}

impl DnaEntry {
    pub fn new(element_id: u32, filename: &str, bypass: bool) -> Self {
        Self {
            element_id,
            filename: filename.to_string(),
            bypass,
        }
    }

    /// Parse a single `id:filename[?options]` entry.
    pub fn parse(raw: &str) -> Result<Self> {
        let (body, query) = match raw.split_once(OPTION_SEPARATOR) {
            Some((body, query)) => (body, Some(query)),
            None => (raw, None),
        };
        let (id, filename) = body.split_once(ID_SEPARATOR).ok_or_else(|| StrataError::MalformedDna {
            reason: format!("entry '{}' is missing ':'", raw),
        })?;
        let element_id = id.trim().parse::<u32>().map_err(|_| StrataError::MalformedDna {
            reason: format!("entry '{}' has a non-numeric id", raw),
        })?;

        Ok(Self {
            element_id,
            filename: filename.to_string(),
            bypass: query.is_some_and(has_bypass_option),
        })
    }
}

impl fmt::Display for DnaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.element_id, self.filename)?;
        if self.bypass {
            write!(f, "?{}=true", BYPASS_OPTION)?;
        }
        Ok(())
    }
}

/// Whether an option query string (`a=b&c=d`) sets `bypassDNA=true`.
fn has_bypass_option(query: &str) -> bool {
    query.split('&').any(|setting| {
        let mut pair = setting.splitn(2, '=');
        pair.next() == Some(BYPASS_OPTION) && pair.next() == Some("true")
    })
}

/// A full selection: one entry per layer, in layer order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnaStrand {
    pub entries: Vec<DnaEntry>,
}

impl DnaStrand {
    pub fn new(entries: Vec<DnaEntry>) -> Self {
        Self { entries }
    }

    /// Parse an encoded DNA string.
    pub fn parse(dna: &str) -> Result<Self> {
        if dna.is_empty() {
            return Ok(Self::new(Vec::new()));
        }
        dna.split(DNA_DELIMITER)
            .map(DnaEntry::parse)
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// The encoded string form, bypass markers included.
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.to_string())
            .collect::<Vec<_>>()
            .join(&DNA_DELIMITER.to_string())
    }

    /// The uniqueness key: the encoding without bypassed entries.
    pub fn uniqueness_key(&self) -> String {
        self.entries
            .iter()
            .filter(|entry| !entry.bypass)
            .map(|entry| entry.to_string())
            .collect::<Vec<_>>()
            .join(&DNA_DELIMITER.to_string())
    }
}

impl fmt::Display for DnaStrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Drop every entry whose options bypass the uniqueness check.
pub fn filter_dna_options(dna: &str) -> String {
    dna.split(DNA_DELIMITER)
        .filter(|entry| match entry.split_once(OPTION_SEPARATOR) {
            Some((_, query)) => !has_bypass_option(query),
            None => true,
        })
        .collect::<Vec<_>>()
        .join(&DNA_DELIMITER.to_string())
}

/// Strip the option query string from an entry.
pub fn remove_query_strings(entry: &str) -> &str {
    entry.split_once(OPTION_SEPARATOR).map_or(entry, |(body, _)| body)
}

/// Leading element id of an entry.
pub fn clean_dna(entry: &str) -> Result<u32> {
    let body = remove_query_strings(entry);
    let id = body.split(ID_SEPARATOR).next().unwrap_or(body);
    id.trim().parse::<u32>().map_err(|_| StrataError::MalformedDna {
        reason: format!("entry '{}' has a non-numeric id", entry),
    })
}

/// One layer of a decoded DNA, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLayer {
    /// Layer directory name
    pub name: String,
    /// Name used for the metadata attribute
    pub display_name: String,
    pub blend: BlendMode,
    pub opacity: f32,
    pub bypass_dna: bool,
    pub selected_element: TraitElement,
}

/// Map an encoded DNA back onto a wave's layers.
pub fn construct_layer_to_dna(dna: &str, layers: &[Layer]) -> Result<Vec<DecodedLayer>> {
    let entries: Vec<&str> = dna.split(DNA_DELIMITER).collect();
    if entries.len() != layers.len() {
        return Err(StrataError::MalformedDna {
            reason: format!(
                "DNA has {} entries but the wave has {} layers",
                entries.len(),
                layers.len()
            ),
        });
    }

    layers
        .iter()
        .zip(entries)
        .map(|(layer, entry)| {
            let id = clean_dna(entry)?;
            let selected = layer
                .element_by_id(id)
                .ok_or_else(|| StrataError::MalformedDna {
                    reason: format!("layer '{}' has no element with id {}", layer.name, id),
                })?;
            Ok(DecodedLayer {
                name: layer.name.clone(),
                display_name: layer.display_name.clone(),
                blend: layer.blend,
                opacity: layer.opacity,
                bypass_dna: layer.bypass_dna,
                selected_element: selected.clone(),
            })
        })
        .collect()
}

/// Re-encode a decoded DNA.
pub fn encode_decoded(decoded: &[DecodedLayer]) -> String {
    DnaStrand::new(
        decoded
            .iter()
            .map(|layer| {
                DnaEntry::new(
                    layer.selected_element.id,
                    &layer.selected_element.filename,
                    layer.bypass_dna,
                )
            })
            .collect(),
    )
    .encode()
}
