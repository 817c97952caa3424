//! Layer directory scanning
//!
//! Each layer is a directory of images. A file's rarity weight is encoded in
//! its name after the rarity delimiter: `Red_Plain#40.png` weighs 40.

use std::path::Path;

use log::info;
use walkdir::WalkDir;

use super::{Layer, TraitElement};
use crate::config::LayerConfig;
use crate::dna::{DNA_DELIMITER, ID_SEPARATOR, OPTION_SEPARATOR};
use crate::error::{Result, StrataError};

/// Weight used when a filename carries no numeric rarity suffix.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Characters an encoded DNA uses as structure.
const RESERVED_CHARS: [char; 3] = [DNA_DELIMITER, OPTION_SEPARATOR, ID_SEPARATOR];

/// Hidden entries are a dot followed by anything but another dot.
fn is_hidden(filename: &str) -> bool {
    let mut chars = filename.chars();
    chars.next() == Some('.') && matches!(chars.next(), Some(c) if c != '.')
}

/// File stem, i.e. the filename without its extension.
fn stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Parse the rarity weight of a trait filename.
///
/// Returns `Ok(None)` when there is no parsable weight; the caller applies
/// [`DEFAULT_WEIGHT`]. A delimiter with nothing after it (`Gold#.png`)
/// weighs zero.
pub fn parse_rarity_weight(filename: &str, delimiter: &str) -> Result<Option<f64>> {
    let Some((_, raw)) = stem(filename).rsplit_once(delimiter) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Some(0.0));
    }
    let Ok(weight) = raw.parse::<f64>() else {
        return Ok(None);
    };
    if !weight.is_finite() || weight < 0.0 {
        return Err(StrataError::InvalidWeight {
            filename: filename.to_string(),
            weight,
        });
    }
    Ok(Some(weight))
}

/// Display name of a trait filename: the stem up to the first delimiter.
pub fn clean_name(filename: &str, delimiter: &str) -> String {
    let stem = stem(filename);
    stem.split(delimiter).next().unwrap_or(stem).to_string()
}

/// Scan one layer directory into its ordered element catalog.
///
/// Elements are ordered by filename so ids are stable across runs.
pub fn scan_layer(dir: &Path, delimiter: &str) -> Result<Vec<TraitElement>> {
    if !dir.is_dir() {
        return Err(StrataError::CatalogNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut elements = Vec::new();
    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file());

    for entry in entries {
        let filename = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&filename) {
            continue;
        }
        if let Some(reserved) = filename.chars().find(|c| RESERVED_CHARS.contains(c)) {
            return Err(StrataError::IllegalFilename {
                filename,
                reason: format!("layer filenames can not contain '{}'", reserved),
            });
        }

        let weight = parse_rarity_weight(&filename, delimiter)?.unwrap_or(DEFAULT_WEIGHT);
        let element = TraitElement::new(
            elements.len() as u32,
            &clean_name(&filename, delimiter),
            &filename,
            weight,
        )
        .with_path(entry.path().to_path_buf())
        .with_rarity_delimiter(delimiter);
        elements.push(element);
    }

    Ok(elements)
}

/// Build the ordered layer list for one wave.
pub fn layers_setup(
    layers_order: &[LayerConfig],
    layers_dir: &Path,
    delimiter: &str,
) -> Result<Vec<Layer>> {
    layers_order
        .iter()
        .enumerate()
        .map(|(index, config)| {
            let elements = scan_layer(&layers_dir.join(&config.name), delimiter)?;
            let options = &config.options;
            let layer = Layer::new(index, &config.name, elements)
                .with_display_name(options.display_name.as_deref().unwrap_or(&config.name))
                .with_blend(options.blend.unwrap_or_default())
                .with_opacity(options.opacity.unwrap_or(1.0))
                .with_bypass_dna(options.bypass_dna.unwrap_or(false));

            info!(
                "Loaded layer '{}': {} elements, total weight {}",
                layer.name,
                layer.elements.len(),
                layer.total_weight()
            );
            Ok(layer)
        })
        .collect()
}
