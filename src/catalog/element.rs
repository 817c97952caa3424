//! Trait elements and layers
//!
//! A layer is an ordered catalog of trait elements. The order matters twice:
//! it is the z-order when compositing and the position of the layer's entry
//! in an encoded DNA.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_RARITY_DELIMITER;

/// Separator between the tokens of a trait filename (`Red_Sweat_Fire#5.png`).
pub const TOKEN_SEPARATOR: char = '_';

/// Canvas composite operation used when drawing a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    SourceOver,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Lighter,
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlendMode::SourceOver => "source-over",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "color-dodge",
            BlendMode::ColorBurn => "color-burn",
            BlendMode::HardLight => "hard-light",
            BlendMode::SoftLight => "soft-light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Lighter => "lighter",
        };
        write!(f, "{}", name)
    }
}

/// One selectable asset within a layer. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitElement {
    /// Position within the layer's catalog
    pub id: u32,
    /// Filename without extension and rarity suffix
    pub name: String,
    /// Full filename, including rarity suffix and extension
    pub filename: String,
    /// Location of the image on disk
    pub path: PathBuf,
    /// Rarity weight; selection probability is weight / total weight
    pub weight: f64,
    /// Separator between the name and the weight in `filename`
    #[serde(default = "default_rarity_delimiter")]
    pub rarity_delimiter: String,
}

fn default_rarity_delimiter() -> String {
    DEFAULT_RARITY_DELIMITER.to_string()
}

impl TraitElement {
    pub fn new(id: u32, name: &str, filename: &str, weight: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            filename: filename.to_string(),
            path: PathBuf::from(filename),
            weight,
            rarity_delimiter: default_rarity_delimiter(),
        }
    }

    pub fn with_rarity_delimiter(mut self, delimiter: &str) -> Self {
        self.rarity_delimiter = delimiter.to_string();
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Filename token at `index`, trimmed. `Red_Sweat_Fire#5.png` has tokens
    /// `Red`, `Sweat` and `Fire#5.png`.
    pub fn token(&self, index: usize) -> Option<&str> {
        self.filename
            .split(TOKEN_SEPARATOR)
            .nth(index)
            .map(str::trim)
    }

    /// Token at `index` with any rarity suffix removed (`Fire#5.png` -> `Fire`).
    pub fn design_token(&self, index: usize) -> Option<&str> {
        let delimiter = self.rarity_delimiter.as_str();
        self.token(index).map(|token| {
            if delimiter.is_empty() {
                return token;
            }
            token.split(delimiter).next().unwrap_or(token).trim()
        })
    }
}

/// A named slot in the composition with its ordered element catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Position of the layer within its wave
    pub index: usize,
    /// Directory name the layer was loaded from; rule tables key on this
    pub name: String,
    /// Name written to metadata attributes
    pub display_name: String,
    pub blend: BlendMode,
    /// Global alpha in [0, 1]
    pub opacity: f32,
    /// Exclude this layer from the uniqueness comparison
    pub bypass_dna: bool,
    pub elements: Vec<TraitElement>,
}

impl Layer {
    pub fn new(index: usize, name: &str, elements: Vec<TraitElement>) -> Self {
        Self {
            index,
            name: name.to_string(),
            display_name: name.to_string(),
            blend: BlendMode::default(),
            opacity: 1.0,
            bypass_dna: false,
            elements,
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_bypass_dna(mut self, bypass: bool) -> Self {
        self.bypass_dna = bypass;
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.elements.iter().map(|e| e.weight).sum()
    }

    pub fn element_by_id(&self, id: u32) -> Option<&TraitElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_by_filename(&self, filename: &str) -> Option<&TraitElement> {
        self.elements.iter().find(|e| e.filename == filename)
    }
}
