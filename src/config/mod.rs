//! Collection configuration
//!
//! Everything a run needs besides the trait images themselves: canvas format,
//! background, the waves to generate, metadata settings and the rule table.
//! Loaded from a JSON document (`strata.json`).

mod loader;

pub use loader::{load_config, validate_config, CliOverrides, DEFAULT_CONFIG_FILE};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::BlendMode;
use crate::rules::RuleTable;

/// Default separator between a trait name and its rarity weight.
pub const DEFAULT_RARITY_DELIMITER: &str = "#";
/// Default number of duplicate DNA rejections before a run aborts.
pub const DEFAULT_UNIQUE_DNA_TOLERANCE: usize = 10_000;
/// Default number of weighted draws per layer before giving up on a constraint.
pub const DEFAULT_MAX_RESAMPLE_ATTEMPTS: usize = 1_000;

/// Top-level collection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory holding one sub-directory per layer
    pub layers_dir: PathBuf,
    /// Output directory (wiped at the start of each run)
    pub build_dir: PathBuf,
    pub format: FormatConfig,
    pub background: BackgroundConfig,
    /// Waves generated in order, sharing one uniqueness set and numbering
    pub layer_configurations: Vec<WaveConfig>,
    /// Hand out edition numbers in random order
    pub shuffle_layer_configurations: bool,
    pub rarity_delimiter: String,
    /// Duplicate rejections tolerated over the whole run
    pub unique_dna_tolerance: usize,
    /// Weighted draws per layer before a constraint counts as unsatisfiable
    pub max_resample_attempts: usize,
    pub debug_logs: bool,
    pub network: Network,
    pub name_prefix: String,
    pub description: String,
    pub base_uri: String,
    pub solana_metadata: SolanaMetadataConfig,
    /// Free-form fields merged into every metadata record
    pub extra_metadata: Map<String, Value>,
    pub text: TextConfig,
    pub gif: GifConfig,
    /// Seed for reproducible runs; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Named built-in rule table (e.g. "character")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_preset: Option<String>,
    /// Inline rule table; takes precedence over `rule_preset`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleTable>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            layers_dir: PathBuf::from("layers"),
            build_dir: PathBuf::from("build"),
            format: FormatConfig::default(),
            background: BackgroundConfig::default(),
            layer_configurations: Vec::new(),
            shuffle_layer_configurations: false,
            rarity_delimiter: DEFAULT_RARITY_DELIMITER.to_string(),
            unique_dna_tolerance: DEFAULT_UNIQUE_DNA_TOLERANCE,
            max_resample_attempts: DEFAULT_MAX_RESAMPLE_ATTEMPTS,
            debug_logs: false,
            network: Network::default(),
            name_prefix: "Your Collection".to_string(),
            description: "Remember to replace this description".to_string(),
            base_uri: "ipfs://NewUriToReplace".to_string(),
            solana_metadata: SolanaMetadataConfig::default(),
            extra_metadata: Map::new(),
            text: TextConfig::default(),
            gif: GifConfig::default(),
            seed: None,
            rule_preset: None,
            rules: None,
        }
    }
}

impl GeneratorConfig {
    /// Final edition number target (the last wave's `grow_edition_size_to`).
    pub fn collection_size(&self) -> u32 {
        self.layer_configurations
            .last()
            .map(|wave| wave.grow_edition_size_to)
            .unwrap_or(0)
    }

    /// Resolve the rule table: inline rules, then the named preset, then none.
    pub fn rule_table(&self) -> crate::Result<RuleTable> {
        if let Some(rules) = &self.rules {
            return Ok(rules.clone());
        }
        match &self.rule_preset {
            Some(name) => RuleTable::preset(name),
            None => Ok(RuleTable::default()),
        }
    }
}

/// Output canvas dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub width: u32,
    pub height: u32,
    /// Smooth (bilinear) scaling of trait images; nearest-neighbour when off
    pub smoothing: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            smoothing: false,
        }
    }
}

/// Background fill drawn before the first layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub generate: bool,
    /// HSL lightness used for random pastel backgrounds, e.g. "80%"
    pub brightness: String,
    /// Use `default` instead of a random hue
    #[serde(rename = "static")]
    pub static_color: bool,
    /// Hex color for static backgrounds
    pub default: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            generate: true,
            brightness: "80%".to_string(),
            static_color: false,
            default: "#000000".to_string(),
        }
    }
}

/// One generation wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Cumulative edition count this wave grows the collection to
    pub grow_edition_size_to: u32,
    pub layers_order: Vec<LayerConfig>,
}

/// A layer reference within a wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Directory name under `layers_dir`
    pub name: String,
    #[serde(default)]
    pub options: LayerOptions,
}

impl LayerConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: LayerOptions::default(),
        }
    }
}

/// Per-layer overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend: Option<BlendMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_dna: Option<bool>,
}

/// Target metadata schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Eth,
    Sol,
}

impl Network {
    /// First edition number handed out for this network.
    pub fn first_edition(&self) -> u32 {
        match self {
            Network::Eth => 1,
            Network::Sol => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolanaMetadataConfig {
    pub symbol: String,
    /// Secondary sale royalty; 1000 = 10%
    pub seller_fee_basis_points: u32,
    pub external_url: String,
    pub creators: Vec<Creator>,
}

impl Default for SolanaMetadataConfig {
    fn default() -> Self {
        Self {
            symbol: "YC".to_string(),
            seller_fee_basis_points: 1000,
            external_url: String::new(),
            creators: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    pub share: u32,
}

/// Text-only rendering: draw a label per layer instead of its image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub only: bool,
    pub color: String,
    /// Font size in pixels
    pub size: u32,
    pub x_gap: u32,
    pub y_gap: u32,
    pub spacer: String,
    /// Font family, looked up among the system fonts
    pub family: String,
    /// `regular`, `bold`, ... or a numeric weight (1-1000)
    pub weight: String,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    /// Font file to use instead of a system family
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_file: Option<PathBuf>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            only: false,
            color: "#ffffff".to_string(),
            size: 20,
            x_gap: 40,
            y_gap: 40,
            spacer: " => ".to_string(),
            family: "Courier".to_string(),
            weight: "regular".to_string(),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
            font_file: None,
        }
    }
}

impl TextConfig {
    /// Numeric font weight, `None` when the keyword is unknown.
    pub fn weight_value(&self) -> Option<f32> {
        let weight = self.weight.trim().to_ascii_lowercase();
        let value = match weight.as_str() {
            "thin" => 100.0,
            "extralight" | "extra-light" => 200.0,
            "light" => 300.0,
            "regular" | "normal" => 400.0,
            "medium" => 500.0,
            "semibold" | "semi-bold" => 600.0,
            "bold" => 700.0,
            "extrabold" | "extra-bold" => 800.0,
            "black" | "heavy" => 900.0,
            other => other.parse::<f32>().ok()?,
        };
        (1.0..=1000.0).contains(&value).then_some(value)
    }
}

/// Horizontal anchor of a label relative to its x position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Start,
    End,
}

/// Vertical anchor of a label relative to its y position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    #[default]
    Top,
    Hanging,
    Middle,
    Alphabetic,
    Ideographic,
    Bottom,
}

/// Per-edition animation capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GifConfig {
    pub export: bool,
    /// 0 loops forever
    pub repeat: u16,
    /// 1-100; higher encodes slower with better palettes
    pub quality: u8,
    /// Frame delay in milliseconds
    pub delay: u32,
}

impl Default for GifConfig {
    fn default() -> Self {
        Self {
            export: false,
            repeat: 0,
            quality: 100,
            delay: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: GeneratorConfig = serde_json::from_str(
            r#"{ "layer_configurations": [
                { "grow_edition_size_to": 5, "layers_order": [ { "name": "Background" } ] }
            ] }"#,
        )
        .unwrap();

        assert_eq!(config.rarity_delimiter, "#");
        assert_eq!(config.unique_dna_tolerance, DEFAULT_UNIQUE_DNA_TOLERANCE);
        assert_eq!(config.max_resample_attempts, DEFAULT_MAX_RESAMPLE_ATTEMPTS);
        assert_eq!(config.collection_size(), 5);
        assert_eq!(config.network, Network::Eth);
        assert!(config.layer_configurations[0].layers_order[0]
            .options
            .blend
            .is_none());
    }

    #[test]
    fn test_layer_options_parse() {
        let layer: LayerConfig = serde_json::from_str(
            r#"{ "name": "Eye color", "options": { "blend": "multiply", "opacity": 0.5, "bypass_dna": true, "display_name": "Awesome Eye Color" } }"#,
        )
        .unwrap();
        assert_eq!(layer.options.blend, Some(BlendMode::Multiply));
        assert_eq!(layer.options.opacity, Some(0.5));
        assert_eq!(layer.options.bypass_dna, Some(true));
        assert_eq!(layer.options.display_name.as_deref(), Some("Awesome Eye Color"));
    }

    #[test]
    fn test_text_font_settings_parse() {
        let text: TextConfig = serde_json::from_str(
            r#"{ "only": true, "family": "DejaVu Sans", "weight": "bold", "align": "center", "baseline": "middle" }"#,
        )
        .unwrap();
        assert_eq!(text.family, "DejaVu Sans");
        assert_eq!(text.weight_value(), Some(700.0));
        assert_eq!(text.align, TextAlign::Center);
        assert_eq!(text.baseline, TextBaseline::Middle);

        let defaults = TextConfig::default();
        assert_eq!(defaults.family, "Courier");
        assert_eq!(defaults.weight_value(), Some(400.0));
        assert_eq!(defaults.align, TextAlign::Left);
        assert_eq!(defaults.baseline, TextBaseline::Top);
    }

    #[test]
    fn test_text_weight_keywords() {
        let mut text = TextConfig::default();
        text.weight = "350".to_string();
        assert_eq!(text.weight_value(), Some(350.0));
        text.weight = "chunky".to_string();
        assert_eq!(text.weight_value(), None);
        text.weight = "0".to_string();
        assert_eq!(text.weight_value(), None);
    }

    #[test]
    fn test_network_first_edition() {
        assert_eq!(Network::Eth.first_edition(), 1);
        assert_eq!(Network::Sol.first_edition(), 0);
    }

    #[test]
    fn test_rule_table_defaults_to_empty() {
        let config = GeneratorConfig::default();
        assert!(config.rule_table().unwrap().profiles.is_empty());
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        let config = GeneratorConfig {
            rule_preset: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(config.rule_table().is_err());
    }
}
