//! Configuration loading and validation

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::{GeneratorConfig, Network};
use crate::dna::DNA_DELIMITER;
use crate::error::{Result, StrataError};
use crate::render::parse_hex_color;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "strata.json";

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub layers_dir: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl CliOverrides {
    pub fn apply(&self, config: &mut GeneratorConfig) {
        if let Some(dir) = &self.layers_dir {
            config.layers_dir = dir.clone();
        }
        if let Some(dir) = &self.build_dir {
            config.build_dir = dir.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Load and validate a configuration file.
///
/// Relative `layers_dir`, `build_dir` and `text.font_file` values are
/// resolved against the directory containing the config file.
pub fn load_config(path: &Path, overrides: &CliOverrides) -> Result<GeneratorConfig> {
    let contents = fs::read_to_string(path).map_err(|e| StrataError::InvalidConfig {
        reason: format!("cannot read {}: {}", path.display(), e),
    })?;
    let mut config: GeneratorConfig = serde_json::from_str(&contents)?;

    if let Some(base) = path.parent() {
        if config.layers_dir.is_relative() {
            config.layers_dir = base.join(&config.layers_dir);
        }
        if config.build_dir.is_relative() {
            config.build_dir = base.join(&config.build_dir);
        }
        if let Some(font) = config.text.font_file.as_mut().filter(|f| f.is_relative()) {
            *font = base.join(&*font);
        }
    }
    overrides.apply(&mut config);

    debug!(
        "Loaded config from {} ({} waves)",
        path.display(),
        config.layer_configurations.len()
    );

    validate_config(&config)?;
    Ok(config)
}

/// Check a configuration, reporting every problem at once.
pub fn validate_config(config: &GeneratorConfig) -> Result<()> {
    let mut problems = Vec::new();

    if config.layer_configurations.is_empty() {
        problems.push("layer_configurations must contain at least one wave".to_string());
    }

    let mut previous_target = 0;
    for (i, wave) in config.layer_configurations.iter().enumerate() {
        if wave.grow_edition_size_to <= previous_target {
            problems.push(format!(
                "wave {} grow_edition_size_to ({}) must be greater than the previous wave's ({})",
                i, wave.grow_edition_size_to, previous_target
            ));
        }
        previous_target = wave.grow_edition_size_to;

        if wave.layers_order.is_empty() {
            problems.push(format!("wave {} has an empty layers_order", i));
        }
        for layer in &wave.layers_order {
            if let Some(opacity) = layer.options.opacity {
                if !(0.0..=1.0).contains(&opacity) {
                    problems.push(format!(
                        "layer '{}' opacity {} is outside [0, 1]",
                        layer.name, opacity
                    ));
                }
            }
        }
    }

    let size = config.collection_size();
    if size > 0 && config.network.first_edition().checked_add(size - 1).is_none() {
        problems.push(format!(
            "collection of {} editions overflows edition numbering",
            size
        ));
    }

    if config.format.width == 0 || config.format.height == 0 {
        problems.push("format width and height must be non-zero".to_string());
    }
    if config.unique_dna_tolerance == 0 {
        problems.push("unique_dna_tolerance must be at least 1".to_string());
    }
    if config.max_resample_attempts == 0 {
        problems.push("max_resample_attempts must be at least 1".to_string());
    }
    if config.rarity_delimiter.is_empty() {
        problems.push("rarity_delimiter must not be empty".to_string());
    } else if config.rarity_delimiter.contains(DNA_DELIMITER) {
        problems.push(format!(
            "rarity_delimiter must not contain the DNA delimiter '{}'",
            DNA_DELIMITER
        ));
    }

    if config.background.generate
        && config.background.static_color
        && parse_hex_color(&config.background.default).is_none()
    {
        problems.push(format!(
            "background default '{}' is not a hex color",
            config.background.default
        ));
    }
    if config.text.only {
        if parse_hex_color(&config.text.color).is_none() {
            problems.push(format!("text color '{}' is not a hex color", config.text.color));
        }
        if config.text.size == 0 {
            problems.push("text size must be at least 1".to_string());
        }
        if config.text.weight_value().is_none() {
            problems.push(format!("text weight '{}' is not a font weight", config.text.weight));
        }
        if let Some(font) = config.text.font_file.as_ref().filter(|f| !f.is_file()) {
            problems.push(format!("text font_file {} does not exist", font.display()));
        }
    }

    if config.network == Network::Sol && !config.solana_metadata.creators.is_empty() {
        let total: u32 = config.solana_metadata.creators.iter().map(|c| c.share).sum();
        if total != 100 {
            problems.push(format!("solana creator shares sum to {}, expected 100", total));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(StrataError::ConfigValidation(problems))
    }
}
