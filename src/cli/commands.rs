//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;

use log::info;

use crate::config::{load_config, CliOverrides, GeneratorConfig};
use crate::dna::construct_layer_to_dna;
use crate::engine::{load_waves, Orchestrator, RunSummary};
use crate::error::{Result, StrataError};
use crate::metadata::dna_fingerprint;
use crate::output::{build_setup, BuildWriter};
use crate::render::FileAssets;

/// Whether the config file asks for debug logging. Unreadable or invalid
/// files count as no; the command itself reports them.
pub fn debug_logs_requested(config_path: &Path) -> bool {
    fs::read_to_string(config_path)
        .ok()
        .and_then(|contents| serde_json::from_str::<GeneratorConfig>(&contents).ok())
        .is_some_and(|config| config.debug_logs)
}

/// Generate the whole collection.
pub fn generate(config_path: &Path, overrides: &CliOverrides) -> Result<RunSummary> {
    let config = load_config(config_path, overrides)?;
    info!(
        "Generating {} editions into {}",
        config.collection_size(),
        config.build_dir.display()
    );

    build_setup(&config.build_dir, config.gif.export)?;
    let mut orchestrator = Orchestrator::from_config(&config, Box::new(FileAssets))?;
    let mut writer = BuildWriter::from_config(&config);
    let summary = orchestrator.run(&mut writer)?;

    println!("Generated {} editions", summary.editions);
    println!(
        "Discarded attempts: {} duplicate, {} unsatisfiable, {} asset load",
        summary.duplicates, summary.unsatisfiable, summary.asset_failures
    );
    println!("Output: {}", config.build_dir.display());

    Ok(summary)
}

/// Print every wave's catalog.
pub fn catalog(config_path: &Path, overrides: &CliOverrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let waves = load_waves(&config)?;

    for (i, wave) in waves.iter().enumerate() {
        println!(
            "Wave {} (grow to {} editions, {} unconstrained combinations)",
            i,
            wave.grow_edition_size_to,
            wave.combinations()
        );
        println!("{:-<60}", "");

        for layer in &wave.layers {
            let mut flags = Vec::new();
            if layer.display_name != layer.name {
                flags.push(format!("as '{}'", layer.display_name));
            }
            if layer.bypass_dna {
                flags.push("bypass DNA".to_string());
            }
            println!(
                "{} [{} @ {}] {}",
                layer.name,
                layer.blend,
                layer.opacity,
                flags.join(", ")
            );

            let total = layer.total_weight();
            for element in &layer.elements {
                let share = if total > 0.0 { element.weight / total * 100.0 } else { 0.0 };
                println!(
                    "  {:>3}  {:<32} weight {:>8} ({:.2}%)",
                    element.id, element.name, element.weight, share
                );
            }
        }
        println!();
    }

    Ok(())
}

/// Decode a DNA string against one wave's layers.
pub fn decode(config_path: &Path, overrides: &CliOverrides, dna: &str, wave: usize) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let waves = load_waves(&config)?;
    let layers = &waves
        .get(wave)
        .ok_or_else(|| StrataError::InvalidConfig {
            reason: format!("wave {} does not exist ({} configured)", wave, waves.len()),
        })?
        .layers;

    let decoded = construct_layer_to_dna(dna, layers)?;

    println!("DNA fingerprint: {}", dna_fingerprint(dna));
    for layer in &decoded {
        println!(
            "{:<24} {:<32} {} [{} @ {}]{}",
            layer.display_name,
            layer.selected_element.name,
            layer.selected_element.filename,
            layer.blend,
            layer.opacity,
            if layer.bypass_dna { " bypass" } else { "" }
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_debug_logs_requested() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strata.json");

        assert!(!debug_logs_requested(&path));

        fs::write(&path, r#"{ "debug_logs": true }"#).unwrap();
        assert!(debug_logs_requested(&path));

        fs::write(&path, "not json").unwrap();
        assert!(!debug_logs_requested(&path));
    }

    #[test]
    fn test_decode_unknown_wave() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("layers/Background")).unwrap();
        fs::write(dir.path().join("layers/Background/Black#1.png"), b"").unwrap();
        let path = dir.path().join("strata.json");
        fs::write(
            &path,
            r#"{ "layer_configurations": [
                { "grow_edition_size_to": 1, "layers_order": [ { "name": "Background" } ] }
            ] }"#,
        )
        .unwrap();

        let err = decode(&path, &CliOverrides::default(), "0:Black#1.png", 3).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert!(decode(&path, &CliOverrides::default(), "0:Black#1.png", 0).is_ok());
    }
}
