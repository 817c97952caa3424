//! CLI Module
//!
//! Command-line interface for the Strata generator.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CliOverrides, DEFAULT_CONFIG_FILE};

/// Strata - layered art collection generator
#[derive(Parser, Debug)]
#[command(name = "strata-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Collection configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override the layers directory from the configuration
    #[arg(long, global = true)]
    pub layers_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the whole collection into the build directory
    #[command(name = "generate")]
    Generate {
        /// Override the build directory from the configuration
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List every wave's layers, elements and weights
    #[command(name = "catalog")]
    Catalog,

    /// Decode a DNA string against a wave's layers
    #[command(name = "decode")]
    Decode {
        /// Encoded DNA, e.g. "0:Black#1.png-3:Red#2.png"
        #[arg(short, long)]
        dna: String,

        /// Wave whose layers the DNA was generated from
        #[arg(short, long, default_value_t = 0)]
        wave: usize,
    },
}

impl Cli {
    /// Configuration overrides given on the command line.
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            layers_dir: self.layers_dir.clone(),
            ..Default::default()
        };
        if let Commands::Generate { build_dir, seed } = &self.command {
            overrides.build_dir = build_dir.clone();
            overrides.seed = *seed;
        }
        overrides
    }
}
