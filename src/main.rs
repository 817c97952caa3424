//! Strata CLI - Layered Art Collection Generator
//!
//! Command-line interface for the Strata generator.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use strata::cli::{commands, Cli, Commands};
use strata::StrataError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose || commands::debug_logs_requested(&cli.config) {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    info!("Strata v{}", env!("CARGO_PKG_VERSION"));

    match handle_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            if let Some(err) = e.downcast_ref::<StrataError>() {
                for suggestion in err.recovery_suggestions() {
                    eprintln!("  hint: {}", suggestion);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn handle_command(cli: &Cli) -> anyhow::Result<()> {
    let overrides = cli.overrides();
    let config = cli.config.as_path();

    match &cli.command {
        Commands::Generate { .. } => commands::generate(config, &overrides)
            .map(|_| ())
            .with_context(|| format!("generation from {} failed", config.display())),
        Commands::Catalog => commands::catalog(config, &overrides)
            .with_context(|| format!("cannot list catalog for {}", config.display())),
        Commands::Decode { dna, wave } => commands::decode(config, &overrides, dna, *wave)
            .with_context(|| format!("cannot decode DNA against wave {}", wave)),
    }
}
