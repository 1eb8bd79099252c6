//! obcmem - Memory transfer tool for an on-board computer
//!
//! Drives the transfer subsystem against a simulated board: every region of
//! the board description is backed by an in-memory RAM, NOR or QSPI model,
//! so transfers, erase behaviour and the self-test can be exercised without
//! hardware.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use obcmem_core::config::BoardConfig;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match load_board(cli.board.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load board description: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Regions { toml } => commands::regions::run_regions(&config, toml),
        Commands::Classify { addr, len } => commands::regions::run_classify(&config, addr, len),
        Commands::Copy(args) => commands::copy::run_copy(&config, &args),
        Commands::Selftest {
            region,
            pattern,
            stuck_low,
        } => commands::selftest::run_selftest(&config, region, pattern, stuck_low),
    }
}

/// Load a board description, falling back to the reference board
fn load_board(path: Option<&Path>) -> Result<BoardConfig, obcmem_core::error::ConfigError> {
    let config = match path {
        Some(path) => {
            log::info!("Loading board description from {}", path.display());
            BoardConfig::from_toml_file(path)?
        }
        None => BoardConfig::default(),
    };
    config.validate()?;

    log::info!(
        "Board {}: {} region(s)",
        config.name.as_deref().unwrap_or("reference"),
        config.regions.len()
    );
    Ok(config)
}
