//! CLI argument parsing

use clap::{Parser, Subcommand};
use obcmem_core::config::parse_size;
use obcmem_core::region::RegionId;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16)
            .map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "obcmem")]
#[command(author, version, about = "On-board computer memory transfer tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Board description (TOML format)
    /// Defaults to the built-in reference board
    #[arg(short, long, global = true)]
    pub board: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments of the copy command
#[derive(clap::Args, Debug, Clone)]
pub struct CopyArgs {
    /// Source address (hex with 0x prefix, or decimal)
    #[arg(short, long, value_parser = parse_hex_u32)]
    pub src: u32,

    /// Destination address (hex with 0x prefix, or decimal)
    #[arg(short, long, value_parser = parse_hex_u32)]
    pub dst: u32,

    /// Number of bytes to copy (accepts KiB/MiB suffixes)
    #[arg(short, long, value_parser = parse_size)]
    pub len: u32,

    /// Erase the destination before programming it
    #[arg(short, long)]
    pub erase: bool,

    /// Hand the transfer to the worker thread instead of running it inline
    #[arg(short, long)]
    pub queued: bool,

    /// Fill the source with an incrementing byte pattern first
    #[arg(long)]
    pub seed: bool,

    /// Read both ranges back and compare them afterwards
    #[arg(long)]
    pub verify: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the regions of the board
    Regions {
        /// Print the board description as TOML instead of a table
        #[arg(long)]
        toml: bool,
    },

    /// Report which region, if any, wholly contains an address range
    Classify {
        /// Start address (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u32)]
        addr: u32,

        /// Range length (accepts KiB/MiB suffixes)
        #[arg(value_parser = parse_size, default_value = "1")]
        len: u32,
    },

    /// Copy a range between regions of a simulated board
    Copy(CopyArgs),

    /// Run the destructive self-test on a simulated board
    Selftest {
        /// Region to test (defaults to every region)
        #[arg(short, long)]
        region: Option<RegionId>,

        /// Run the 0x55/0xAA pattern test instead of the region round trip
        #[arg(short, long)]
        pattern: bool,

        /// Simulate data lines stuck low (bit mask, e.g. 0x01)
        #[arg(long, value_parser = parse_hex_u32)]
        stuck_low: Option<u32>,
    },
}
