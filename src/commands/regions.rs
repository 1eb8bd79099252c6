//! Region listing and classification

use obcmem_core::config::{format_size, BoardConfig};
use obcmem_core::region::RegionMap;
use obcmem_core::Status;

/// Print the board's region table
pub fn run_regions(config: &BoardConfig, as_toml: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_toml {
        print!("{}", config.to_toml_string());
        return Ok(());
    }

    if let Some(name) = &config.name {
        println!("Board: {}", name);
    }
    println!(
        "{:<14} {:<5} {:>12} {:>12} {:>10} {:>10}",
        "REGION", "TECH", "BASE", "END", "SIZE", "ERASE"
    );
    println!("{}", "-".repeat(68));

    for region in &config.regions {
        let span = region.span();
        let erase = region
            .erase_unit()
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:<5} {:>#12x} {:>#12x} {:>10} {:>10}",
            region.id.to_string(),
            region.id.technology().to_string(),
            span.base,
            span.end - 1,
            format_size(region.size),
            erase
        );
    }

    println!();
    println!(
        "Transfers: bounce buffer {}, at most {} per request, queue depth {}",
        format_size(config.transfer.bounce_size),
        format_size(config.transfer.max_transfer),
        config.transfer.queue_depth
    );
    Ok(())
}

/// Classify a range against the board's region table
pub fn run_classify(
    config: &BoardConfig,
    addr: u32,
    len: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let map = RegionMap::new(config.regions.iter().map(|r| r.span()).collect());
    let region = map.classify(addr, len);
    let status = Status::from_classification(region);

    match region {
        Some(id) => println!(
            "0x{:08X}..+0x{:X}: {} ({}), status {}",
            addr,
            len,
            id,
            id.technology(),
            status.code()
        ),
        None => println!(
            "0x{:08X}..+0x{:X}: not within a single region, status {}",
            addr,
            len,
            status.code()
        ),
    }
    Ok(())
}
