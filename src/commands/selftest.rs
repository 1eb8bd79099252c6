//! Self-test command

use obcmem_core::config::BoardConfig;
use obcmem_core::region::RegionId;

use super::{bring_up, CommandError};

/// Run the pattern test or region round trip on one or every region
pub fn run_selftest(
    config: &BoardConfig,
    region: Option<RegionId>,
    pattern: bool,
    stuck_low: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (dispatcher, sim) = bring_up(config)?;

    let regions: Vec<RegionId> = match region {
        Some(id) => vec![id],
        None => dispatcher.regions().iter().map(|span| span.id).collect(),
    };

    if let Some(mask) = stuck_low {
        for id in &regions {
            if let Some(probe) = sim.probe(*id) {
                probe.stuck_low(mask as u8);
            }
        }
        log::info!("Simulating data lines 0x{:02X} stuck low", mask as u8);
    }

    let mut failed = 0;
    for id in regions {
        if pattern {
            let passed = dispatcher.pattern_test(id);
            println!("{:<14} {}", id.to_string(), if passed { "pass" } else { "FAIL" });
            if !passed {
                failed += 1;
            }
        } else {
            let status = dispatcher.self_test(id);
            println!("{:<14} 0x{:X} ({})", id.to_string(), status.bits(), status);
            if !status.passed() {
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CommandError::SelfTestFailed(failed).into());
    }
    println!("All regions passed");
    Ok(())
}
