//! Shared fixtures for dispatcher tests

#![allow(dead_code)]

use obcmem_core::config::{BoardConfig, RegionConfig};
use obcmem_core::region::RegionId;
use obcmem_dispatch::Dispatcher;
use obcmem_sim::SimBoard;

pub const INTERNAL_RAM: u32 = 0x2000_0000;
pub const EXTERNAL_RAM: u32 = 0x6000_0000;
pub const INTERNAL_NOR: u32 = 0x0800_0000;
pub const EXTERNAL_NOR: u32 = 0x6400_0000;
pub const QSPI: u32 = 0x9000_0000;

pub const REGION_SIZE: u32 = 256 * 1024;
pub const RAM_SIZE: u32 = 64 * 1024;
pub const QSPI_SECTOR: u32 = 4096;
pub const QUEUE_DEPTH: usize = 4;

/// A scaled-down version of the reference board
pub fn board() -> BoardConfig {
    let mut config = BoardConfig::new();
    config.name = Some("test-board".to_string());
    config.transfer.queue_depth = QUEUE_DEPTH;
    config.add_region(RegionConfig::nor(
        RegionId::InternalNor,
        INTERNAL_NOR,
        REGION_SIZE,
        16 * 1024,
        false,
    ));
    config.add_region(RegionConfig::ram(RegionId::InternalRam, INTERNAL_RAM, RAM_SIZE));
    config.add_region(RegionConfig::ram(RegionId::ExternalRam, EXTERNAL_RAM, RAM_SIZE));
    config.add_region(RegionConfig::nor(
        RegionId::ExternalNor,
        EXTERNAL_NOR,
        REGION_SIZE,
        8 * 1024,
        true,
    ));
    config.add_region(RegionConfig::qspi(
        RegionId::Qspi,
        QSPI,
        REGION_SIZE,
        QSPI_SECTOR,
        256,
    ));
    config
}

/// Dispatcher over a fully simulated board
pub fn dispatcher() -> (Dispatcher, SimBoard) {
    let config = board();
    let (handles, sim) = SimBoard::bring_up(&config);
    let dispatcher = Dispatcher::init(&config, handles).unwrap();
    (dispatcher, sim)
}

/// Bytes `0, 1, 2, ...` wrapping at 256
pub fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}
