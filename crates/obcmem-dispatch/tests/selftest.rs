//! Self-test utility against a simulated board

mod common;

use common::*;
use obcmem_core::config::{BoardConfig, RegionConfig};
use obcmem_core::region::RegionId;
use obcmem_dispatch::{selftest, Dispatcher, SelfTestStatus};
use obcmem_sim::SimBoard;

#[test]
fn test_pattern_passes_on_every_region() {
    let (dispatcher, _sim) = dispatcher();
    for id in RegionId::ALL {
        assert!(dispatcher.pattern_test(id), "pattern test failed on {}", id);
    }
}

#[test]
fn test_pattern_fails_when_bit_zero_is_dropped() {
    for id in [RegionId::InternalRam, RegionId::Qspi, RegionId::ExternalNor] {
        let (dispatcher, sim) = dispatcher();
        sim.probe(id).unwrap().stuck_low(0x01);
        assert!(!dispatcher.pattern_test(id), "stuck bit missed on {}", id);
    }
}

#[test]
fn test_pattern_test_writes_both_patterns() {
    let (dispatcher, sim) = dispatcher();
    let probe = sim.probe(RegionId::Qspi).unwrap();
    assert!(selftest::pattern_test(&dispatcher, RegionId::Qspi));
    // One erase per pattern
    assert_eq!(probe.erase_log(), vec![0, 0]);

    let mut out = vec![0u8; selftest::PATTERN_LEN];
    dispatcher.read_bytes(QSPI, &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 0xAA));
}

#[test]
fn test_region_round_trip_passes() {
    let (dispatcher, _sim) = dispatcher();
    for id in RegionId::ALL {
        let status = dispatcher.self_test(id);
        assert!(status.passed(), "{}: {}", id, status);
        assert_eq!(status.bits(), 0);
    }
}

#[test]
fn test_region_round_trip_erases_whole_region() {
    let (dispatcher, sim) = dispatcher();
    let probe = sim.probe(RegionId::Qspi).unwrap();
    dispatcher.self_test(RegionId::Qspi);
    assert_eq!(probe.erases(), (REGION_SIZE / QSPI_SECTOR) as usize);

    // Nothing to erase on RAM
    let probe = sim.probe(RegionId::ExternalRam).unwrap();
    dispatcher.self_test(RegionId::ExternalRam);
    assert_eq!(probe.erases(), 0);
}

#[test]
fn test_region_erase_failure() {
    let (dispatcher, sim) = dispatcher();
    sim.probe(RegionId::Qspi).unwrap().fail_erase_at(Some(0));
    assert_eq!(
        dispatcher.self_test(RegionId::Qspi),
        SelfTestStatus::ERASE_FAILED
    );
}

#[test]
fn test_region_write_failure() {
    let (dispatcher, sim) = dispatcher();
    sim.probe(RegionId::Qspi).unwrap().fail_write_at(Some(0));
    assert_eq!(
        dispatcher.self_test(RegionId::Qspi),
        SelfTestStatus::WRITE_FAILED | SelfTestStatus::DATA_MISMATCH
    );
}

#[test]
fn test_region_read_failure() {
    let (dispatcher, sim) = dispatcher();
    sim.probe(RegionId::InternalRam).unwrap().fail_read_at(Some(0));
    let status = dispatcher.self_test(RegionId::InternalRam);
    assert_eq!(
        status,
        SelfTestStatus::READ_FAILED | SelfTestStatus::DATA_MISMATCH
    );
    assert_eq!(status.bits(), 0b1001);
}

#[test]
fn test_region_data_mismatch() {
    let (dispatcher, sim) = dispatcher();
    sim.probe(RegionId::ExternalRam).unwrap().stuck_low(0x01);
    assert_eq!(
        dispatcher.self_test(RegionId::ExternalRam),
        SelfTestStatus::DATA_MISMATCH
    );
}

#[test]
fn test_unregistered_region() {
    let config = board();
    let (mut handles, _sim) = SimBoard::bring_up(&config);
    drop(handles.take(RegionId::Qspi));
    let dispatcher = Dispatcher::init(&config, handles).unwrap();

    assert_eq!(dispatcher.classify(QSPI, 1), None);
    assert!(!dispatcher.pattern_test(RegionId::Qspi));
    assert_eq!(dispatcher.self_test(RegionId::Qspi), SelfTestStatus::all());
    assert!(dispatcher.self_test(RegionId::InternalRam).passed());
}

#[test]
fn test_region_too_small_for_a_word() {
    let mut config = BoardConfig::new();
    config.add_region(RegionConfig::ram(RegionId::InternalRam, INTERNAL_RAM, 3));
    let (handles, sim) = SimBoard::bring_up(&config);
    let dispatcher = Dispatcher::init(&config, handles).unwrap();

    assert_eq!(
        dispatcher.self_test(RegionId::InternalRam),
        SelfTestStatus::DATA_MISMATCH
    );
    assert_eq!(sim.probe(RegionId::InternalRam).unwrap().calls(), 0);
}
