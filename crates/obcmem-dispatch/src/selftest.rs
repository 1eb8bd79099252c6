//! Self-test utility
//!
//! Write/verify round trips that exercise a region end to end through the
//! dispatcher's immediate path. Both tests are destructive: they overwrite
//! the start of the region, and [`region_test`] erases all of it.

use bitflags::bitflags;
use obcmem_core::region::RegionId;

use crate::Dispatcher;

/// Bytes written per pattern by [`pattern_test`]
pub const PATTERN_LEN: usize = 256;

/// Patterns used by [`pattern_test`], catching stuck-at-0 and stuck-at-1 bits
pub const PATTERNS: [u8; 2] = [0x55, 0xAA];

/// Bytes written by [`region_test`], capped at the region length
pub const REGION_TEST_LEN: u32 = 4096;

bitflags! {
    /// Packed outcome of [`region_test`]
    ///
    /// The bit layout is consumed outside this crate and must not change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SelfTestStatus: u8 {
        /// Data read back differs from data written
        const DATA_MISMATCH = 1 << 0;
        /// The erase call reported failure
        const ERASE_FAILED = 1 << 1;
        /// The write call reported failure
        const WRITE_FAILED = 1 << 2;
        /// The read call reported failure
        const READ_FAILED = 1 << 3;
    }
}

impl SelfTestStatus {
    /// Whether every step succeeded
    pub fn passed(self) -> bool {
        self.is_empty()
    }
}

impl core::fmt::Display for SelfTestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return write!(f, "pass");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{}", name)?;
            first = false;
        }
        Ok(())
    }
}

/// Write 0x55 then 0xAA to the start of a region and verify each
///
/// Each pattern is written with erase requested. Returns `false` on the
/// first failed call or mismatch, and for regions that are not registered.
pub fn pattern_test(dispatcher: &Dispatcher, region: RegionId) -> bool {
    let Some(span) = dispatcher.regions().get(region).copied() else {
        log::warn!("Pattern test: {} is not registered", region);
        return false;
    };

    let len = PATTERN_LEN.min(span.length as usize);
    let mut readback = vec![0u8; len];

    for pattern in PATTERNS {
        let data = vec![pattern; len];
        if let Err(e) = dispatcher.write_bytes(span.base, &data, true) {
            log::warn!("Pattern test: writing 0x{:02X} to {} failed: {}", pattern, region, e);
            return false;
        }
        if let Err(e) = dispatcher.read_bytes(span.base, &mut readback) {
            log::warn!("Pattern test: reading {} failed: {}", region, e);
            return false;
        }
        if let Some(pos) = readback.iter().position(|&b| b != pattern) {
            log::warn!(
                "Pattern test: {} at 0x{:08X} reads 0x{:02X}, expected 0x{:02X}",
                region,
                span.base + pos as u32,
                readback[pos],
                pattern
            );
            return false;
        }
    }

    log::debug!("Pattern test passed on {}", region);
    true
}

/// Erase a region, write an incrementing 32-bit pattern, read it back
///
/// Every step runs even if an earlier one failed; each failure sets its
/// bit. A failed read also sets [`SelfTestStatus::DATA_MISMATCH`], since the
/// data could not be verified, as does a region too small for one 32-bit
/// word. Regions that are not registered report every bit.
pub fn region_test(dispatcher: &Dispatcher, region: RegionId) -> SelfTestStatus {
    let Some(span) = dispatcher.regions().get(region).copied() else {
        log::warn!("Region test: {} is not registered", region);
        return SelfTestStatus::all();
    };

    let words = (REGION_TEST_LEN.min(span.length) / 4) as usize;
    if words == 0 {
        log::warn!("Region test: {} is too small to hold a test word", region);
        return SelfTestStatus::DATA_MISMATCH;
    }
    let expected: Vec<u32> = (0..words as u32).collect();
    let data: Vec<u8> = expected.iter().flat_map(|w| w.to_le_bytes()).collect();
    let mut status = SelfTestStatus::empty();

    if let Err(e) = dispatcher.erase(span.base, span.length) {
        log::warn!("Region test: erasing {} failed: {}", region, e);
        status |= SelfTestStatus::ERASE_FAILED;
    }

    if let Err(e) = dispatcher.write_bytes(span.base, &data, false) {
        log::warn!("Region test: writing {} failed: {}", region, e);
        status |= SelfTestStatus::WRITE_FAILED;
    }

    let mut readback = vec![0u8; data.len()];
    match dispatcher.read_bytes(span.base, &mut readback) {
        Ok(()) => {
            let mismatch = readback
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .zip(&expected)
                .position(|(got, &want)| got != want);
            if let Some(index) = mismatch {
                log::warn!(
                    "Region test: {} word {} at 0x{:08X} does not match",
                    region,
                    index,
                    span.base + index as u32 * 4
                );
                status |= SelfTestStatus::DATA_MISMATCH;
            }
        }
        Err(e) => {
            log::warn!("Region test: reading {} failed: {}", region, e);
            status |= SelfTestStatus::READ_FAILED | SelfTestStatus::DATA_MISMATCH;
        }
    }

    log::debug!("Region test on {}: {}", region, status);
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bit_layout() {
        assert_eq!(SelfTestStatus::DATA_MISMATCH.bits(), 0b0001);
        assert_eq!(SelfTestStatus::ERASE_FAILED.bits(), 0b0010);
        assert_eq!(SelfTestStatus::WRITE_FAILED.bits(), 0b0100);
        assert_eq!(SelfTestStatus::READ_FAILED.bits(), 0b1000);
        assert_eq!(SelfTestStatus::all().bits(), 0x0F);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SelfTestStatus::empty().to_string(), "pass");
        assert_eq!(
            (SelfTestStatus::DATA_MISMATCH | SelfTestStatus::READ_FAILED).to_string(),
            "DATA_MISMATCH | READ_FAILED"
        );
    }
}
