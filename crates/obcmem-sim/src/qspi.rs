//! Simulated QSPI flash

use obcmem_core::backend::QspiDriver;
use obcmem_core::error::DriverFault;

use crate::ERASED_VALUE;

/// In-memory QSPI flash with page programming
pub struct SimQspiFlash {
    data: Vec<u8>,
    sector_size: u32,
    page_size: u32,
}

impl SimQspiFlash {
    /// Create an erased device
    pub fn new(size: u32, sector_size: u32, page_size: u32) -> Self {
        Self {
            data: vec![ERASED_VALUE; size as usize],
            sector_size,
            page_size,
        }
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, DriverFault> {
        let start = offset as usize;
        if start + len > self.data.len() {
            return Err(DriverFault::OutOfBounds);
        }
        Ok(start..start + len)
    }
}

impl QspiDriver for SimQspiFlash {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), DriverFault> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn page_program(&mut self, offset: u32, data: &[u8]) -> Result<(), DriverFault> {
        // A page program wraps inside the page on real parts; refuse instead
        if (offset % self.page_size) as usize + data.len() > self.page_size as usize {
            return Err(DriverFault::Misaligned);
        }
        let range = self.range(offset, data.len())?;
        for (cell, &byte) in self.data[range].iter_mut().zip(data) {
            *cell &= byte;
        }
        Ok(())
    }

    fn erase_sector(&mut self, offset: u32) -> Result<(), DriverFault> {
        if offset % self.sector_size != 0 {
            return Err(DriverFault::Misaligned);
        }
        let range = self.range(offset, self.sector_size as usize)?;
        self.data[range].fill(ERASED_VALUE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_program_stays_in_page() {
        let mut qspi = SimQspiFlash::new(0x2000, 0x1000, 256);
        qspi.page_program(0xF0, &[0u8; 16]).unwrap();
        assert_eq!(
            qspi.page_program(0xF0, &[0u8; 17]),
            Err(DriverFault::Misaligned)
        );
        assert!(qspi.data()[0xF0..0x100].iter().all(|&b| b == 0));
        assert_eq!(qspi.data()[0x100], ERASED_VALUE);
    }

    #[test]
    fn test_erase_sector() {
        let mut qspi = SimQspiFlash::new(0x2000, 0x1000, 256);
        qspi.page_program(0x1000, &[0u8; 4]).unwrap();
        assert_eq!(qspi.erase_sector(0x1001), Err(DriverFault::Misaligned));
        qspi.erase_sector(0x1000).unwrap();
        assert!(qspi.data().iter().all(|&b| b == ERASED_VALUE));
        assert_eq!(qspi.erase_sector(0x2000), Err(DriverFault::OutOfBounds));
    }
}
