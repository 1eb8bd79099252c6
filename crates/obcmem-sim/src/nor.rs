//! Simulated NOR flash

use obcmem_core::backend::NorDriver;
use obcmem_core::error::DriverFault;

use crate::ERASED_VALUE;

/// In-memory NOR flash with a word-oriented program primitive
///
/// Programming can only clear bits, like the real part. Programs must be
/// word aligned and erases must start on a physical sector boundary.
pub struct SimNorFlash {
    data: Vec<u8>,
    sector_size: u32,
}

impl SimNorFlash {
    /// Create an erased device
    pub fn new(size: u32, sector_size: u32) -> Self {
        Self {
            data: vec![ERASED_VALUE; size as usize],
            sector_size,
        }
    }

    /// Create a device with pre-filled contents
    pub fn with_data(size: u32, sector_size: u32, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(size, sector_size);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Physical sector size
    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, DriverFault> {
        let start = offset as usize;
        if start + len > self.data.len() {
            return Err(DriverFault::OutOfBounds);
        }
        Ok(start..start + len)
    }
}

impl NorDriver for SimNorFlash {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), DriverFault> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn program_words(&mut self, offset: u32, data: &[u8], words: u32) -> Result<(), DriverFault> {
        if offset % 2 != 0 || data.len() != words as usize * 2 {
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
