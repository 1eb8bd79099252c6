//! NOR flash backend
//!
//! Adapts a word-oriented [`NorDriver`] to the byte-oriented
//! [`MemoryBackend`] contract. Two hardware details stay inside this module:
//!
//! - The program primitive counts 16-bit words. Byte lengths are halved here,
//!   and unaligned leading/trailing bytes are padded with the erased value
//!   so the neighbouring byte of the word is left untouched.
//! - Some parts program two adjacent sectors as one unit. With
//!   `paired_sectors` the erase unit covers both sectors and erasing any
//!   offset inside the pair erases both.

use crate::backend::{MemoryBackend, NorDriver};
use crate::error::{BackendError, BackendOp, DriverFault};
use crate::region::Technology;

/// The erased value for flash memory (all bits set)
const ERASED_VALUE: u8 = 0xFF;

/// Bytes per program word
const WORD_SIZE: u32 = 2;

/// NOR flash geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NorGeometry {
    /// Device size in bytes
    pub size: u32,
    /// Physical sector size in bytes
    pub sector_size: u32,
    /// Whether adjacent sectors are programmed and erased as a pair
    pub paired_sectors: bool,
}

impl NorGeometry {
    /// Erase unit in bytes (one sector, or two when paired)
    pub fn erase_unit(&self) -> u32 {
        if self.paired_sectors {
            self.sector_size * 2
        } else {
            self.sector_size
        }
    }
}

/// NOR flash backend
pub struct NorBackend<D> {
    driver: D,
    geometry: NorGeometry,
}

impl<D: NorDriver> NorBackend<D> {
    /// Create a NOR backend over a vendor driver
    pub fn new(driver: D, geometry: NorGeometry) -> Self {
        Self { driver, geometry }
    }

    /// Get the geometry
    pub fn geometry(&self) -> NorGeometry {
        self.geometry
    }

    /// Get a reference to the driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Consume the backend and return the driver
    pub fn into_inner(self) -> D {
        self.driver
    }

    fn program(&mut self, offset: u32, data: &[u8], words: u32) -> Result<(), BackendError> {
        self.driver
            .program_words(offset, data, words)
            .map_err(|fault| BackendError::new(BackendOp::Write, offset, fault))
    }
}

impl<D: NorDriver> MemoryBackend for NorBackend<D> {
    fn technology(&self) -> Technology {
        Technology::Nor
    }

    fn size(&self) -> u32 {
        self.geometry.size
    }

    fn erase_unit(&self) -> Option<u32> {
        Some(self.geometry.erase_unit())
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), BackendError> {
        if !self.is_valid_range(offset, buf.len()) {
            return Err(BackendError::new(BackendOp::Read, offset, DriverFault::OutOfBounds));
        }
        self.driver
            .read(offset, buf)
            .map_err(|fault| BackendError::new(BackendOp::Read, offset, fault))
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), BackendError> {
        if !self.is_valid_range(offset, data.len()) {
            return Err(BackendError::new(BackendOp::Write, offset, DriverFault::OutOfBounds));
        }
        if data.is_empty() {
            return Ok(());
        }

        let mut offset = offset;
        let mut data = data;

        // Leading byte at an odd address: program its word with the low byte blank
        if offset % WORD_SIZE != 0 {
            self.program(offset - 1, &[ERASED_VALUE, data[0]], 1)?;
            offset += 1;
            data = &data[1..];
        }

        let whole = data.len() & !1;
        if whole > 0 {
            self.program(offset, &data[..whole], whole as u32 / WORD_SIZE)?;
        }

        // Trailing odd byte: program its word with the high byte blank
        if data.len() > whole {
            self.program(offset + whole as u32, &[data[whole], ERASED_VALUE], 1)?;
        }

        Ok(())
    }

    fn erase(&mut self, offset: u32) -> Result<(), BackendError> {
        let unit = self.geometry.erase_unit();
        let start = offset - offset % unit;
        if !self.is_valid_range(start, unit as usize) {
            return Err(BackendError::new(BackendOp::Erase, start, DriverFault::OutOfBounds));
        }

        let mut sector = start;
        while sector < start + unit {
            self.driver
                .erase_sector(sector)
                .map_err(|fault| BackendError::new(BackendOp::Erase, sector, fault))?;
            sector += self.geometry.sector_size;
        }
        log::trace!("NOR erase unit 0x{:08X} ({} bytes)", start, unit);
        Ok(())
    }
}
