//! QSPI flash backend
//!
//! Adapts a [`QspiDriver`] to the [`MemoryBackend`] contract. Programs are
//! split on page boundaries; erase works on single sectors.

use crate::backend::{MemoryBackend, QspiDriver};
use crate::error::{BackendError, BackendOp, DriverFault};
use crate::region::Technology;

/// QSPI flash geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QspiGeometry {
    /// Device size in bytes
    pub size: u32,
    /// Sector (erase) size in bytes
    pub sector_size: u32,
    /// Program page size in bytes
    pub page_size: u32,
}

/// QSPI flash backend
pub struct QspiBackend<D> {
    driver: D,
    geometry: QspiGeometry,
}

impl<D: QspiDriver> QspiBackend<D> {
    /// Create a QSPI backend over a vendor driver
    pub fn new(driver: D, geometry: QspiGeometry) -> Self {
        Self { driver, geometry }
    }

    /// Get the geometry
    pub fn geometry(&self) -> QspiGeometry {
        self.geometry
    }

    /// Get a reference to the driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Consume the backend and return the driver
    pub fn into_inner(self) -> D {
        self.driver
    }
}

impl<D: QspiDriver> MemoryBackend for QspiBackend<D> {
    fn technology(&self) -> Technology {
        Technology::Qspi
    }

    fn size(&self) -> u32 {
        self.geometry.size
    }

    fn erase_unit(&self) -> Option<u32> {
        Some(self.geometry.sector_size)
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

        let page_size = self.geometry.page_size;
        let mut written = 0usize;
        while written < data.len() {
            let addr = offset + written as u32;
            // Stay within the current page
            let room = (page_size - addr % page_size) as usize;
            let chunk = core::cmp::min(room, data.len() - written);
            self.driver
                .page_program(addr, &data[written..written + chunk])
                .map_err(|fault| BackendError::new(BackendOp::Write, addr, fault))?;
            written += chunk;
        }
        Ok(())
    }

    fn erase(&mut self, offset: u32) -> Result<(), BackendError> {
        let sector = offset - offset % self.geometry.sector_size;
        if !self.is_valid_range(sector, self.geometry.sector_size as usize) {
            return Err(BackendError::new(BackendOp::Erase, sector, DriverFault::OutOfBounds));
        }
        self.driver
            .erase_sector(sector)
            .map_err(|fault| BackendError::new(BackendOp::Erase, sector, fault))
    }
}
