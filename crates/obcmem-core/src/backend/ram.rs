//! RAM backend
//!
//! Directly addressable memory: reads and writes are plain byte copies and
//! there is nothing to erase.

use crate::backend::MemoryBackend;
use crate::error::{BackendError, BackendOp, DriverFault};
use crate::region::Technology;

/// RAM backend over any byte storage
///
/// On hardware the storage is a `&'static mut [u8]` over the linker-provided
/// RAM window; in tests and simulation it is usually a `Vec<u8>`.
pub struct RamBackend<S> {
    storage: S,
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> RamBackend<S> {
    /// Create a RAM backend over `storage`
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Get a reference to the storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consume the backend and return the storage
    pub fn into_inner(self) -> S {
        self.storage
    }

    fn check(&self, op: BackendOp, offset: u32, len: usize) -> Result<usize, BackendError> {
        if self.is_valid_range(offset, len) {
            Ok(offset as usize)
        } else {
            Err(BackendError::new(op, offset, DriverFault::OutOfBounds))
        }
    }
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> MemoryBackend for RamBackend<S> {
    fn technology(&self) -> Technology {
        Technology::Ram
    }

    fn size(&self) -> u32 {
        self.storage.as_ref().len() as u32
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), BackendError> {
        let start = self.check(BackendOp::Read, offset, buf.len())?;
        buf.copy_from_slice(&self.storage.as_ref()[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), BackendError> {
        let start = self.check(BackendOp::Write, offset, data.len())?;
        self.storage.as_mut()[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn mapped(&self) -> Option<&[u8]> {
        Some(self.storage.as_ref())
    }

    fn mapped_mut(&mut self) -> Option<&mut [u8]> {
        Some(self.storage.as_mut())
    }
}
