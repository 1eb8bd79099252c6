//! Backend and vendor driver traits
//!
//! [`MemoryBackend`] is the uniform, byte-oriented contract the transfer
//! engine works against. The vendor driver traits ([`NorDriver`],
//! [`QspiDriver`]) describe the raw primitives a board supplies; the
//! adapters in this module turn those into a `MemoryBackend`.

use crate::error::{BackendError, DriverFault};
use crate::region::Technology;

/// Uniform memory backend
///
/// All offsets are relative to the start of the backend. The engine
/// translates bus addresses before calling in.
///
/// # Erase
///
/// Backends that must be erased before programming report their erase unit
/// through [`erase_unit`](MemoryBackend::erase_unit). The unit may span more
/// than one physical sector when the hardware programs sectors in pairs;
/// the engine only ever sees the unit. Backends without an erase concept
/// keep the default `None` and a no-op [`erase`](MemoryBackend::erase).
pub trait MemoryBackend {
    /// Technology of this backend
    fn technology(&self) -> Technology;

    /// Backend size in bytes
    fn size(&self) -> u32;

    /// Erase unit in bytes, or `None` when the backend is not erase-granular
    fn erase_unit(&self) -> Option<u32> {
        None
    }

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), BackendError>;

    /// Program `data` starting at `offset`
    ///
    /// Flash backends expect the target to be erased; this never erases.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), BackendError>;

    /// Erase the unit containing `offset`
    fn erase(&mut self, _offset: u32) -> Result<(), BackendError> {
        Ok(())
    }

    /// Direct view of the backend contents, for memory-mapped backends
    fn mapped(&self) -> Option<&[u8]> {
        None
    }

    /// Mutable direct view of the backend contents
    fn mapped_mut(&mut self) -> Option<&mut [u8]> {
        None
    }

    /// Check if a range is valid for this backend
    fn is_valid_range(&self, offset: u32, len: usize) -> bool {
        // Use u64 arithmetic to avoid truncation when len > u32::MAX
        offset as u64 + len as u64 <= self.size() as u64
    }
}

/// Boxed backend as stored in the region table
pub type DynBackend = dyn MemoryBackend + Send;

/// Raw NOR flash driver primitives
///
/// The program primitive is word oriented: it takes a count of 16-bit words
/// and expects `data` to hold exactly `2 * words` bytes, low byte first.
pub trait NorDriver {
    /// Read bytes starting at `offset`
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), DriverFault>;

    /// Program `words` 16-bit words at the word-aligned byte `offset`
    fn program_words(&mut self, offset: u32, data: &[u8], words: u32) -> Result<(), DriverFault>;

    /// Erase the physical sector starting at `offset`
    fn erase_sector(&mut self, offset: u32) -> Result<(), DriverFault>;
}

/// Raw QSPI flash driver primitives
pub trait QspiDriver {
    /// Read bytes starting at `offset`
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), DriverFault>;

    /// Program at most one page; `data` must not cross a page boundary
    fn page_program(&mut self, offset: u32, data: &[u8]) -> Result<(), DriverFault>;

    /// Erase the sector starting at `offset`
    fn erase_sector(&mut self, offset: u32) -> Result<(), DriverFault>;
}

impl<D: NorDriver + ?Sized> NorDriver for &mut D {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), DriverFault> {
        (**self).read(offset, buf)
    }

    fn program_words(&mut self, offset: u32, data: &[u8], words: u32) -> Result<(), DriverFault> {
        (**self).program_words(offset, data, words)
    }

    fn erase_sector(&mut self, offset: u32) -> Result<(), DriverFault> {
        (**self).erase_sector(offset)
    }
}

impl<D: QspiDriver + ?Sized> QspiDriver for &mut D {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), DriverFault> {
        (**self).read(offset, buf)
    }

    fn page_program(&mut self, offset: u32, data: &[u8]) -> Result<(), DriverFault> {
        (**self).page_program(offset, data)
    }

    fn erase_sector(&mut self, offset: u32) -> Result<(), DriverFault> {
        (**self).erase_sector(offset)
    }
}
