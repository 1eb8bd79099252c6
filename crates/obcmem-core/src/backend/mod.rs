//! Memory backends
//!
//! Each memory technology is wrapped in an adapter implementing
//! [`MemoryBackend`]:
//!
//! - [`RamBackend`] - direct byte copies, no erase
//! - [`NorBackend`] - word-oriented programming, optional paired sectors
//! - [`QspiBackend`] - page programming, sector erase
//!
//! Vendor drivers plug in underneath through [`NorDriver`] and
//! [`QspiDriver`].

mod nor;
mod qspi;
mod ram;
mod traits;

pub use nor::{NorBackend, NorGeometry};
pub use qspi::{QspiBackend, QspiGeometry};
pub use ram::RamBackend;
pub use traits::{DynBackend, MemoryBackend, NorDriver, QspiDriver};
