//! obcmem-sim - Simulated board memories
//!
//! In-memory stand-ins for the vendor drivers of an on-board computer, plus
//! an instrumented backend wrapper that counts calls and injects faults.
//! Used by tests and by the command-line tool, which has no real hardware
//! to talk to.
//!
//! - [`SimNorFlash`] - word-programmed NOR flash
//! - [`SimQspiFlash`] - page-programmed QSPI flash
//! - [`Instrumented`] / [`Probe`] - call counters and fault injection
//! - [`SimBoard`] - bring up every region of a [`BoardConfig`](obcmem_core::config::BoardConfig)

#![warn(missing_docs)]

mod board;
mod nor;
mod probe;
mod qspi;

pub use board::SimBoard;
pub use nor::SimNorFlash;
pub use probe::{Instrumented, Probe};
pub use qspi::SimQspiFlash;

/// The erased value for flash memory (all bits set)
pub const ERASED_VALUE: u8 = 0xFF;
