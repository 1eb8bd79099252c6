//! Command implementations

pub mod copy;
pub mod regions;
pub mod selftest;

use obcmem_core::config::BoardConfig;
use obcmem_dispatch::Dispatcher;
use obcmem_sim::SimBoard;
use thiserror::Error;

/// Failures reported by commands after the operation itself ran
#[derive(Error, Debug)]
pub enum CommandError {
    /// Source and destination differ after a copy
    #[error("verification failed: first difference at offset 0x{0:X}")]
    VerifyFailed(usize),
    /// One or more regions failed the self-test
    #[error("self-test failed on {0} region(s)")]
    SelfTestFailed(usize),
}

/// Simulate every region of the board and start a dispatcher over it
pub fn bring_up(config: &BoardConfig) -> Result<(Dispatcher, SimBoard), obcmem_core::Error> {
    let (handles, sim) = SimBoard::bring_up(config);
    let dispatcher = Dispatcher::init(config, handles)?;
    Ok((dispatcher, sim))
}
