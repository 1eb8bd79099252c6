//! Transfer engine
//!
//! Moves bytes between classified address ranges. Directly addressable
//! regions are copied in one pass; everything else goes chunk by chunk
//! through a single scratch buffer, with flash destinations optionally
//! erased before they are programmed.

mod engine;
mod progress;
mod request;
mod scratch;

pub use engine::{TransferEngine, TransferError, TransferResult, TransferStats};
pub use progress::{NoProgress, TransferProgress};
pub use request::{CompletionCallback, Route, TransferRequest, TransferSpec};
pub use scratch::ScratchBuffer;

/// Default bounce chunk for destinations without an erase unit
pub const DEFAULT_BOUNCE_SIZE: u32 = 4096;

/// Hard ceiling on the length of a single transfer (1 MiB)
pub const MAX_TRANSFER_LEN: u32 = 1024 * 1024;

/// Engine sizing limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLimits {
    /// Chunk size used when the destination has no erase unit
    pub bounce_size: u32,
    /// Longest accepted transfer in bytes
    pub max_transfer: u32,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            bounce_size: DEFAULT_BOUNCE_SIZE,
            max_transfer: MAX_TRANSFER_LEN,
        }
    }
}
