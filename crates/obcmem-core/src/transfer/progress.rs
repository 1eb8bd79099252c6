//! Transfer progress reporting

/// Observer for the progress of a single transfer
pub trait TransferProgress {
    /// Called once before any data moves
    fn started(&mut self, total_bytes: u32);

    /// Called after a destination erase unit has been erased
    fn erased(&mut self, addr: u32, len: u32);

    /// Called after each chunk with the total bytes programmed so far
    fn advanced(&mut self, bytes_done: u32);
}

/// A no-op progress reporter
pub struct NoProgress;

impl TransferProgress for NoProgress {
    fn started(&mut self, _total_bytes: u32) {}
    fn erased(&mut self, _addr: u32, _len: u32) {}
    fn advanced(&mut self, _bytes_done: u32) {}
}
