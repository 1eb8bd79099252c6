//! Bounce buffer

/// Fixed-size scratch buffer owned by the engine
///
/// Sized once to the largest chunk any transfer can need: the bounce size
/// or the largest destination erase unit, whichever is bigger.
#[derive(Debug)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl ScratchBuffer {
    /// Allocate a scratch buffer of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
        }
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the first `len` bytes
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the capacity. The engine never asks for more
    /// than one chunk, and chunks never exceed the sizing rule above.
    pub fn get_mut(&mut self, len: usize) -> &mut [u8] {
        &mut self.buf[..len]
    }
}
