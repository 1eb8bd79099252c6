//! Instrumented backends
//!
//! [`Instrumented`] wraps any [`MemoryBackend`] and reports every call to a
//! shared [`Probe`]. The probe stays with the test after the backend has
//! been moved into a registry, so call counts and erase logs can be checked
//! from outside, and faults can be switched on while transfers run.
//!
//! Direct memory-to-memory copies go through the mapped view and are not
//! counted. The mapped view is hidden while any fault is armed so that
//! every access reaches the fault checks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use obcmem_core::backend::MemoryBackend;
use obcmem_core::error::{BackendError, BackendOp, DriverFault};
use obcmem_core::region::Technology;

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    fail_read_at: Option<u32>,
    fail_write_at: Option<u32>,
    fail_erase_at: Option<u32>,
    stuck_low: u8,
}

impl Faults {
    fn armed(&self) -> bool {
        self.fail_read_at.is_some()
            || self.fail_write_at.is_some()
            || self.fail_erase_at.is_some()
            || self.stuck_low != 0
    }
}

#[derive(Debug, Default)]
struct Logs {
    writes: Vec<(u32, usize)>,
    erases: Vec<u32>,
}

#[derive(Debug, Default)]
struct ProbeState {
    reads: AtomicUsize,
    writes: AtomicUsize,
    erases: AtomicUsize,
    logs: Mutex<Logs>,
    faults: Mutex<Faults>,
}

/// Shared view of an instrumented backend
#[derive(Debug, Clone, Default)]
pub struct Probe {
    state: Arc<ProbeState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Probe {
    /// Create a probe with no calls recorded and no faults armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read calls
    pub fn reads(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls
    pub fn writes(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    /// Number of erase calls
    pub fn erases(&self) -> usize {
        self.state.erases.load(Ordering::SeqCst)
    }

    /// Total number of backend calls
    pub fn calls(&self) -> usize {
        self.reads() + self.writes() + self.erases()
    }

    /// Offsets passed to erase, in call order
    pub fn erase_log(&self) -> Vec<u32> {
        lock(&self.state.logs).erases.clone()
    }

    /// Offset and length of every write, in call order
    pub fn write_log(&self) -> Vec<(u32, usize)> {
        lock(&self.state.logs).writes.clone()
    }

    /// Clear counters and logs; armed faults stay armed
    pub fn reset(&self) {
        self.state.reads.store(0, Ordering::SeqCst);
        self.state.writes.store(0, Ordering::SeqCst);
        self.state.erases.store(0, Ordering::SeqCst);
        *lock(&self.state.logs) = Logs::default();
    }

    /// Fail any read that covers `offset`
    pub fn fail_read_at(&self, offset: Option<u32>) {
        lock(&self.state.faults).fail_read_at = offset;
    }

    /// Fail any write that covers `offset`
    pub fn fail_write_at(&self, offset: Option<u32>) {
        lock(&self.state.faults).fail_write_at = offset;
    }

    /// Fail any erase of the unit that contains `offset`
    pub fn fail_erase_at(&self, offset: Option<u32>) {
        lock(&self.state.faults).fail_erase_at = offset;
    }

    /// Force the bits in `mask` low in every byte written
    pub fn stuck_low(&self, mask: u8) {
        lock(&self.state.faults).stuck_low = mask;
    }

    /// Disarm every fault
    pub fn clear_faults(&self) {
        *lock(&self.state.faults) = Faults::default();
    }

    fn faults(&self) -> Faults {
        *lock(&self.state.faults)
    }
}

fn covers(at: Option<u32>, offset: u32, len: usize) -> bool {
    at.is_some_and(|at| at >= offset && (at as u64) < offset as u64 + len as u64)
}

/// Backend wrapper that reports to a [`Probe`]
pub struct Instrumented<B> {
    inner: B,
    probe: Probe,
    staging: Vec<u8>,
}

impl<B: MemoryBackend> Instrumented<B> {
    /// Wrap a backend; returns the wrapper and its probe
    pub fn new(inner: B) -> (Self, Probe) {
        let probe = Probe::new();
        let wrapper = Self {
            inner,
            probe: probe.clone(),
            staging: Vec::new(),
        };
        (wrapper, probe)
    }

    /// Get a reference to the wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: MemoryBackend> MemoryBackend for Instrumented<B> {
    fn technology(&self) -> Technology {
        self.inner.technology()
    }

    fn size(&self) -> u32 {
        self.inner.size()
    }

    fn erase_unit(&self) -> Option<u32> {
        self.inner.erase_unit()
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), BackendError> {
        self.probe.state.reads.fetch_add(1, Ordering::SeqCst);
        if covers(self.probe.faults().fail_read_at, offset, buf.len()) {
            log::trace!("Injected read fault at offset 0x{:08X}", offset);
            return Err(BackendError::new(BackendOp::Read, offset, DriverFault::Bus));
        }
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), BackendError> {
        self.probe.state.writes.fetch_add(1, Ordering::SeqCst);
        lock(&self.probe.state.logs).writes.push((offset, data.len()));

        let faults = self.probe.faults();
        if covers(faults.fail_write_at, offset, data.len()) {
            log::trace!("Injected write fault at offset 0x{:08X}", offset);
            return Err(BackendError::new(
                BackendOp::Write,
                offset,
                DriverFault::ProgramFailed,
            ));
        }
        if faults.stuck_low == 0 {
            return self.inner.write(offset, data);
        }

        self.staging.clear();
        self.staging
            .extend(data.iter().map(|&byte| byte & !faults.stuck_low));
        self.inner.write(offset, &self.staging)
    }

    fn erase(&mut self, offset: u32) -> Result<(), BackendError> {
        self.probe.state.erases.fetch_add(1, Ordering::SeqCst);
        lock(&self.probe.state.logs).erases.push(offset);

        let unit = self.inner.erase_unit().unwrap_or(1);
        if covers(self.probe.faults().fail_erase_at, offset - offset % unit, unit as usize) {
            log::trace!("Injected erase fault at offset 0x{:08X}", offset);
            return Err(BackendError::new(
                BackendOp::Erase,
                offset,
                DriverFault::EraseFailed,
            ));
        }
        self.inner.erase(offset)
    }

    fn mapped(&self) -> Option<&[u8]> {
        if self.probe.faults().armed() {
            return None;
        }
        self.inner.mapped()
    }

    fn mapped_mut(&mut self) -> Option<&mut [u8]> {
        if self.probe.faults().armed() {
            return None;
        }
        self.inner.mapped_mut()
    }
}
