//! Dispatcher

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use obcmem_core::config::{BoardConfig, TransferConfig};
use obcmem_core::region::{BackendHandles, RegionId, RegionMap, RegionRegistry};
use obcmem_core::transfer::{
    TransferEngine, TransferLimits, TransferProgress, TransferRequest, TransferResult,
    TransferSpec,
};
use obcmem_core::{Error, Result};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::selftest::{self, SelfTestStatus};
use crate::ticket::TransferTicket;
use crate::worker::{self, Job, SharedEngine};

/// How [`Dispatcher::submit`] runs a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run on the caller's thread and return the outcome
    Immediate,
    /// Hand to the worker and return once accepted
    Queued,
}

/// What [`Dispatcher::submit`] produced
#[derive(Debug)]
pub enum Submission {
    /// The transfer ran; this is its outcome
    Completed(TransferResult),
    /// The transfer was accepted; the ticket resolves with its outcome
    Accepted(TransferTicket),
}

impl Submission {
    /// Wait for the outcome, whichever way the request ran
    pub fn wait(self) -> TransferResult {
        match self {
            Submission::Completed(result) => result,
            Submission::Accepted(ticket) => ticket.wait(),
        }
    }
}

/// How to stop the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Run every accepted request first
    Drain,
    /// Complete every pending request with [`Error::Cancelled`]
    ///
    /// A transfer already running finishes normally.
    Cancel,
}

/// Entry point of the transfer subsystem
///
/// Owns the transfer engine and the worker thread. Share it between caller
/// threads by reference or `Arc`.
pub struct Dispatcher {
    map: RegionMap,
    limits: TransferLimits,
    engine: SharedEngine,
    queue: Option<mpsc::Sender<Job>>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Bring up the registry from board configuration and start the worker
    pub fn init(config: &BoardConfig, handles: BackendHandles) -> Result<Self> {
        let registry = RegionRegistry::init(config, handles)?;
        Self::start(registry, &config.transfer)
    }

    /// Start the worker over a populated registry
    ///
    /// Fails with [`Error::Config`] when the transfer settings are unusable.
    pub fn start(registry: RegionRegistry, config: &TransferConfig) -> Result<Self> {
        config.validate()?;

        let map = registry.map().clone();
        let limits = config.limits();
        let engine = Arc::new(Mutex::new(TransferEngine::new(registry, limits)));
        let (sender, receiver) = mpsc::channel(config.queue_depth);
        let cancel = Arc::new(AtomicBool::new(false));

        let worker = worker::spawn(engine.clone(), receiver, cancel.clone()).map_err(|e| {
            log::error!("Failed to start transfer worker: {}", e);
            Error::WorkerStopped
        })?;

        log::info!(
            "Dispatcher ready: {} region(s), queue depth {}",
            map.len(),
            config.queue_depth
        );

        Ok(Self {
            map,
            limits,
            engine,
            queue: Some(sender),
            cancel,
            worker: Some(worker),
        })
    }

    /// Registered regions
    pub fn regions(&self) -> &RegionMap {
        &self.map
    }

    /// Classify a range without touching the engine
    pub fn classify(&self, addr: u32, len: u32) -> Option<RegionId> {
        self.map.classify(addr, len)
    }

    /// Transfer limits in force
    pub fn limits(&self) -> TransferLimits {
        self.limits
    }

    /// Check both ranges of a transfer and the length ceiling
    pub fn check(&self, spec: &TransferSpec) -> Result<()> {
        spec.route(&self.map, self.limits.max_transfer)
            .map(|_| ())
            .map_err(|e| {
                log::debug!("Rejected transfer {}: {}", spec, e);
                e
            })
    }

    /// Run a transfer on the caller's thread
    ///
    /// Blocks for the whole transfer, including any flash erase. The
    /// request's callback, if any, runs with the outcome before this
    /// returns.
    pub fn transfer(&self, request: TransferRequest) -> TransferResult {
        let result = self.engine().execute(&request.spec);
        request.complete(&result);
        result
    }

    /// Run a transfer on the caller's thread, reporting progress
    pub fn transfer_with_progress(
        &self,
        spec: &TransferSpec,
        progress: &mut dyn TransferProgress,
    ) -> TransferResult {
        self.engine().execute_with_progress(spec, progress)
    }

    /// Queue a transfer for the worker
    ///
    /// Blocks while the queue is full. `Ok` means accepted, not succeeded:
    /// the outcome arrives through the ticket and the callback. Invalid
    /// ranges are rejected here and never reach the queue; the callback is
    /// not invoked for a rejected request.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`enqueue_async`](Self::enqueue_async) there.
    pub fn enqueue(&self, request: TransferRequest) -> Result<TransferTicket> {
        self.check(&request.spec)?;
        let queue = self.queue.as_ref().ok_or(Error::WorkerStopped)?;
        let (job, ticket) = job(request);
        queue.blocking_send(job).map_err(|_| Error::WorkerStopped)?;
        Ok(ticket)
    }

    /// Queue a transfer for the worker, waiting asynchronously for a slot
    pub async fn enqueue_async(&self, request: TransferRequest) -> Result<TransferTicket> {
        self.check(&request.spec)?;
        let queue = self.queue.as_ref().ok_or(Error::WorkerStopped)?;
        let (job, ticket) = job(request);
        queue.send(job).await.map_err(|_| Error::WorkerStopped)?;
        Ok(ticket)
    }

    /// Queue a transfer without blocking
    ///
    /// Fails with [`Error::QueueFull`] when no slot is free.
    pub fn try_enqueue(&self, request: TransferRequest) -> Result<TransferTicket> {
        self.check(&request.spec)?;
        let queue = self.queue.as_ref().ok_or(Error::WorkerStopped)?;
        let (job, ticket) = job(request);
        queue.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Closed(_) => Error::WorkerStopped,
        })?;
        Ok(ticket)
    }

    /// Validate, then run or queue a request
    ///
    /// Invalid ranges are reported as `Err` in both modes, before any
    /// hardware access and without invoking the callback.
    pub fn submit(&self, request: TransferRequest, mode: Mode) -> Result<Submission> {
        self.check(&request.spec)?;
        match mode {
            Mode::Immediate => Ok(Submission::Completed(self.transfer(request))),
            Mode::Queued => self.enqueue(request).map(Submission::Accepted),
        }
    }

    /// Program a caller buffer into a registered range
    pub fn write_bytes(&self, addr: u32, data: &[u8], erase: bool) -> TransferResult {
        self.engine().load(addr, data, erase)
    }

    /// Read a registered range into a caller buffer
    pub fn read_bytes(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.engine().fetch(addr, buf)
    }

    /// Erase every erase unit overlapping a registered range
    pub fn erase(&self, addr: u32, len: u32) -> Result<u32> {
        self.engine().erase_range(addr, len)
    }

    /// Run the region round-trip self-test
    pub fn self_test(&self, region: RegionId) -> SelfTestStatus {
        selftest::region_test(self, region)
    }

    /// Run the 0x55/0xAA pattern self-test
    pub fn pattern_test(&self, region: RegionId) -> bool {
        selftest::pattern_test(self, region)
    }

    /// Number of requests waiting in the queue
    pub fn queued(&self) -> usize {
        self.queue
            .as_ref()
            .map_or(0, |queue| queue.max_capacity() - queue.capacity())
    }

    /// Stop the worker
    pub fn shutdown(mut self, mode: Shutdown) {
        self.stop(mode);
    }

    fn stop(&mut self, mode: Shutdown) {
        if mode == Shutdown::Cancel {
            self.cancel.store(true, Ordering::SeqCst);
        }
        // Closing the queue lets the worker exit once it is empty
        drop(self.queue.take());

        if let Some(worker) = self.worker.take() {
            log::debug!("Stopping transfer worker ({:?})", mode);
            if worker.join().is_err() {
                log::warn!("Transfer worker panicked");
            }
            log::info!("Dispatcher stopped");
        }
    }

    fn engine(&self) -> MutexGuard<'_, TransferEngine> {
        worker::lock_engine(&self.engine)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop(Shutdown::Drain);
    }
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("map", &self.map)
            .field("limits", &self.limits)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

fn job(request: TransferRequest) -> (Job, TransferTicket) {
    let (reply, rx) = oneshot::channel();
    (Job { request, reply }, TransferTicket::new(rx))
}
