//! Worker thread
//!
//! One long-lived consumer of the request queue. It runs each request to
//! completion on the shared engine, invokes the request's callback with the
//! result, then resolves the request's ticket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use obcmem_core::transfer::{TransferEngine, TransferRequest, TransferResult};
use obcmem_core::Error;
use tokio::sync::{mpsc, oneshot};

/// Name of the worker thread
pub(crate) const WORKER_NAME: &str = "obcmem-worker";

/// A queued request and the channel its outcome goes back on
pub(crate) struct Job {
    pub(crate) request: TransferRequest,
    pub(crate) reply: oneshot::Sender<TransferResult>,
}

pub(crate) type SharedEngine = Arc<Mutex<TransferEngine>>;

pub(crate) fn lock_engine(engine: &Mutex<TransferEngine>) -> MutexGuard<'_, TransferEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start the worker thread
pub(crate) fn spawn(
    engine: SharedEngine,
    queue: mpsc::Receiver<Job>,
    cancel: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(WORKER_NAME.to_string())
        .spawn(move || run(engine, queue, cancel))
}

fn run(engine: SharedEngine, mut queue: mpsc::Receiver<Job>, cancel: Arc<AtomicBool>) {
    log::debug!("Transfer worker started");
    let mut served = 0usize;

    // Ends once every sender is gone and the queue is empty
    while let Some(Job { request, reply }) = queue.blocking_recv() {
        let result = if cancel.load(Ordering::SeqCst) {
            log::debug!("Cancelled queued transfer {}", request.spec);
            Err(Error::Cancelled.into())
        } else {
            lock_engine(&engine).execute(&request.spec)
        };

        request.complete(&result);
        if reply.send(result).is_err() {
            log::trace!("Ticket dropped before its transfer finished");
        }
        served += 1;
    }

    log::debug!("Transfer worker stopped after {} request(s)", served);
}
