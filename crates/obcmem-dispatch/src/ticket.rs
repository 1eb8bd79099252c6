//! Handles for queued transfers

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use obcmem_core::transfer::{TransferError, TransferResult};
use obcmem_core::Error;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Handle to the outcome of a queued transfer
///
/// Acceptance into the queue says nothing about success; the ticket
/// resolves with the transfer's own result once the worker has run it.
/// It can be waited on from a thread or awaited from async code.
#[derive(Debug)]
#[must_use = "dropping a ticket discards the transfer outcome"]
pub struct TransferTicket {
    rx: oneshot::Receiver<TransferResult>,
}

impl TransferTicket {
    pub(crate) fn new(rx: oneshot::Receiver<TransferResult>) -> Self {
        Self { rx }
    }

    /// Block until the worker has run the transfer
    ///
    /// Must not be called from inside an async runtime; await the ticket
    /// there instead.
    pub fn wait(self) -> TransferResult {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(stopped()))
    }

    /// Take the outcome if the transfer has finished
    ///
    /// Returns `None` while the transfer is queued or running. The outcome
    /// is handed out once.
    pub fn try_result(&mut self) -> Option<TransferResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(stopped())),
        }
    }
}

impl Future for TransferTicket {
    type Output = TransferResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(stopped())))
    }
}

fn stopped() -> TransferError {
    Error::WorkerStopped.into()
}
