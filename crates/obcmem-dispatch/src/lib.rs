//! obcmem-dispatch - Transfer dispatch
//!
//! The public entry point of the memory transfer subsystem. A
//! [`Dispatcher`] owns the transfer engine and a single worker thread and
//! offers two ways to run a transfer:
//!
//! - **Immediate**: [`Dispatcher::transfer`] runs on the caller's thread and
//!   returns the outcome.
//! - **Queued**: [`Dispatcher::enqueue`] validates the ranges, hands the
//!   request to the worker and returns a [`TransferTicket`] once the request
//!   is accepted. The outcome arrives later, through the ticket and the
//!   request's completion callback.
//!
//! Both paths execute on the same engine behind one lock, so they never
//! share the scratch buffer concurrently. Queued requests run strictly in
//! submission order; immediate requests are not ordered against them.
//!
//! # Example
//!
//! ```ignore
//! use obcmem_core::config::BoardConfig;
//! use obcmem_core::transfer::TransferRequest;
//! use obcmem_dispatch::Dispatcher;
//!
//! let config = BoardConfig::default();
//! let dispatcher = Dispatcher::init(&config, handles)?;
//!
//! // Blocking copy from internal RAM into QSPI
//! dispatcher.transfer(TransferRequest::new(0x9000_0000, 0x2000_0000, 4096).with_erase(true))?;
//!
//! // Queued copy, result delivered to the callback
//! let ticket = dispatcher.enqueue(
//!     TransferRequest::new(0x6000_0000, 0x9000_0000, 4096)
//!         .on_complete(|result| log::info!("done: {:?}", result)),
//! )?;
//! ticket.wait()?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod dispatcher;
pub mod selftest;
mod ticket;
mod worker;

pub use dispatcher::{Dispatcher, Mode, Shutdown, Submission};
pub use selftest::SelfTestStatus;
pub use ticket::TransferTicket;
