//! obcmem-core - Heterogeneous memory transfer core
//!
//! This crate moves bytes between address ranges that live on different
//! memory technologies of an on-board computer: internal and external RAM,
//! internal and external NOR flash, and QSPI flash. Each technology is
//! reached through a [`backend::MemoryBackend`] adapter, so the transfer
//! logic never sees vendor driver details.
//!
//! # Layers
//!
//! - [`region`] - the fixed region table and the address classifier
//! - [`backend`] - per-technology adapters over vendor driver primitives
//! - [`transfer`] - the transfer engine (chunking, bounce buffer, erase)
//! - [`config`] - board configuration loaded from TOML
//!
//! # Example
//!
//! ```ignore
//! use obcmem_core::config::BoardConfig;
//! use obcmem_core::region::{BackendHandles, RegionRegistry};
//! use obcmem_core::transfer::{TransferEngine, TransferSpec};
//!
//! let config = BoardConfig::default();
//! let registry = RegionRegistry::init(&config, handles)?;
//! let mut engine = TransferEngine::new(registry, config.transfer.limits());
//!
//! // Copy 4 KiB from internal RAM into QSPI, erasing first
//! let spec = TransferSpec::new(0x9000_0000, 0x2000_0000, 4096).with_erase(true);
//! let stats = engine.execute(&spec)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod config;
pub mod error;
pub mod region;
pub mod status;
pub mod transfer;

pub use error::{Error, Result};
pub use status::Status;
