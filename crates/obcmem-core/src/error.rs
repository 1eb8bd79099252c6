//! Error types for obcmem-core
//!
//! Errors are grouped in three layers:
//!
//! - [`DriverFault`] - what a vendor driver primitive reported
//! - [`BackendError`] - which adapter operation failed, and where
//! - [`Error`] - the crate-wide error, carrying the region on backend failures
//!
//! Configuration problems are reported separately through [`ConfigError`]
//! and wrapped into [`Error::Config`] when they surface at runtime.

use core::fmt;

use thiserror::Error;

use crate::region::RegionId;

/// Failure reported by a vendor driver primitive
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFault {
    /// Device did not become ready
    #[error("device busy")]
    Busy,
    /// Operation timed out
    #[error("operation timed out")]
    Timeout,
    /// Program operation reported failure
    #[error("program failed")]
    ProgramFailed,
    /// Erase operation reported failure
    #[error("erase failed")]
    EraseFailed,
    /// Access beyond the end of the device
    #[error("access beyond device bounds")]
    OutOfBounds,
    /// Access not aligned to what the primitive requires
    #[error("misaligned access")]
    Misaligned,
    /// Bus or controller error
    #[error("bus error")]
    Bus,
}

/// Backend operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    /// Read into a buffer
    Read,
    /// Program / write from a buffer
    Write,
    /// Sector erase
    Erase,
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Erase => write!(f, "erase"),
        }
    }
}

/// A failed adapter operation
///
/// Offsets are relative to the start of the backend, not absolute bus
/// addresses.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{op} at offset 0x{offset:08X} failed: {fault}")]
pub struct BackendError {
    /// Operation that failed
    pub op: BackendOp,
    /// Backend-relative offset of the failing access
    pub offset: u32,
    /// Fault reported by the driver
    #[source]
    pub fault: DriverFault,
}

impl BackendError {
    /// Create a new backend error
    pub fn new(op: BackendOp, offset: u32, fault: DriverFault) -> Self {
        Self { op, offset, fault }
    }
}

/// Board configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The same region id appears twice
    #[error("region {0} is defined more than once")]
    DuplicateRegion(RegionId),
    /// Region has zero length
    #[error("region {0} is empty")]
    EmptyRegion(RegionId),
    /// Region extends past the 32-bit address space
    #[error("region {0} extends past the end of the address space")]
    AddressOverflow(RegionId),
    /// Two regions overlap
    #[error("regions {0} and {1} overlap")]
    OverlappingRegions(RegionId, RegionId),
    /// Flash region without a sector size
    #[error("flash region {0} has no sector size")]
    MissingSectorSize(RegionId),
    /// Region size is not a multiple of its erase unit
    #[error("region {region} is not a multiple of its {unit} byte erase unit")]
    UnalignedRegion {
        /// Offending region
        region: RegionId,
        /// Erase unit in bytes
        unit: u32,
    },
    /// Page size is zero or does not divide the sector size
    #[error("region {0} has an invalid page size")]
    InvalidPageSize(RegionId),
    /// Backend is smaller than the region mapped onto it
    #[error("backend for region {0} is smaller than the region")]
    BackendTooSmall(RegionId),
    /// Backend erase unit differs from the configured one
    #[error("backend for region {region} erases {backend:?} bytes, board declares {configured:?}")]
    EraseUnitMismatch {
        /// Offending region
        region: RegionId,
        /// Erase unit reported by the backend
        backend: Option<u32>,
        /// Erase unit derived from the board configuration
        configured: Option<u32>,
    },
    /// Transfer settings are out of range
    #[error("invalid transfer settings: {0}")]
    InvalidTransferSettings(&'static str),
    /// Unknown region name
    #[error("unknown region '{0}'")]
    UnknownRegion(String),
    /// Failed to parse a configuration file
    #[error("failed to parse board configuration: {0}")]
    Parse(String),
    /// Failed to read a configuration file
    #[error("failed to read board configuration: {0}")]
    Io(String),
}

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Address errors
    /// Range is not fully contained in any registered region
    #[error("range 0x{addr:08X}+{len} is not inside a registered region")]
    InvalidRange {
        /// Start address of the rejected range
        addr: u32,
        /// Length of the rejected range
        len: u32,
    },
    /// Transfer length exceeds the hard ceiling
    #[error("transfer of {len} bytes exceeds the {max} byte limit")]
    TransferTooLarge {
        /// Requested length
        len: u32,
        /// Configured ceiling
        max: u32,
    },
    /// Region is part of the board but has no backend bound
    #[error("region {0} has no backend")]
    Unregistered(RegionId),
    /// Source and destination overlap inside a region that cannot be copied in place
    #[error("source and destination overlap in {0}")]
    OverlappingRanges(RegionId),

    // Backend errors
    /// A backend primitive failed
    #[error("{region}: {source}")]
    Backend {
        /// Region whose backend failed
        region: RegionId,
        /// Adapter-level failure
        #[source]
        source: BackendError,
    },

    // Queue errors
    /// The transfer queue has no free slot
    #[error("transfer queue is full")]
    QueueFull,
    /// The worker is no longer accepting or executing requests
    #[error("transfer worker has stopped")]
    WorkerStopped,
    /// The request was cancelled before it ran
    #[error("transfer cancelled")]
    Cancelled,

    // Configuration errors
    /// Board configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Wrap an adapter failure with the region it happened in
    pub fn backend(region: RegionId, source: BackendError) -> Self {
        Self::Backend { region, source }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
