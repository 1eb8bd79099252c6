//! External status codes
//!
//! Callers that predate the typed [`Error`](crate::Error) API consume a flat
//! status code. [`Status`] carries that code set and converts from results.

use core::fmt;

use crate::error::Error;
use crate::region::RegionId;
use crate::transfer::TransferError;

/// Flat status code reported to external callers
///
/// `ValidRange` is a classification outcome only; a completed transfer
/// reports `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Operation succeeded
    Ok = 0,
    /// Operation failed
    Error = 1,
    /// Range classified into a registered region
    ValidRange = 2,
    /// Range is not inside any registered region
    InvalidRange = 3,
}

impl Status {
    /// Numeric code
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Status of a classification result
    pub fn from_classification(region: Option<RegionId>) -> Self {
        match region {
            Some(_) => Self::ValidRange,
            None => Self::InvalidRange,
        }
    }

    /// Whether this status reports success
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::ValidRange)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Error => write!(f, "ERROR"),
            Self::ValidRange => write!(f, "VALID_RANGE"),
            Self::InvalidRange => write!(f, "INVALID_RANGE"),
        }
    }
}

impl From<&Error> for Status {
    fn from(error: &Error) -> Self {
        match error {
            Error::InvalidRange { .. } | Error::TransferTooLarge { .. } => Self::InvalidRange,
            _ => Self::Error,
        }
    }
}

impl<T> From<&Result<T, Error>> for Status {
    fn from(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => e.into(),
        }
    }
}

impl<T> From<&Result<T, TransferError>> for Status {
    fn from(result: &Result<T, TransferError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => (&e.error).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::Error.code(), 1);
        assert_eq!(Status::ValidRange.code(), 2);
        assert_eq!(Status::InvalidRange.code(), 3);
    }

    #[test]
    fn test_from_results() {
        let ok: Result<(), Error> = Ok(());
        assert_eq!(Status::from(&ok), Status::Ok);

        let invalid: Result<(), Error> = Err(Error::InvalidRange { addr: 0, len: 1 });
        assert_eq!(Status::from(&invalid), Status::InvalidRange);

        let failed: Result<(), TransferError> = Err(TransferError {
            error: Error::QueueFull,
            completed: 0,
        });
        assert_eq!(Status::from(&failed), Status::Error);

        assert_eq!(Status::from_classification(None), Status::InvalidRange);
        assert_eq!(
            Status::from_classification(Some(RegionId::Qspi)),
            Status::ValidRange
        );
    }
}
