//! Transfer descriptions

use core::fmt;

use super::TransferResult;
use crate::error::{Error, Result};
use crate::region::{RegionMap, RegionSpan};

/// Completion callback invoked with the final result of a request
pub type CompletionCallback = Box<dyn FnOnce(&TransferResult) + Send + 'static>;

/// What to move: destination, source, length and whether to erase first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSpec {
    /// Destination bus address
    pub dst: u32,
    /// Source bus address
    pub src: u32,
    /// Number of bytes
    pub len: u32,
    /// Erase erase-granular destinations before programming
    pub erase: bool,
}

/// Source and destination regions of a validated transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Region containing the source range
    pub src: RegionSpan,
    /// Region containing the destination range
    pub dst: RegionSpan,
}

impl TransferSpec {
    /// Create a transfer without erase
    pub fn new(dst: u32, src: u32, len: u32) -> Self {
        Self {
            dst,
            src,
            len,
            erase: false,
        }
    }

    /// Set the erase flag
    pub fn with_erase(mut self, erase: bool) -> Self {
        self.erase = erase;
        self
    }

    /// Classify both ranges against `map`
    ///
    /// The length ceiling is checked first, then the source, then the
    /// destination.
    pub fn route(&self, map: &RegionMap, max_transfer: u32) -> Result<Route> {
        if self.len > max_transfer {
            return Err(Error::TransferTooLarge {
                len: self.len,
                max: max_transfer,
            });
        }

        let src = map.span_for(self.src, self.len).ok_or(Error::InvalidRange {
            addr: self.src,
            len: self.len,
        })?;
        let dst = map.span_for(self.dst, self.len).ok_or(Error::InvalidRange {
            addr: self.dst,
            len: self.len,
        })?;

        Ok(Route {
            src: *src,
            dst: *dst,
        })
    }
}

impl fmt::Display for TransferSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08X} -> 0x{:08X} ({} bytes{})",
            self.src,
            self.dst,
            self.len,
            if self.erase { ", erase" } else { "" }
        )
    }
}

/// A transfer together with its optional completion callback
pub struct TransferRequest {
    /// What to move
    pub spec: TransferSpec,
    callback: Option<CompletionCallback>,
}

impl TransferRequest {
    /// Create a request without erase or callback
    pub fn new(dst: u32, src: u32, len: u32) -> Self {
        Self::from_spec(TransferSpec::new(dst, src, len))
    }

    /// Wrap an existing spec
    pub fn from_spec(spec: TransferSpec) -> Self {
        Self {
            spec,
            callback: None,
        }
    }

    /// Request erase-before-program
    pub fn erase(self) -> Self {
        self.with_erase(true)
    }

    /// Set the erase flag
    pub fn with_erase(mut self, erase: bool) -> Self {
        self.spec.erase = erase;
        self
    }

    /// Attach a completion callback
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&TransferResult) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Whether a callback is attached
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Consume the request, running its callback with `result`
    pub fn complete(self, result: &TransferResult) {
        if let Some(callback) = self.callback {
            callback(result);
        }
    }

    /// Split into spec and callback
    pub fn into_parts(self) -> (TransferSpec, Option<CompletionCallback>) {
        (self.spec, self.callback)
    }
}

impl From<TransferSpec> for TransferRequest {
    fn from(spec: TransferSpec) -> Self {
        Self::from_spec(spec)
    }
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("spec", &self.spec)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionId;
    use crate::transfer::TransferStats;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn map() -> RegionMap {
        RegionMap::new(vec![
            RegionSpan::new(RegionId::InternalRam, 0x2000_0000, 0x1000),
            RegionSpan::new(RegionId::ExternalRam, 0x6000_0000, 0x1000),
        ])
    }

    #[test]
    fn test_route_checks_source_first() {
        let spec = TransferSpec::new(0x7000_0000, 0x1000_0000, 4);
        assert_eq!(
            spec.route(&map(), 1024).unwrap_err(),
            Error::InvalidRange {
                addr: 0x1000_0000,
                len: 4
            }
        );

        let spec = TransferSpec::new(0x7000_0000, 0x2000_0000, 4);
        assert_eq!(
            spec.route(&map(), 1024).unwrap_err(),
            Error::InvalidRange {
                addr: 0x7000_0000,
                len: 4
            }
        );
    }

    #[test]
    fn test_route_enforces_ceiling() {
        let spec = TransferSpec::new(0x6000_0000, 0x2000_0000, 0x801);
        assert_eq!(
            spec.route(&map(), 0x800).unwrap_err(),
            Error::TransferTooLarge {
                len: 0x801,
                max: 0x800
            }
        );

        let route = TransferSpec::new(0x6000_0000, 0x2000_0000, 0x800)
            .route(&map(), 0x800)
            .unwrap();
        assert_eq!(route.src.id, RegionId::InternalRam);
        assert_eq!(route.dst.id, RegionId::ExternalRam);
    }

    #[test]
    fn test_request_callback_runs_once() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let request = TransferRequest::new(0, 0, 0)
            .erase()
            .on_complete(move |result| {
                assert!(result.is_ok());
                flag.store(true, Ordering::SeqCst);
            });

        assert!(request.spec.erase);
        assert!(request.has_callback());
        request.complete(&Ok(TransferStats::default()));
        assert!(called.load(Ordering::SeqCst));
    }
}
