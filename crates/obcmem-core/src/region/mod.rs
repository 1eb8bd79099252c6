//! Memory regions
//!
//! The board exposes a small, fixed set of regions. This module holds their
//! descriptors ([`RegionSpan`]), the backend-free classifier
//! ([`RegionMap`]) and the registry that binds each region to its backend
//! ([`RegionRegistry`]).

mod map;
mod registry;
mod types;

pub use map::RegionMap;
pub use registry::{BackendHandles, MemoryRegion, RegionRegistry};
pub use types::{RegionId, RegionSpan, Technology};
