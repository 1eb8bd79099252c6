//! Region types
//!
//! Descriptors for the fixed set of memory regions on the board.

use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;

/// Memory technology backing a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technology {
    /// Directly byte-addressable RAM
    Ram,
    /// Parallel NOR flash
    Nor,
    /// Quad-SPI NOR flash
    Qspi,
}

impl Technology {
    /// Whether the technology needs erase-before-program
    pub fn is_flash(self) -> bool {
        !matches!(self, Self::Ram)
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ram => write!(f, "RAM"),
            Self::Nor => write!(f, "NOR"),
            Self::Qspi => write!(f, "QSPI"),
        }
    }
}

/// Identifier of a memory region
///
/// The set is fixed by the board: ids are dense and usable as table indices
/// through [`RegionId::index`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum RegionId {
    /// On-chip SRAM
    InternalRam,
    /// External SDRAM behind the memory controller
    ExternalRam,
    /// On-chip NOR flash
    InternalNor,
    /// External parallel NOR flash
    ExternalNor,
    /// External QSPI flash
    Qspi,
}

impl RegionId {
    /// Number of region ids
    pub const COUNT: usize = 5;

    /// All region ids, in table order
    pub const ALL: [RegionId; Self::COUNT] = [
        Self::InternalRam,
        Self::ExternalRam,
        Self::InternalNor,
        Self::ExternalNor,
        Self::Qspi,
    ];

    /// Dense table index of this id
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Technology the region is built from
    pub const fn technology(self) -> Technology {
        match self {
            Self::InternalRam | Self::ExternalRam => Technology::Ram,
            Self::InternalNor | Self::ExternalNor => Technology::Nor,
            Self::Qspi => Technology::Qspi,
        }
    }

    /// Configuration name of the region
    pub const fn name(self) -> &'static str {
        match self {
            Self::InternalRam => "internal-ram",
            Self::ExternalRam => "external-ram",
            Self::InternalNor => "internal-nor",
            Self::ExternalNor => "external-nor",
            Self::Qspi => "qspi",
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegionId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownRegion(s.to_string()))
    }
}

/// Address span of a registered region
///
/// `end` is exclusive and kept as `u64` so a region may end exactly at the
/// top of the 32-bit address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSpan {
    /// Region id
    pub id: RegionId,
    /// First address of the region
    pub base: u32,
    /// Length in bytes
    pub length: u32,
    /// One past the last address (`base + length`)
    pub end: u64,
}

impl RegionSpan {
    /// Create a span
    pub fn new(id: RegionId, base: u32, length: u32) -> Self {
        Self {
            id,
            base,
            length,
            end: base as u64 + length as u64,
        }
    }

    /// Check whether `[addr, addr + len)` lies entirely inside this region
    ///
    /// The start address must itself be inside the region, so a zero-length
    /// range at `end` is rejected.
    pub fn contains(&self, addr: u32, len: u32) -> bool {
        let start = addr as u64;
        start >= self.base as u64 && start < self.end && start + len as u64 <= self.end
    }

    /// Check if this span overlaps with another
    pub fn overlaps(&self, other: &RegionSpan) -> bool {
        (self.base as u64) < other.end && (other.base as u64) < self.end
    }

    /// Region-relative offset of an address inside the span
    pub fn offset_of(&self, addr: u32) -> u32 {
        addr - self.base
    }
}
