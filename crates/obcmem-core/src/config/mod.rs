//! Board configuration
//!
//! The region table is board-specific static data: base addresses, sizes
//! and flash geometry. It is described by a [`BoardConfig`], either the
//! built-in reference map ([`BoardConfig::default`]) or a TOML file:
//!
//! ```toml
//! [board]
//! name = "obc-rev-b"
//!
//! [transfer]
//! queue_depth = 8
//! bounce_size = "4 KiB"
//!
//! [[region]]
//! id = "internal-ram"
//! base = 0x2000_0000
//! size = "512 KiB"
//!
//! [[region]]
//! id = "qspi"
//! base = 0x9000_0000
//! size = "8 MiB"
//! sector_size = "4 KiB"
//! page_size = 256
//! ```

mod toml;

pub use self::toml::{format_size, parse_size};

use crate::backend::{NorGeometry, QspiGeometry};
use crate::error::ConfigError;
use crate::region::{RegionId, RegionSpan, Technology};
use crate::transfer::{TransferLimits, DEFAULT_BOUNCE_SIZE, MAX_TRANSFER_LEN};

/// Default depth of the worker queue
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Default QSPI program page size
pub const DEFAULT_PAGE_SIZE: u32 = 256;

/// Configuration of one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConfig {
    /// Region id
    pub id: RegionId,
    /// Base bus address
    pub base: u32,
    /// Size in bytes
    pub size: u32,
    /// Physical sector size (flash only)
    pub sector_size: Option<u32>,
    /// Adjacent sectors are erased and programmed as a pair (NOR only)
    pub paired_sectors: bool,
    /// Program page size (QSPI only)
    pub page_size: Option<u32>,
}

impl RegionConfig {
    /// RAM region
    pub fn ram(id: RegionId, base: u32, size: u32) -> Self {
        Self {
            id,
            base,
            size,
            sector_size: None,
            paired_sectors: false,
            page_size: None,
        }
    }

    /// NOR flash region
    pub fn nor(id: RegionId, base: u32, size: u32, sector_size: u32, paired_sectors: bool) -> Self {
        Self {
            sector_size: Some(sector_size),
            paired_sectors,
            ..Self::ram(id, base, size)
        }
    }

    /// QSPI flash region
    pub fn qspi(id: RegionId, base: u32, size: u32, sector_size: u32, page_size: u32) -> Self {
        Self {
            sector_size: Some(sector_size),
            page_size: Some(page_size),
            ..Self::ram(id, base, size)
        }
    }

    /// Address span of the region
    pub fn span(&self) -> RegionSpan {
        RegionSpan::new(self.id, self.base, self.size)
    }

    /// Erase unit in bytes, `None` for RAM
    pub fn erase_unit(&self) -> Option<u32> {
        match self.id.technology() {
            Technology::Ram => None,
            Technology::Nor => self
                .sector_size
                .map(|s| if self.paired_sectors { s * 2 } else { s }),
            Technology::Qspi => self.sector_size,
        }
    }

    /// NOR geometry, if this is a NOR region with a sector size
    pub fn nor_geometry(&self) -> Option<NorGeometry> {
        match (self.id.technology(), self.sector_size) {
            (Technology::Nor, Some(sector_size)) => Some(NorGeometry {
                size: self.size,
                sector_size,
                paired_sectors: self.paired_sectors,
            }),
            _ => None,
        }
    }

    /// QSPI geometry, if this is a QSPI region with a sector size
    pub fn qspi_geometry(&self) -> Option<QspiGeometry> {
        match (self.id.technology(), self.sector_size) {
            (Technology::Qspi, Some(sector_size)) => Some(QspiGeometry {
                size: self.size,
                sector_size,
                page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            }),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::EmptyRegion(self.id));
        }
        if self.span().end > 1 << 32 {
            return Err(ConfigError::AddressOverflow(self.id));
        }
        if self.id.technology().is_flash() {
            let sector_size = self
                .sector_size
                .filter(|&s| s > 0)
                .ok_or(ConfigError::MissingSectorSize(self.id))?;
            let unit = self.erase_unit().unwrap_or(sector_size);
            if self.size % unit != 0 {
                return Err(ConfigError::UnalignedRegion {
                    region: self.id,
                    unit,
                });
            }
            if let Some(page_size) = self.page_size {
                if page_size == 0 || sector_size % page_size != 0 {
                    return Err(ConfigError::InvalidPageSize(self.id));
                }
            }
        }
        Ok(())
    }
}

/// Transfer and queue settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Number of queued requests before enqueue blocks
    pub queue_depth: usize,
    /// Bounce chunk for destinations that are not erase-granular
    pub bounce_size: u32,
    /// Hard ceiling on the length of one transfer
    pub max_transfer: u32,
}

impl TransferConfig {
    /// Engine limits derived from these settings
    pub fn limits(&self) -> TransferLimits {
        TransferLimits {
            bounce_size: self.bounce_size,
            max_transfer: self.max_transfer,
        }
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_depth == 0 {
            return Err(ConfigError::InvalidTransferSettings("queue_depth must be non-zero"));
        }
        if self.bounce_size == 0 {
            return Err(ConfigError::InvalidTransferSettings("bounce_size must be non-zero"));
        }
        Ok(())
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            bounce_size: DEFAULT_BOUNCE_SIZE,
            max_transfer: MAX_TRANSFER_LEN,
        }
    }
}

/// Board memory map and transfer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Optional board name
    pub name: Option<String>,
    /// Transfer settings
    pub transfer: TransferConfig,
    /// Regions, sorted by base address
    pub regions: Vec<RegionConfig>,
}

impl BoardConfig {
    /// Create an empty board configuration
    pub fn new() -> Self {
        Self {
            name: None,
            transfer: TransferConfig::default(),
            regions: Vec::new(),
        }
    }

    /// Add a region
    pub fn add_region(&mut self, region: RegionConfig) {
        self.regions.push(region);
    }

    /// Find a region by id
    pub fn region(&self, id: RegionId) -> Option<&RegionConfig> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Sort regions by base address
    pub fn sort_by_address(&mut self) {
        self.regions.sort_by_key(|r| r.base);
    }

    /// Largest erase unit of any region
    pub fn max_erase_unit(&self) -> Option<u32> {
        self.regions.iter().filter_map(RegionConfig::erase_unit).max()
    }

    /// Validate the configuration
    ///
    /// Regions must be non-empty, disjoint, unique and inside the 32-bit
    /// address space; flash regions must be whole multiples of their erase
    /// unit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transfer.validate()?;

        for region in &self.regions {
            region.validate()?;
        }

        for (i, r1) in self.regions.iter().enumerate() {
            for r2 in self.regions.iter().skip(i + 1) {
                if r1.id == r2.id {
                    return Err(ConfigError::DuplicateRegion(r1.id));
                }
                if r1.span().overlaps(&r2.span()) {
                    return Err(ConfigError::OverlappingRegions(r1.id, r2.id));
                }
            }
        }

        Ok(())
    }
}

impl Default for BoardConfig {
    /// Reference on-board computer memory map
    fn default() -> Self {
        let mut config = Self::new();
        config.name = Some("obc-reference".to_string());
        config.add_region(RegionConfig::nor(
            RegionId::InternalNor,
            0x0800_0000,
            2 * 1024 * 1024,
            128 * 1024,
            false,
        ));
        config.add_region(RegionConfig::ram(
            RegionId::InternalRam,
            0x2000_0000,
            512 * 1024,
        ));
        config.add_region(RegionConfig::ram(
            RegionId::ExternalRam,
            0x6000_0000,
            4 * 1024 * 1024,
        ));
        config.add_region(RegionConfig::nor(
            RegionId::ExternalNor,
            0x6400_0000,
            4 * 1024 * 1024,
            64 * 1024,
            true,
        ));
        config.add_region(RegionConfig::qspi(
            RegionId::Qspi,
            0x9000_0000,
            8 * 1024 * 1024,
            4096,
            DEFAULT_PAGE_SIZE,
        ));
        config
    }
}
