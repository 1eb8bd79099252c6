//! Region registry
//!
//! The registry binds each configured region to the backend that serves it.
//! It is built once at bring-up and never changes afterwards.

use super::{RegionId, RegionMap, RegionSpan};
use crate::backend::{DynBackend, MemoryBackend};
use crate::config::BoardConfig;
use crate::error::ConfigError;

/// Backend handles supplied by board bring-up, one slot per region id
#[derive(Default)]
pub struct BackendHandles {
    slots: [Option<Box<DynBackend>>; RegionId::COUNT],
}

impl BackendHandles {
    /// Create an empty set of handles
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a backend to a region id, replacing any previous binding
    pub fn bind<B>(&mut self, id: RegionId, backend: B) -> &mut Self
    where
        B: MemoryBackend + Send + 'static,
    {
        self.slots[id.index()] = Some(Box::new(backend));
        self
    }

    /// Builder-style [`bind`](Self::bind)
    pub fn with<B>(mut self, id: RegionId, backend: B) -> Self
    where
        B: MemoryBackend + Send + 'static,
    {
        self.bind(id, backend);
        self
    }

    /// Bind an already boxed backend
    pub fn bind_boxed(&mut self, id: RegionId, backend: Box<DynBackend>) -> &mut Self {
        self.slots[id.index()] = Some(backend);
        self
    }

    /// Remove and return the backend bound to a region id
    pub fn take(&mut self, id: RegionId) -> Option<Box<DynBackend>> {
        self.slots[id.index()].take()
    }

    /// Check whether a backend is bound to a region id
    pub fn is_bound(&self, id: RegionId) -> bool {
        self.slots[id.index()].is_some()
    }
}

/// A registered memory region
pub struct MemoryRegion {
    span: RegionSpan,
    backend: Box<DynBackend>,
}

impl MemoryRegion {
    /// Region id
    pub fn id(&self) -> RegionId {
        self.span.id
    }

    /// Address span
    pub fn span(&self) -> &RegionSpan {
        &self.span
    }

    /// Backend serving this region
    pub fn backend(&self) -> &DynBackend {
        self.backend.as_ref()
    }

    /// Mutable backend serving this region
    pub fn backend_mut(&mut self) -> &mut DynBackend {
        self.backend.as_mut()
    }
}

impl core::fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("span", &self.span)
            .field("technology", &self.backend.technology())
            .finish()
    }
}

/// Fixed table of memory regions and their backends
#[derive(Debug)]
pub struct RegionRegistry {
    regions: Vec<MemoryRegion>,
    map: RegionMap,
}

impl RegionRegistry {
    /// Populate the registry from board configuration and backend handles
    ///
    /// Regions without a bound backend are skipped: they are simply not
    /// reachable. A bound backend must be at least as large as its region
    /// and erase in the configured unit. Backends bound to a region the board does not define are
    /// dropped with a warning.
    pub fn init(config: &BoardConfig, mut handles: BackendHandles) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut regions = Vec::with_capacity(config.regions.len());
        for region in &config.regions {
            let Some(backend) = handles.take(region.id) else {
                log::debug!("No backend bound for {}, region unreachable", region.id);
                continue;
            };

            if backend.size() < region.size {
                return Err(ConfigError::BackendTooSmall(region.id));
            }
            if backend.erase_unit() != region.erase_unit() {
                return Err(ConfigError::EraseUnitMismatch {
                    region: region.id,
                    backend: backend.erase_unit(),
                    configured: region.erase_unit(),
                });
            }

            log::debug!(
                "Registered {} ({}) at 0x{:08X}, {} bytes",
                region.id,
                backend.technology(),
                region.base,
                region.size
            );
            regions.push(MemoryRegion {
                span: region.span(),
                backend,
            });
        }

        for id in RegionId::ALL {
            if handles.is_bound(id) {
                log::warn!("Backend bound for {} but the board defines no such region", id);
            }
        }

        let map = RegionMap::new(regions.iter().map(|r| r.span).collect());
        regions.sort_by_key(|r| r.span.base);
        log::info!("Region registry ready with {} region(s)", regions.len());

        Ok(Self { regions, map })
    }

    /// Backend-free view for classification
    pub fn map(&self) -> &RegionMap {
        &self.map
    }

    /// Classify a range against the registered regions
    pub fn classify(&self, addr: u32, len: u32) -> Option<RegionId> {
        self.map.classify(addr, len)
    }

    /// Look up a region by id
    pub fn region(&self, id: RegionId) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.id() == id)
    }

    /// Look up a region by id, mutable
    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut MemoryRegion> {
        self.regions.iter_mut().find(|r| r.id() == id)
    }

    /// Borrow two distinct regions mutably at once
    ///
    /// Returns `None` if either id is unregistered or both ids are equal.
    pub fn pair_mut(
        &mut self,
        first: RegionId,
        second: RegionId,
    ) -> Option<(&mut MemoryRegion, &mut MemoryRegion)> {
        let a = self.position(first)?;
        let b = self.position(second)?;
        if a == b {
            return None;
        }

        if a < b {
            let (low, high) = self.regions.split_at_mut(b);
            Some((&mut low[a], &mut high[0]))
        } else {
            let (low, high) = self.regions.split_at_mut(a);
            Some((&mut high[0], &mut low[b]))
        }
    }

    /// Iterate over registered regions in address order
    pub fn iter(&self) -> impl Iterator<Item = &MemoryRegion> {
        self.regions.iter()
    }

    /// Largest erase unit of any registered backend
    pub fn max_erase_unit(&self) -> Option<u32> {
        self.regions
            .iter()
            .filter_map(|r| r.backend.erase_unit())
            .max()
    }

    /// Get the number of registered regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Check if no region is registered
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn position(&self, id: RegionId) -> Option<usize> {
        self.regions.iter().position(|r| r.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RamBackend;
    use crate::config::RegionConfig;

    fn two_ram_board() -> BoardConfig {
        let mut config = BoardConfig::new();
        config.add_region(RegionConfig::ram(RegionId::ExternalRam, 0x6000_0000, 0x1000));
        config.add_region(RegionConfig::ram(RegionId::InternalRam, 0x2000_0000, 0x1000));
        config
    }

    #[test]
    fn test_init_binds_backends() {
        let handles = BackendHandles::new()
            .with(RegionId::InternalRam, RamBackend::new(vec![0u8; 0x1000]))
            .with(RegionId::ExternalRam, RamBackend::new(vec![0u8; 0x1000]));

        let registry = RegionRegistry::init(&two_ram_board(), handles).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.classify(0x2000_0010, 4), Some(RegionId::InternalRam));
        assert_eq!(registry.classify(0x6000_0FFF, 1), Some(RegionId::ExternalRam));

        // Address order regardless of configuration order
        let ids: Vec<RegionId> = registry.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![RegionId::InternalRam, RegionId::ExternalRam]);
    }

    #[test]
    fn test_missing_backend_is_tolerated() {
        let handles =
            BackendHandles::new().with(RegionId::InternalRam, RamBackend::new(vec![0u8; 0x1000]));

        let registry = RegionRegistry::init(&two_ram_board(), handles).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.region(RegionId::ExternalRam).is_none());
        assert_eq!(registry.classify(0x6000_0000, 1), None);
    }

    #[test]
    fn test_backend_too_small() {
        let handles = BackendHandles::new()
            .with(RegionId::InternalRam, RamBackend::new(vec![0u8; 0x800]));
        assert_eq!(
            RegionRegistry::init(&two_ram_board(), handles).unwrap_err(),
            ConfigError::BackendTooSmall(RegionId::InternalRam)
        );
    }

    #[test]
    fn test_erase_unit_mismatch() {
        let mut config = two_ram_board();
        config.add_region(RegionConfig::qspi(RegionId::Qspi, 0x9000_0000, 0x3000, 0x1000, 256));

        // A RAM backend has no erase unit at all
        let handles = BackendHandles::new()
            .with(RegionId::InternalRam, RamBackend::new(vec![0u8; 0x1000]))
            .with(RegionId::Qspi, RamBackend::new(vec![0u8; 0x3000]));
        assert_eq!(
            RegionRegistry::init(&config, handles).unwrap_err(),
            ConfigError::EraseUnitMismatch {
                region: RegionId::Qspi,
                backend: None,
                configured: Some(0x1000),
            }
        );
    }

    #[test]
    fn test_pair_mut() {
        let handles = BackendHandles::new()
            .with(RegionId::InternalRam, RamBackend::new(vec![0u8; 0x1000]))
            .with(RegionId::ExternalRam, RamBackend::new(vec![0u8; 0x1000]));
        let mut registry = RegionRegistry::init(&two_ram_board(), handles).unwrap();

        let (ext, int) = registry
            .pair_mut(RegionId::ExternalRam, RegionId::InternalRam)
            .unwrap();
        assert_eq!(ext.id(), RegionId::ExternalRam);
        assert_eq!(int.id(), RegionId::InternalRam);

        assert!(registry
            .pair_mut(RegionId::InternalRam, RegionId::InternalRam)
            .is_none());
        assert!(registry
            .pair_mut(RegionId::InternalRam, RegionId::Qspi)
            .is_none());
    }
}
