//! Simulated board bring-up

use obcmem_core::backend::{NorBackend, QspiBackend, RamBackend};
use obcmem_core::config::{BoardConfig, RegionConfig};
use obcmem_core::region::{BackendHandles, RegionId, Technology};

use crate::{Instrumented, Probe, SimNorFlash, SimQspiFlash};

/// Probes of a simulated board, one per brought-up region
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    probes: [Option<Probe>; RegionId::COUNT],
}

impl SimBoard {
    /// Create simulated, instrumented backends for every region in `config`
    ///
    /// RAM starts zeroed and flash starts erased. Flash regions without a
    /// usable geometry are left unbound.
    pub fn bring_up(config: &BoardConfig) -> (BackendHandles, SimBoard) {
        let mut handles = BackendHandles::new();
        let mut board = SimBoard::default();

        for region in &config.regions {
            if let Some(probe) = bind(&mut handles, region) {
                board.probes[region.id.index()] = Some(probe);
            } else {
                log::warn!("Cannot simulate {}: no flash geometry", region.id);
            }
        }

        (handles, board)
    }

    /// Probe of a region's backend
    pub fn probe(&self, id: RegionId) -> Option<&Probe> {
        self.probes[id.index()].as_ref()
    }

    /// Disarm every fault and clear every counter
    pub fn reset(&self) {
        for probe in self.probes.iter().flatten() {
            probe.clear_faults();
            probe.reset();
        }
    }
}

fn bind(handles: &mut BackendHandles, region: &RegionConfig) -> Option<Probe> {
    let probe = match region.id.technology() {
        Technology::Ram => {
            let (backend, probe) =
                Instrumented::new(RamBackend::new(vec![0u8; region.size as usize]));
            handles.bind(region.id, backend);
            probe
        }
        Technology::Nor => {
            let geometry = region.nor_geometry()?;
            let flash = SimNorFlash::new(geometry.size, geometry.sector_size);
            let (backend, probe) = Instrumented::new(NorBackend::new(flash, geometry));
            handles.bind(region.id, backend);
            probe
        }
        Technology::Qspi => {
            let geometry = region.qspi_geometry()?;
            let flash = SimQspiFlash::new(geometry.size, geometry.sector_size, geometry.page_size);
            let (backend, probe) = Instrumented::new(QspiBackend::new(flash, geometry));
            handles.bind(region.id, backend);
            probe
        }
    };

    log::debug!(
        "Simulated {} ({}) with {} bytes",
        region.id,
        region.id.technology(),
        region.size
    );
    Some(probe)
}
