//! Transfer engine
//!
//! The engine owns the region registry and the scratch buffer. Every
//! transfer follows the same steps:
//!
//! 1. Classify source, then destination. Nothing touches hardware if either
//!    range is invalid.
//! 2. If both sides are memory-mapped, copy in one pass.
//! 3. Otherwise walk the range in chunks. Flash destinations use their
//!    erase unit as the chunk and chunks are aligned to unit boundaries;
//!    everything else uses the bounce size. With erase requested, each
//!    destination unit is erased before it is programmed. A chunk that
//!    covers only part of a unit is merged with the unit's current
//!    contents first, so bytes outside the transfer survive the erase.
//!
//! The first failing step ends the transfer. Chunks already programmed stay
//! programmed; [`TransferError::completed`] says how many bytes that is.

use core::cmp::min;

use thiserror::Error;

use super::{
    NoProgress, Route, ScratchBuffer, TransferLimits, TransferProgress, TransferSpec,
    DEFAULT_BOUNCE_SIZE,
};
use crate::backend::DynBackend;
use crate::error::{Error, Result};
use crate::region::{RegionId, RegionMap, RegionRegistry, RegionSpan};

/// Statistics of a completed transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes moved
    pub bytes: u32,
    /// Backend program calls issued (1 for a direct copy)
    pub chunks: u32,
    /// Destination erase units erased
    pub erases: u32,
    /// Whether the copy went memory to memory without the scratch buffer
    pub direct: bool,
}

/// A failed transfer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} ({completed} bytes completed)")]
pub struct TransferError {
    /// What went wrong
    pub error: Error,
    /// Destination bytes fully programmed before the failure
    pub completed: u32,
}

impl From<Error> for TransferError {
    fn from(error: Error) -> Self {
        Self {
            error,
            completed: 0,
        }
    }
}

/// Outcome of a transfer
pub type TransferResult = core::result::Result<TransferStats, TransferError>;

/// Where the bytes of a transfer come from
#[derive(Debug, Clone, Copy)]
enum Source<'a> {
    /// A registered region, at a region-relative offset
    Region { id: RegionId, offset: u32 },
    /// A caller-supplied buffer
    Host(&'a [u8]),
}

impl Source<'_> {
    fn advance(self, n: u32) -> Self {
        match self {
            Source::Region { id, offset } => Source::Region {
                id,
                offset: offset + n,
            },
            Source::Host(data) => Source::Host(&data[n as usize..]),
        }
    }
}

/// Executes transfers between registered regions
#[derive(Debug)]
pub struct TransferEngine {
    registry: RegionRegistry,
    scratch: ScratchBuffer,
    limits: TransferLimits,
}

impl TransferEngine {
    /// Create an engine over a populated registry
    ///
    /// A zero bounce size falls back to [`DEFAULT_BOUNCE_SIZE`].
    pub fn new(registry: RegionRegistry, mut limits: TransferLimits) -> Self {
        if limits.bounce_size == 0 {
            log::warn!(
                "Zero bounce size, using {} bytes instead",
                DEFAULT_BOUNCE_SIZE
            );
            limits.bounce_size = DEFAULT_BOUNCE_SIZE;
        }
        let capacity = registry
            .max_erase_unit()
            .unwrap_or(0)
            .max(limits.bounce_size);
        log::debug!(
            "Transfer engine: {} byte scratch buffer, {} byte transfer limit",
            capacity,
            limits.max_transfer
        );

        Self {
            registry,
            scratch: ScratchBuffer::new(capacity as usize),
            limits,
        }
    }

    /// Get the registry
    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Get the region map
    pub fn map(&self) -> &RegionMap {
        self.registry.map()
    }

    /// Get the engine limits
    pub fn limits(&self) -> TransferLimits {
        self.limits
    }

    /// Scratch buffer size in bytes
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Consume the engine and return the registry
    pub fn into_registry(self) -> RegionRegistry {
        self.registry
    }

    /// Classify a transfer without executing it
    pub fn validate(&self, spec: &TransferSpec) -> Result<Route> {
        let route = spec.route(self.registry.map(), self.limits.max_transfer)?;

        if route.src.id == route.dst.id && spec.len > 0 && !self.is_mapped(route.dst.id) {
            let (src, dst, len) = (spec.src as u64, spec.dst as u64, spec.len as u64);
            if src < dst + len && dst < src + len {
                return Err(Error::OverlappingRanges(route.dst.id));
            }
        }

        Ok(route)
    }

    /// Execute a transfer between two registered ranges
    pub fn execute(&mut self, spec: &TransferSpec) -> TransferResult {
        self.execute_with_progress(spec, &mut NoProgress)
    }

    /// Execute a transfer, reporting progress
    pub fn execute_with_progress(
        &mut self,
        spec: &TransferSpec,
        progress: &mut dyn TransferProgress,
    ) -> TransferResult {
        let route = self.validate(spec).map_err(|e| {
            log::debug!("Rejected transfer {}: {}", spec, e);
            e
        })?;
        log::debug!("Transfer {} ({} -> {})", spec, route.src.id, route.dst.id);

        let src = Source::Region {
            id: route.src.id,
            offset: route.src.offset_of(spec.src),
        };
        self.run(
            route.dst,
            route.dst.offset_of(spec.dst),
            src,
            spec.len,
            spec.erase,
            progress,
        )
    }

    /// Program a caller buffer into a registered range
    pub fn load(&mut self, dst: u32, data: &[u8], erase: bool) -> TransferResult {
        self.load_with_progress(dst, data, erase, &mut NoProgress)
    }

    /// Program a caller buffer into a registered range, reporting progress
    pub fn load_with_progress(
        &mut self,
        dst: u32,
        data: &[u8],
        erase: bool,
        progress: &mut dyn TransferProgress,
    ) -> TransferResult {
        let len = self.host_len(data.len())?;
        let span = self.classify_span(dst, len)?;
        log::debug!("Load {} bytes to 0x{:08X} ({})", len, dst, span.id);
        self.run(
            span,
            span.offset_of(dst),
            Source::Host(data),
            len,
            erase,
            progress,
        )
    }

    /// Read a registered range into a caller buffer
    pub fn fetch(&mut self, src: u32, buf: &mut [u8]) -> Result<()> {
        let len = self.host_len(buf.len())?;
        let span = self.classify_span(src, len)?;
        if len == 0 {
            return Ok(());
        }

        log::debug!("Fetch {} bytes from 0x{:08X} ({})", len, src, span.id);
        backend_of(&mut self.registry, span.id)?
            .read(span.offset_of(src), buf)
            .map_err(|e| Error::backend(span.id, e))
    }

    /// Erase every erase unit overlapping `[addr, addr + len)`
    ///
    /// Returns the number of units erased; 0 for regions without an erase
    /// unit.
    pub fn erase_range(&mut self, addr: u32, len: u32) -> Result<u32> {
        let span = self.classify_span(addr, len)?;
        let backend = backend_of(&mut self.registry, span.id)?;
        let Some(unit) = backend.erase_unit() else {
            log::debug!("{} has no erase unit, nothing to erase", span.id);
            return Ok(0);
        };

        let first = span.offset_of(addr);
        let end = first as u64 + len as u64;
        let mut offset = (first - first % unit) as u64;
        let mut count = 0;
        while offset < end {
            log::trace!(
                "Erasing {} unit at 0x{:08X}",
                span.id,
                span.base as u64 + offset
            );
            backend
                .erase(offset as u32)
                .map_err(|e| Error::backend(span.id, e))?;
            offset += unit as u64;
            count += 1;
        }

        log::debug!("Erased {} unit(s) in {}", count, span.id);
        Ok(count)
    }

    fn run(
        &mut self,
        dst: RegionSpan,
        dst_offset: u32,
        src: Source<'_>,
        len: u32,
        erase: bool,
        progress: &mut dyn TransferProgress,
    ) -> TransferResult {
        progress.started(len);
        if len == 0 {
            return Ok(TransferStats::default());
        }

        if self.copy_direct(dst.id, dst_offset, src, len) {
            progress.advanced(len);
            log::trace!("Direct copy of {} bytes into {}", len, dst.id);
            return Ok(TransferStats {
                bytes: len,
                chunks: 1,
                erases: 0,
                direct: true,
            });
        }

        let unit = self
            .registry
            .region(dst.id)
            .and_then(|r| r.backend().erase_unit());
        if erase && unit.is_none() {
            log::trace!("Erase requested on {}, which has nothing to erase", dst.id);
        }
        let erase_unit = unit.filter(|_| erase);

        let mut stats = TransferStats::default();
        let mut done = 0u32;
        while done < len {
            let offset = dst_offset + done;
            let chunk = match unit {
                Some(unit) => min(unit - offset % unit, len - done),
                None => min(self.limits.bounce_size, len - done),
            };
            log::trace!(
                "Chunk {} bytes at 0x{:08X} ({})",
                chunk,
                dst.base + offset,
                dst.id
            );

            if let Err(error) = self.copy_chunk(dst.id, offset, src.advance(done), chunk, erase_unit) {
                log::warn!(
                    "Transfer into {} failed after {} of {} bytes: {}",
                    dst.id,
                    done,
                    len,
                    error
                );
                return Err(TransferError {
                    error,
                    completed: done,
                });
            }

            if let Some(unit) = erase_unit {
                stats.erases += 1;
                progress.erased(dst.base + offset - offset % unit, unit);
            }
            done += chunk;
            stats.chunks += 1;
            progress.advanced(done);
        }

        stats.bytes = len;
        Ok(stats)
    }

    /// Copy memory to memory when both sides are mapped
    fn copy_direct(&mut self, dst: RegionId, dst_offset: u32, src: Source<'_>, len: u32) -> bool {
        let (to, len) = (dst_offset as usize, len as usize);

        match src {
            Source::Host(data) => {
                let Some(view) = backend_of(&mut self.registry, dst)
                    .ok()
                    .and_then(|b| b.mapped_mut())
                else {
                    return false;
                };
                view[to..to + len].copy_from_slice(&data[..len]);
            }
            Source::Region { id, offset } if id == dst => {
                let Some(view) = backend_of(&mut self.registry, dst)
                    .ok()
                    .and_then(|b| b.mapped_mut())
                else {
                    return false;
                };
                let from = offset as usize;
                view.copy_within(from..from + len, to);
            }
            Source::Region { id, offset } => {
                let Some((target, source)) = self.registry.pair_mut(dst, id) else {
                    return false;
                };
                let (Some(from_view), Some(to_view)) =
                    (source.backend().mapped(), target.backend_mut().mapped_mut())
                else {
                    return false;
                };
                let from = offset as usize;
                to_view[to..to + len].copy_from_slice(&from_view[from..from + len]);
            }
        }

        true
    }

    /// Move one chunk into the destination
    fn copy_chunk(
        &mut self,
        dst: RegionId,
        offset: u32,
        src: Source<'_>,
        len: u32,
        erase_unit: Option<u32>,
    ) -> Result<()> {
        let Self {
            registry, scratch, ..
        } = self;
        let size = len as usize;

        if let Some(unit) = erase_unit {
            let start = offset - offset % unit;
            if start != offset || len != unit {
                // Partial unit: merge with what the unit holds now
                let rel = (offset - start) as usize;
                let buf = scratch.get_mut(unit as usize);
                backend_of(registry, dst)?
                    .read(start, buf)
                    .map_err(|e| Error::backend(dst, e))?;
                read_source(registry, src, &mut buf[rel..rel + size])?;
                return program(backend_of(registry, dst)?, dst, start, buf, true);
            }
        }
        let erase_first = erase_unit.is_some();

        match src {
            Source::Host(data) => {
                return program(backend_of(registry, dst)?, dst, offset, &data[..size], erase_first);
            }
            Source::Region { id, offset: from } if id != dst => {
                // Mapped source: program straight from its view
                if let Some((target, source)) = registry.pair_mut(dst, id) {
                    if let Some(view) = source.backend().mapped() {
                        let from = from as usize;
                        return program(
                            target.backend_mut(),
                            dst,
                            offset,
                            &view[from..from + size],
                            erase_first,
                        );
                    }
                }
            }
            Source::Region { .. } => {}
        }

        let buf = scratch.get_mut(size);
        read_source(registry, src, buf)?;
        program(backend_of(registry, dst)?, dst, offset, buf, erase_first)
    }

    fn classify_span(&self, addr: u32, len: u32) -> Result<RegionSpan> {
        self.registry
            .map()
            .span_for(addr, len)
            .copied()
            .ok_or(Error::InvalidRange { addr, len })
    }

    fn host_len(&self, len: usize) -> Result<u32> {
        let max = self.limits.max_transfer;
        match u32::try_from(len) {
            Ok(len) if len <= max => Ok(len),
            Ok(len) => Err(Error::TransferTooLarge { len, max }),
            Err(_) => Err(Error::TransferTooLarge { len: u32::MAX, max }),
        }
    }

    fn is_mapped(&self, id: RegionId) -> bool {
        self.registry
            .region(id)
            .is_some_and(|r| r.backend().mapped().is_some())
    }
}

fn backend_of(registry: &mut RegionRegistry, id: RegionId) -> Result<&mut DynBackend> {
    registry
        .region_mut(id)
        .map(|r| r.backend_mut())
        .ok_or(Error::Unregistered(id))
}

fn read_source(registry: &mut RegionRegistry, src: Source<'_>, buf: &mut [u8]) -> Result<()> {
    match src {
        Source::Host(data) => {
            buf.copy_from_slice(&data[..buf.len()]);
            Ok(())
        }
        Source::Region { id, offset } => backend_of(registry, id)?
            .read(offset, buf)
            .map_err(|e| Error::backend(id, e)),
    }
}

fn program(
    backend: &mut DynBackend,
    region: RegionId,
    offset: u32,
    data: &[u8],
    erase_first: bool,
) -> Result<()> {
    if erase_first {
        log::trace!("Erasing {} unit at offset 0x{:08X}", region, offset);
        backend
            .erase(offset)
            .map_err(|e| Error::backend(region, e))?;
    }
    backend
        .write(offset, data)
        .map_err(|e| Error::backend(region, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, RamBackend};
    use crate::config::{BoardConfig, RegionConfig};
    use crate::error::{BackendError, BackendOp, DriverFault};
    use crate::region::{BackendHandles, Technology};
    use std::sync::{Arc, Mutex};

    const RAM_A: u32 = 0x2000_0000;
    const RAM_B: u32 = 0x6000_0000;
    const FLASH: u32 = 0x9000_0000;
    const UNIT: u32 = 0x1000;

    #[derive(Default)]
    struct FlashLog {
        reads: usize,
        writes: Vec<(u32, usize)>,
        erases: Vec<u32>,
    }

    impl FlashLog {
        fn calls(&self) -> usize {
            self.reads + self.writes.len() + self.erases.len()
        }
    }

    /// Erase-granular mock with NOR programming semantics
    struct MockFlash {
        data: Vec<u8>,
        log: Arc<Mutex<FlashLog>>,
        fail_write_at: Option<u32>,
    }

    impl MemoryBackend for MockFlash {
        fn technology(&self) -> Technology {
            Technology::Qspi
        }

        fn size(&self) -> u32 {
            self.data.len() as u32
        }

        fn erase_unit(&self) -> Option<u32> {
            Some(UNIT)
        }

        fn read(&mut self, offset: u32, buf: &mut [u8]) -> core::result::Result<(), BackendError> {
            self.log.lock().unwrap().reads += 1;
            let start = offset as usize;
            buf.copy_from_slice(&self.data[start..start + buf.len()]);
            Ok(())
        }

        fn write(&mut self, offset: u32, data: &[u8]) -> core::result::Result<(), BackendError> {
            if self.fail_write_at == Some(offset) {
                return Err(BackendError::new(
                    BackendOp::Write,
                    offset,
                    DriverFault::ProgramFailed,
                ));
            }
            self.log.lock().unwrap().writes.push((offset, data.len()));
            let start = offset as usize;
            for (cell, byte) in self.data[start..start + data.len()].iter_mut().zip(data) {
                *cell &= byte;
            }
            Ok(())
        }

        fn erase(&mut self, offset: u32) -> core::result::Result<(), BackendError> {
            let start = offset - offset % UNIT;
            self.log.lock().unwrap().erases.push(start);
            self.data[start as usize..(start + UNIT) as usize].fill(0xFF);
            Ok(())
        }
    }

    fn engine_with(fail_write_at: Option<u32>) -> (TransferEngine, Arc<Mutex<FlashLog>>) {
        let limits = TransferLimits {
            bounce_size: 256,
            max_transfer: 0x2000,
        };
        build_engine(fail_write_at, limits)
    }

    fn build_engine(
        fail_write_at: Option<u32>,
        limits: TransferLimits,
    ) -> (TransferEngine, Arc<Mutex<FlashLog>>) {
        let mut config = BoardConfig::new();
        config.add_region(RegionConfig::ram(RegionId::InternalRam, RAM_A, 0x1000));
        config.add_region(RegionConfig::ram(RegionId::ExternalRam, RAM_B, 0x1000));
        config.add_region(RegionConfig::qspi(RegionId::Qspi, FLASH, 0x4000, UNIT, 256));

        let log = Arc::new(Mutex::new(FlashLog::default()));
        let flash = MockFlash {
            data: vec![0xFF; 0x4000],
            log: log.clone(),
            fail_write_at,
        };
        let handles = BackendHandles::new()
            .with(RegionId::InternalRam, RamBackend::new(vec![0u8; 0x1000]))
            .with(RegionId::ExternalRam, RamBackend::new(vec![0u8; 0x1000]))
            .with(RegionId::Qspi, flash);

        let registry = RegionRegistry::init(&config, handles).unwrap();
        (TransferEngine::new(registry, limits), log)
    }

    fn engine() -> (TransferEngine, Arc<Mutex<FlashLog>>) {
        engine_with(None)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_scratch_sized_for_largest_unit() {
        let (engine, _) = engine();
        assert_eq!(engine.scratch_capacity(), UNIT as usize);
    }

    #[test]
    fn test_ram_to_ram_is_direct() {
        let (mut engine, _) = engine();
        let seed: Vec<u8> = (0..10).collect();
        engine.load(RAM_B + 0x40, &seed, false).unwrap();

        let stats = engine
            .execute(&TransferSpec::new(RAM_A + 0x100, RAM_B + 0x40, 10))
            .unwrap();
        assert!(stats.direct);
        assert_eq!(stats.bytes, 10);

        let mut out = [0u8; 10];
        engine.fetch(RAM_A + 0x100, &mut out).unwrap();
        assert_eq!(out.to_vec(), seed);
    }

    #[test]
    fn test_overlapping_ram_copy_is_memmove() {
        let (mut engine, _) = engine();
        engine.load(RAM_A, &[1, 2, 3, 4, 5, 6], false).unwrap();
        engine
            .execute(&TransferSpec::new(RAM_A + 2, RAM_A, 4))
            .unwrap();

        let mut out = [0u8; 6];
        engine.fetch(RAM_A, &mut out).unwrap();
        assert_eq!(out, [1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn test_erase_cycles_for_exact_multiple() {
        let (mut engine, log) = engine();
        let data = pattern(0x2000);
        engine.load(RAM_A, &data[..0x1000], false).unwrap();

        let stats = engine
            .execute(&TransferSpec::new(FLASH, RAM_A, 0x1000).with_erase(true))
            .unwrap();
        assert_eq!(stats.erases, 1);
        assert_eq!(stats.chunks, 1);

        let stats = engine.load(FLASH + 0x1000, &data, true).unwrap();
        assert_eq!(stats.erases, 2);
        assert_eq!(stats.chunks, 2);
        assert!(!stats.direct);

        let log = log.lock().unwrap();
        assert_eq!(log.erases, vec![0, 0x1000, 0x2000]);
        assert_eq!(log.writes, vec![(0, 0x1000), (0x1000, 0x1000), (0x2000, 0x1000)]);
    }

    #[test]
    fn test_no_erase_without_flag() {
        let (mut engine, log) = engine();
        engine
            .load(FLASH + 0x800, &pattern(0x1000), false)
            .unwrap();

        let log = log.lock().unwrap();
        assert!(log.erases.is_empty());
        // Chunks split on unit boundaries
        assert_eq!(log.writes, vec![(0x800, 0x800), (0x1000, 0x800)]);
    }

    #[test]
    fn test_erase_flag_on_ram_is_noop() {
        let (mut engine, _) = engine();
        let stats = engine.load(RAM_A, &[0xAA; 32], true).unwrap();
        assert_eq!(stats.erases, 0);

        let mut out = [0u8; 32];
        engine.fetch(RAM_A, &mut out).unwrap();
        assert_eq!(out, [0xAA; 32]);
    }

    #[test]
    fn test_partial_erase_preserves_neighbours() {
        let (mut engine, log) = engine();
        engine.load(FLASH, &[0xAB; 0x1000], true).unwrap();
        engine.load(FLASH + 0x10, &[0x12; 0x10], true).unwrap();

        let mut out = vec![0u8; 0x1000];
        engine.fetch(FLASH, &mut out).unwrap();
        assert!(out[..0x10].iter().all(|&b| b == 0xAB));
        assert!(out[0x10..0x20].iter().all(|&b| b == 0x12));
        assert!(out[0x20..].iter().all(|&b| b == 0xAB));
        assert_eq!(log.lock().unwrap().erases, vec![0, 0]);
    }

    #[test]
    fn test_flash_to_ram_uses_bounce_chunks() {
        let (mut engine, _) = engine();
        let data = pattern(0x300);
        engine.load(FLASH, &data, true).unwrap();

        let stats = engine
            .execute(&TransferSpec::new(RAM_B, FLASH, 0x300))
            .unwrap();
        assert_eq!(stats.chunks, 3);
        assert!(!stats.direct);

        let mut out = vec![0u8; 0x300];
        engine.fetch(RAM_B, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_zero_bounce_size_falls_back_to_default() {
        let limits = TransferLimits {
            bounce_size: 0,
            max_transfer: 0x2000,
        };
        let (mut engine, _) = build_engine(None, limits);
        assert_eq!(engine.limits().bounce_size, DEFAULT_BOUNCE_SIZE);

        let data = pattern(0x300);
        engine.load(FLASH, &data, true).unwrap();
        let stats = engine
            .execute(&TransferSpec::new(RAM_B, FLASH, 0x300))
            .unwrap();
        assert_eq!(stats.bytes, 0x300);
        assert_eq!(stats.chunks, 1);

        let mut out = vec![0u8; 0x300];
        engine.fetch(RAM_B, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_flash_to_flash_same_unit() {
        let (mut engine, _) = engine();
        let data = pattern(0x40);
        engine.load(FLASH + 0x100, &data, true).unwrap();

        engine
            .execute(&TransferSpec::new(FLASH + 0x800, FLASH + 0x100, 0x40).with_erase(true))
            .unwrap();

        let mut out = vec![0u8; 0x40];
        engine.fetch(FLASH + 0x800, &mut out).unwrap();
        assert_eq!(out, data);
        engine.fetch(FLASH + 0x100, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_invalid_range_touches_nothing() {
        let (mut engine, log) = engine();
        let past_end = FLASH + 0x4000;

        let err = engine
            .execute(&TransferSpec::new(RAM_A, past_end, 1))
            .unwrap_err();
        assert_eq!(
            err.error,
            Error::InvalidRange {
                addr: past_end,
                len: 1
            }
        );
        assert_eq!(err.completed, 0);

        let err = engine
            .execute(&TransferSpec::new(FLASH + 0x3FFF, RAM_A, 2).with_erase(true))
            .unwrap_err();
        assert!(matches!(err.error, Error::InvalidRange { .. }));
        assert_eq!(log.lock().unwrap().calls(), 0);
    }

    #[test]
    fn test_transfer_ceiling() {
        let (mut engine, log) = engine();
        let err = engine
            .execute(&TransferSpec::new(FLASH, RAM_A, 0x2001))
            .unwrap_err();
        assert_eq!(
            err.error,
            Error::TransferTooLarge {
                len: 0x2001,
                max: 0x2000
            }
        );
        assert_eq!(log.lock().unwrap().calls(), 0);
    }

    #[test]
    fn test_zero_length_is_noop() {
        let (mut engine, log) = engine();
        let stats = engine
            .execute(&TransferSpec::new(FLASH, RAM_A, 0).with_erase(true))
            .unwrap();
        assert_eq!(stats, TransferStats::default());
        assert_eq!(log.lock().unwrap().calls(), 0);
    }

    #[test]
    fn test_overlapping_flash_ranges_rejected() {
        let (mut engine, log) = engine();
        let err = engine
            .execute(&TransferSpec::new(FLASH + 0x10, FLASH, 0x20))
            .unwrap_err();
        assert_eq!(err.error, Error::OverlappingRanges(RegionId::Qspi));
        assert_eq!(log.lock().unwrap().calls(), 0);
    }

    #[test]
    fn test_partial_failure_reports_completed() {
        let (mut engine, log) = engine_with(Some(0x2000));
        let err = engine.load(FLASH + 0x1000, &pattern(0x2000), true).unwrap_err();

        assert_eq!(err.completed, 0x1000);
        assert!(matches!(
            err.error,
            Error::Backend {
                region: RegionId::Qspi,
                source: BackendError {
                    op: BackendOp::Write,
                    offset: 0x2000,
                    ..
                }
            }
        ));
        // First chunk stays programmed
        assert_eq!(log.lock().unwrap().writes, vec![(0x1000, 0x1000)]);
        let mut out = vec![0u8; 0x1000];
        engine.fetch(FLASH + 0x1000, &mut out).unwrap();
        assert_eq!(out, pattern(0x1000));
    }

    #[test]
    fn test_erase_range() {
        let (mut engine, log) = engine();
        assert_eq!(engine.erase_range(FLASH + 0xFFF, 2).unwrap(), 2);
        assert_eq!(engine.erase_range(FLASH, 0x4000).unwrap(), 4);
        assert_eq!(engine.erase_range(RAM_A, 0x1000).unwrap(), 0);
        assert_eq!(engine.erase_range(FLASH, 0).unwrap(), 0);
        assert!(engine.erase_range(FLASH + 0x3000, 0x1001).is_err());

        assert_eq!(
            log.lock().unwrap().erases,
            vec![0, 0x1000, 0, 0x1000, 0x2000, 0x3000]
        );
    }

    #[test]
    fn test_progress_reports() {
        #[derive(Default)]
        struct Recorder {
            total: u32,
            erased: Vec<(u32, u32)>,
            steps: Vec<u32>,
        }

        impl TransferProgress for Recorder {
            fn started(&mut self, total_bytes: u32) {
                self.total = total_bytes;
            }
            fn erased(&mut self, addr: u32, len: u32) {
                self.erased.push((addr, len));
            }
            fn advanced(&mut self, bytes_done: u32) {
                self.steps.push(bytes_done);
            }
        }

        let (mut engine, _) = engine();
        let mut recorder = Recorder::default();
        engine
            .load_with_progress(FLASH + 0x800, &pattern(0x1000), true, &mut recorder)
            .unwrap();

        assert_eq!(recorder.total, 0x1000);
        assert_eq!(recorder.erased, vec![(FLASH, UNIT), (FLASH + 0x1000, UNIT)]);
        assert_eq!(recorder.steps, vec![0x800, 0x1000]);
    }
}
