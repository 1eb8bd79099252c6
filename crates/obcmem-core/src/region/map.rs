//! Region classifier
//!
//! [`RegionMap`] is the immutable, backend-free view of the region table.
//! It is cheap to clone and share, so callers can classify addresses
//! without touching the engine or any backend.

use super::{RegionId, RegionSpan};

/// Immutable table of region spans, sorted by base address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    spans: Vec<RegionSpan>,
}

impl RegionMap {
    /// Build a map from a set of spans
    pub fn new(mut spans: Vec<RegionSpan>) -> Self {
        spans.sort_by_key(|s| s.base);
        Self { spans }
    }

    /// Find the region that fully contains `[addr, addr + len)`
    ///
    /// Returns `None` when the range starts outside every region, crosses
    /// a region boundary, or is empty and sits exactly at a region end.
    pub fn classify(&self, addr: u32, len: u32) -> Option<RegionId> {
        let mut found = self.spans.iter().filter(|span| span.contains(addr, len));
        let span = found.next()?;
        debug_assert!(
            found.next().is_none(),
            "overlapping regions in a validated map"
        );
        Some(span.id)
    }

    /// Find the span that fully contains `[addr, addr + len)`
    pub fn span_for(&self, addr: u32, len: u32) -> Option<&RegionSpan> {
        self.spans.iter().find(|span| span.contains(addr, len))
    }

    /// Look up a span by region id
    pub fn get(&self, id: RegionId) -> Option<&RegionSpan> {
        self.spans.iter().find(|span| span.id == id)
    }

    /// Iterate over spans in address order
    pub fn iter(&self) -> impl Iterator<Item = &RegionSpan> {
        self.spans.iter()
    }

    /// Get the number of regions
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> RegionMap {
        RegionMap::new(vec![
            RegionSpan::new(RegionId::Qspi, 0x9000_0000, 0x10_0000),
            RegionSpan::new(RegionId::InternalRam, 0x2000_0000, 0x1_0000),
            RegionSpan::new(RegionId::ExternalRam, 0x2001_0000, 0x1_0000),
        ])
    }

    #[test]
    fn test_classify_inside() {
        let map = map();
        assert_eq!(map.classify(0x2000_0000, 16), Some(RegionId::InternalRam));
        assert_eq!(map.classify(0x2001_FFF0, 16), Some(RegionId::ExternalRam));
        assert_eq!(map.classify(0x9000_1000, 0x1000), Some(RegionId::Qspi));
    }

    #[test]
    fn test_classify_boundaries() {
        let map = map();
        // Crossing from one region into the adjacent one
        assert_eq!(map.classify(0x2000_FFF0, 0x20), None);
        // Starts before any region
        assert_eq!(map.classify(0x1FFF_FFFF, 2), None);
        // One past the end of the last region
        assert_eq!(map.classify(0x9010_0000, 1), None);
        // Empty range at the end of a region
        assert_eq!(map.classify(0x9010_0000, 0), None);
        // Empty range at the end of one region is the start of the next
        assert_eq!(map.classify(0x2001_0000, 0), Some(RegionId::ExternalRam));
    }

    #[test]
    fn test_classify_matches_span_rule() {
        let map = map();
        for span in map.iter() {
            for (addr, len) in [
                (span.base, span.length),
                (span.base, span.length + 1),
                (span.base + span.length - 1, 1),
                (span.base + span.length - 1, 2),
                (span.base.wrapping_sub(1), 1),
            ] {
                let expected = span.base as u64 <= addr as u64
                    && (addr as u64) < span.end
                    && addr as u64 + len as u64 <= span.end;
                assert_eq!(map.classify(addr, len) == Some(span.id), expected);
            }
        }
    }

    #[test]
    fn test_sorted_and_lookup() {
        let map = map();
        let bases: Vec<u32> = map.iter().map(|s| s.base).collect();
        assert_eq!(bases, vec![0x2000_0000, 0x2001_0000, 0x9000_0000]);
        assert_eq!(map.get(RegionId::Qspi).unwrap().length, 0x10_0000);
        assert!(map.get(RegionId::InternalNor).is_none());
        assert_eq!(map.len(), 3);
    }
}
