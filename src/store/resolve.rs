use tilegrid::TileKey;

use crate::index::format::TileEntry;
use crate::index::TileView;
use crate::store::MappedHandle;

/// Absolute position of a tile's payload block in the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub offset: u64,
    pub len: u64,
}

impl ByteRange {
    /// One past the last byte; saturates rather than wrapping.
    #[inline] pub fn end(&self) -> u64 { self.offset.saturating_add(self.len) }
}

/// Result of resolving a tile. `Empty` is a normal answer, not an error.
#[derive(Debug, Clone, Copy)]
pub enum TileLookup<'a> {
    Populated(TileView<'a>),
    Empty,
}

impl<'a> TileLookup<'a> {
    #[inline] pub fn is_empty(&self) -> bool { matches!(self, Self::Empty) }

    pub fn view(self) -> Option<TileView<'a>> {
        match self {
            Self::Populated(view) => Some(view),
            Self::Empty => None,
        }
    }

    /// Number of features in the tile (0 when empty).
    pub fn feature_count(&self) -> u32 {
        match self {
            Self::Populated(view) => view.feature_count(),
            Self::Empty => 0,
        }
    }
}

impl MappedHandle {
    /// Offset table row of `key`, by binary search. Keys deeper than the
    /// index's max depth are never present.
    fn entry(&self, key: TileKey) -> Option<&TileEntry> {
        if key.zoom() > self.max_depth() { return None }
        let table = self.table();
        let packed = key.packed();
        table.binary_search_by_key(&packed, TileEntry::packed_key)
            .ok()
            .map(|i| &table[i])
    }

    /// Byte range recorded for `key`, or `None` for an empty tile.
    pub fn locate(&self, key: TileKey) -> Option<ByteRange> {
        self.entry(key).map(|e| ByteRange { offset: e.offset(), len: e.len() })
    }

    /// View over the features of `key`, read in place from the map.
    pub fn resolve(&self, key: TileKey) -> TileLookup<'_> {
        let Some(entry) = self.entry(key) else { return TileLookup::Empty };
        let range = ByteRange { offset: entry.offset(), len: entry.len() };
        match self.bytes(range) {
            Some(bytes) => TileLookup::Populated(TileView::new(key, range.offset, bytes, entry.feature_count(), self.dictionary())),
            None => TileLookup::Empty,
        }
    }

    /// `resolve` from raw request coordinates; coordinates that do not form a
    /// tile key (x or y outside the zoom's grid) resolve to `Empty`.
    pub fn resolve_xyz(&self, zoom: u8, x: u32, y: u32) -> TileLookup<'_> {
        match TileKey::new(zoom, x, y) {
            Some(key) => self.resolve(key),
            None => TileLookup::Empty,
        }
    }

    /// The mapped bytes of `range`; `None` if it falls outside the region.
    pub fn bytes(&self, range: ByteRange) -> Option<&[u8]> {
        let start = usize::try_from(range.offset).ok()?;
        let end = usize::try_from(range.end()).ok()?;
        self.region().get(start..end)
    }

    /// Every populated key, ascending.
    pub fn populated_keys(&self) -> impl ExactSizeIterator<Item = TileKey> + '_ {
        // Keys were checked on open.
        self.table().iter().map(|e| e.key().unwrap_or(TileKey::ROOT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, RootExtent};
    use crate::feature::GeographicFeature;
    use crate::index::serialize_ephemeral;
    use crate::partition::Partitioner;
    use tilegrid::{BoundingBox, Coord};

    fn handle(features: Vec<GeographicFeature>, max_depth: u8) -> MappedHandle {
        let config = IndexConfig::default().with_max_depth(max_depth).with_extent(RootExtent::World);
        let mut p = Partitioner::new(&config, BoundingBox::WORLD).unwrap();
        for f in &features { p.push(f).unwrap() }
        let partition = p.finish().unwrap();
        MappedHandle::open_artifact(serialize_ephemeral(&partition, None).unwrap()).unwrap()
    }

    #[test]
    fn resolves_populated_and_empty() {
        let cafe = GeographicFeature::point(7, Coord::new(485_000_000, 23_000_000), [("amenity", "cafe")]).unwrap();
        let h = handle(vec![cafe], 4);
        assert_eq!(h.tile_count(), 5);

        let key = h.grid().locate(Coord::new(485_000_000, 23_000_000), 4).unwrap();
        let view = h.resolve(key).view().unwrap();
        let features: Vec<_> = view.features().collect::<Result<_, _>>().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id(), 7);
        assert_eq!(features[0].tag("amenity"), Some("cafe"));

        let range = h.locate(key).unwrap();
        assert_eq!(h.bytes(range), Some(view.bytes()));

        assert!(h.resolve(TileKey::new(4, 0, 15).unwrap()).is_empty());
        assert!(h.resolve_xyz(5, 0, 0).is_empty());
        assert!(h.resolve_xyz(2, 4, 0).is_empty());
        assert_eq!(h.populated_keys().len(), 5);
    }

    #[test]
    fn out_of_region_range_is_none() {
        let h = handle(Vec::new(), 2);
        assert!(h.bytes(ByteRange { offset: h.len(), len: 1 }).is_none());
        assert!(h.bytes(ByteRange { offset: 0, len: 8 }).is_some());
        assert!(h.bytes(ByteRange { offset: 8, len: u64::MAX }).is_none());
        assert_eq!(h.populated_keys().count(), 0);
        assert!(h.resolve(TileKey::ROOT).is_empty());
    }
}
