//! Quad-tree assignment of features to tile cells.
//!
//! The tree is an arena keyed by `TileKey`: a cell exists only if at least one
//! feature intersects it, and each feature descends only into the children of
//! cells it intersected.
//!
//! Features are not kept in memory. `Partitioner::push` encodes each one into
//! an anonymous spill file in its final payload form and records its index in
//! every cell it reaches; the serializer later copies those records out of the
//! mapped spill, cell by cell. With the `dataset` extent the root box must be
//! known before the first push, which a `Survey` scan provides.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use smallvec::SmallVec;
use tilegrid::{split, BoundingBox, Coord, Quadrant, TileGrid, TileKey};
use tracing::{debug, info};
use zerocopy::IntoBytes;

use crate::config::{IndexConfig, RootExtent};
use crate::error::PartitionError;
use crate::feature::{GeographicFeature, TagDictionary};
use crate::index::format::{CoordRecord, FeatureRecord, TagRecord};

/// Interned `(key, value)` ids of one feature, ordered by key string.
pub type TagIds = SmallVec<[(u32, u32); 4]>;

/// A populated cell: its key, its box, and the indices of every feature whose
/// box intersects it, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileCell {
    key: TileKey,
    bounds: BoundingBox,
    features: Vec<u32>,
}

impl TileCell {
    #[inline] pub fn key(&self) -> TileKey { self.key }

    #[inline] pub fn bounds(&self) -> &BoundingBox { &self.bounds }

    /// Feature indices, in the order the source delivered them.
    #[inline] pub fn features(&self) -> &[u32] { &self.features }
}

/// Counters reported after assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub features: u64,
    pub cells: u64,
    /// Total feature references over all cells.
    pub references: u64,
    pub max_cell_features: u64,
    /// Bytes of encoded feature records, each counted once.
    pub encoded_bytes: u64,
}

/// First pass over a source: the union of all feature boxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Survey {
    bounds: Option<BoundingBox>,
    features: u64,
}

impl Survey {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, feature: &GeographicFeature) {
        self.bounds = Some(match self.bounds {
            Some(b) => b.union(feature.bbox()),
            None => *feature.bbox(),
        });
        self.features += 1;
    }

    #[inline] pub fn features(&self) -> u64 { self.features }

    /// Root box for the `dataset` extent. An empty survey gives a single
    /// point at the origin.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds.unwrap_or(BoundingBox::point(Coord::new(0, 0)))
    }
}

/// Encodes features into the spill and assigns them to cells.
#[derive(Debug)]
pub struct Partitioner {
    grid: TileGrid,
    extent: RootExtent,
    dictionary: TagDictionary,
    spill: BufWriter<File>,
    /// Spill offset of every record pushed so far.
    offsets: Vec<u64>,
    spill_len: u64,
    cells: BTreeMap<TileKey, TileCell>,
    stack: Vec<(TileKey, BoundingBox)>,
}

impl Partitioner {
    /// A partitioner over `root`, spilling into `config.scratch_dir` (or the
    /// system temp directory).
    pub fn new(config: &IndexConfig, root: BoundingBox) -> Result<Self, PartitionError> {
        let grid = TileGrid::new(root, config.max_depth)?;
        let spill = match config.scratch_dir.as_deref() {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
        .map_err(PartitionError::Spill)?;
        debug!("[partition] spilling into {}", config.scratch_dir.as_deref().unwrap_or(Path::new("<temp>")).display());

        Ok(Self {
            grid,
            extent: config.extent,
            dictionary: TagDictionary::new(),
            spill: BufWriter::new(spill),
            offsets: Vec::new(),
            spill_len: 0,
            cells: BTreeMap::new(),
            stack: Vec::new(),
        })
    }

    #[inline] pub fn grid(&self) -> &TileGrid { &self.grid }

    /// Encode `feature` and reference it from every cell its box intersects,
    /// down to `max_depth`.
    pub fn push(&mut self, feature: &GeographicFeature) -> Result<(), PartitionError> {
        let index = feature_index(self.offsets.len())?;
        let bbox = feature.bbox();
        if !self.grid.root().contains_box(bbox) {
            return Err(PartitionError::OutsideRoot { id: feature.id() });
        }

        let mut tags = TagIds::new();
        for (k, v) in feature.tags() {
            tags.push((self.intern(k)?, self.intern(v)?));
        }
        let record = FeatureRecord::new(
            feature.id(),
            feature.kind().to_byte(),
            element_count(feature, feature.coords().len(), "coordinates")?,
            element_count(feature, tags.len(), "tags")?,
        );
        self.write_record(&record, feature.coords(), &tags).map_err(PartitionError::Spill)?;
        self.offsets.push(self.spill_len);
        self.spill_len += record.encoded_len();

        self.stack.push((TileKey::ROOT, *self.grid.root()));
        while let Some((key, bounds)) = self.stack.pop() {
            self.cells.entry(key)
                .or_insert_with(|| TileCell { key, bounds, features: Vec::new() })
                .features
                .push(index);

            if key.zoom() >= self.grid.max_depth() { continue }
            for (q, child) in Quadrant::ALL.into_iter().zip(split(&bounds)) {
                if let Some(child) = child.filter(|c| c.intersects(bbox)) {
                    self.stack.push((key.child(q), child));
                }
            }
        }
        Ok(())
    }

    fn intern(&mut self, s: &str) -> Result<u32, PartitionError> {
        self.dictionary.intern(s).ok_or(PartitionError::TooManyStrings)
    }

    fn write_record(&mut self, record: &FeatureRecord, coords: &[Coord], tags: &[(u32, u32)]) -> std::io::Result<()> {
        self.spill.write_all(record.as_bytes())?;
        for &c in coords {
            self.spill.write_all(CoordRecord::from(c).as_bytes())?;
        }
        for &(k, v) in tags {
            self.spill.write_all(TagRecord::new(k, v).as_bytes())?;
        }
        Ok(())
    }

    #[inline] pub fn len(&self) -> usize { self.offsets.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.offsets.is_empty() }

    /// Flush and map the spill, closing the partition.
    pub fn finish(self) -> Result<Partition, PartitionError> {
        let Self { grid, extent, dictionary, spill, mut offsets, spill_len, cells, .. } = self;

        let file = spill.into_inner().map_err(|e| PartitionError::Spill(e.into_error()))?;
        let map = if spill_len == 0 {
            None
        } else {
            // SAFETY: the spill is an unlinked temporary owned by this
            // partition and is not written again once mapped.
            Some(unsafe { Mmap::map(&file) }.map_err(PartitionError::Spill)?)
        };
        offsets.push(spill_len);

        let stats = PartitionStats {
            features: offsets.len() as u64 - 1,
            cells: cells.len() as u64,
            references: cells.values().map(|c| c.features.len() as u64).sum(),
            max_cell_features: cells.values().map(|c| c.features.len() as u64).max().unwrap_or(0),
            encoded_bytes: spill_len,
        };
        info!(
            "[partition] {} features into {} cells ({} references, max {} per cell, depth {})",
            stats.features, stats.cells, stats.references, stats.max_cell_features, grid.max_depth(),
        );
        debug!("[partition] root {:?}, {} dictionary strings, {spill_len} spilled bytes", grid.root(), dictionary.len());

        Ok(Partition { grid, extent, dictionary, cells, stats, spill: Spill { map, offsets, _file: file } })
    }
}

/// Index of the next feature; indices are stored as `u32`.
fn feature_index(count: usize) -> Result<u32, PartitionError> {
    u32::try_from(count).map_err(|_| PartitionError::TooManyFeatures)
}

fn element_count(feature: &GeographicFeature, n: usize, what: &'static str) -> Result<u32, PartitionError> {
    u32::try_from(n).map_err(|_| PartitionError::FeatureTooLarge { id: feature.id(), what })
}

/// Encoded feature records, mapped read-only. `offsets` holds one start per
/// feature plus the end of the last record.
#[derive(Debug)]
struct Spill {
    map: Option<Mmap>,
    offsets: Vec<u64>,
    _file: File,
}

/// The result of partitioning: the interned tags, the encoded features and the
/// populated cells in ascending key order.
#[derive(Debug)]
pub struct Partition {
    grid: TileGrid,
    extent: RootExtent,
    dictionary: TagDictionary,
    cells: BTreeMap<TileKey, TileCell>,
    stats: PartitionStats,
    spill: Spill,
}

impl Partition {
    #[inline] pub fn grid(&self) -> &TileGrid { &self.grid }

    #[inline] pub fn extent(&self) -> RootExtent { self.extent }

    #[inline] pub fn feature_count(&self) -> u64 { self.stats.features }

    #[inline] pub fn dictionary(&self) -> &TagDictionary { &self.dictionary }

    /// Payload record of feature `index`, exactly as it is written to a tile.
    pub fn encoded(&self, index: u32) -> Option<&[u8]> {
        let i = index as usize;
        let (start, end) = (*self.spill.offsets.get(i)?, *self.spill.offsets.get(i + 1)?);
        let map = self.spill.map.as_deref()?;
        map.get(usize::try_from(start).ok()?..usize::try_from(end).ok()?)
    }

    /// Populated cells, ascending by key.
    pub fn cells(&self) -> impl ExactSizeIterator<Item = &TileCell> { self.cells.values() }

    #[inline] pub fn cell(&self, key: TileKey) -> Option<&TileCell> { self.cells.get(&key) }

    #[inline] pub fn stats(&self) -> PartitionStats { self.stats }
}
