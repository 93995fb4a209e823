//! Exact integer quad-tree subdivision.
//!
//! A cell covers inclusive integer ranges of latitude and longitude. Splitting
//! at `lon_mid = floor((lon_min + lon_max) / 2)` and
//! `lat_mid = ceil((lat_min + lat_max) / 2)` gives:
//!
//! ```text
//!                          lon_min ..= lon_mid    lon_mid+1 ..= lon_max
//! lat_mid ..= lat_max              NW                     NE
//! lat_min ..= lat_mid-1            SW                     SE
//! ```
//!
//! The four children partition the parent exactly and each side takes half of
//! an even-width range, so a coordinate on a split line always belongs to the
//! north/west (lower-indexed) side. Children whose range would be empty (a
//! parent that is one unit wide) are `None`.

use crate::bbox::BoundingBox;
use crate::coord::Coord;
use crate::key::{TileKey, MAX_ZOOM};

/// Position of a child cell within its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    /// Child order used everywhere: NW, NE, SW, SE.
    pub const ALL: [Quadrant; 4] = [Self::NorthWest, Self::NorthEast, Self::SouthWest, Self::SouthEast];

    /// Column offset within the parent (1 = east).
    #[inline]
    pub fn dx(self) -> u32 {
        match self { Self::NorthEast | Self::SouthEast => 1, _ => 0 }
    }

    /// Row offset within the parent (1 = south).
    #[inline]
    pub fn dy(self) -> u32 {
        match self { Self::SouthWest | Self::SouthEast => 1, _ => 0 }
    }

    /// Index into `Quadrant::ALL`.
    #[inline] pub fn index(self) -> usize { (self.dy() * 2 + self.dx()) as usize }

    /// Quadrant from column/row offsets; only the lowest bit of each is used.
    #[inline]
    pub fn from_offsets(dx: u32, dy: u32) -> Self {
        Self::ALL[((dy & 1) * 2 + (dx & 1)) as usize]
    }
}

/// West column end: `floor((a + b) / 2)`.
#[inline]
fn lon_midpoint(a: i32, b: i32) -> i32 {
    (a as i64 + b as i64).div_euclid(2) as i32
}

/// North row start: `ceil((a + b) / 2)`.
#[inline]
fn lat_midpoint(a: i32, b: i32) -> i32 {
    (a as i64 + b as i64 + 1).div_euclid(2) as i32
}

/// Split `cell` into its four children, in `Quadrant::ALL` order.
pub fn split(cell: &BoundingBox) -> [Option<BoundingBox>; 4] {
    let (min, max) = (cell.min(), cell.max());
    let lat_mid = lat_midpoint(min.lat, max.lat);
    let lon_mid = lon_midpoint(min.lon, max.lon);

    // (lat_min, lat_max) per row; the south row is empty when lat_mid == lat_min.
    let rows = [
        Some((lat_mid, max.lat)),
        (lat_mid > min.lat).then(|| (min.lat, lat_mid - 1)),
    ];
    // (lon_min, lon_max) per column; the east column is empty when lon_mid == lon_max.
    let cols = [
        Some((min.lon, lon_mid)),
        (lon_mid < max.lon).then(|| (lon_mid + 1, max.lon)),
    ];

    Quadrant::ALL.map(|q| {
        let (lat_lo, lat_hi) = rows[q.dy() as usize]?;
        let (lon_lo, lon_hi) = cols[q.dx() as usize]?;
        BoundingBox::new(Coord::new(lat_lo, lon_lo), Coord::new(lat_hi, lon_hi))
    })
}

/// Errors constructing a `TileGrid`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("max depth {0} exceeds the supported maximum of {max}", max = MAX_ZOOM)]
    DepthTooLarge(u8),
    #[error("root box {0:?} lies outside the valid coordinate range")]
    InvalidRoot(BoundingBox),
}

/// A root bounding box plus the deepest zoom level subdivided beneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    root: BoundingBox,
    max_depth: u8,
}

impl TileGrid {
    pub fn new(root: BoundingBox, max_depth: u8) -> Result<Self, GridError> {
        if max_depth > MAX_ZOOM { return Err(GridError::DepthTooLarge(max_depth)) }
        if !root.is_valid() { return Err(GridError::InvalidRoot(root)) }
        Ok(Self { root, max_depth })
    }

    #[inline] pub fn root(&self) -> &BoundingBox { &self.root }

    #[inline] pub fn max_depth(&self) -> u8 { self.max_depth }

    /// True if `key` addresses a level this grid subdivides to.
    #[inline] pub fn covers(&self, key: TileKey) -> bool { key.zoom() <= self.max_depth }

    /// Box covered by `key`, found by replaying the splits from the root.
    /// `None` if the cell is empty (root narrower than the tile grid).
    pub fn cell_bounds(&self, key: TileKey) -> Option<BoundingBox> {
        let mut cell = self.root;
        for level in (0..key.zoom()).rev() {
            let q = Quadrant::from_offsets(key.x() >> level, key.y() >> level);
            cell = split(&cell)[q.index()]?;
        }
        Some(cell)
    }

    /// The unique cell at `zoom` containing `c`, or `None` if `c` is outside
    /// the root or `zoom` is beyond `MAX_ZOOM`.
    pub fn locate(&self, c: Coord, zoom: u8) -> Option<TileKey> {
        if zoom > MAX_ZOOM || !self.root.contains(c) { return None }

        let mut key = TileKey::ROOT;
        let mut cell = self.root;
        for _ in 0..zoom {
            let (q, child) = Quadrant::ALL.into_iter()
                .zip(split(&cell))
                .find_map(|(q, child)| child.filter(|b| b.contains(c)).map(|b| (q, b)))?;
            key = key.child(q);
            cell = child;
        }
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(a: (i32, i32), b: (i32, i32)) -> BoundingBox {
        BoundingBox::new(Coord::new(a.0, a.1), Coord::new(b.0, b.1)).unwrap()
    }

    #[test]
    fn midpoints_round_toward_their_side() {
        assert_eq!(lon_midpoint(-3, 0), -2);
        assert_eq!(lon_midpoint(-1, 0), -1);
        assert_eq!(lon_midpoint(i32::MIN, i32::MAX), -1);
        assert_eq!(lat_midpoint(-3, 0), -1);
        assert_eq!(lat_midpoint(-1, 0), 0);
        assert_eq!(lat_midpoint(i32::MIN, i32::MAX), 0);
        assert_eq!(lat_midpoint(4, 6), 5);
    }

    #[test]
    fn split_partitions_parent() {
        let [nw, ne, sw, se] = split(&bbox((0, 0), (9, 9)));
        assert_eq!(nw, Some(bbox((5, 0), (9, 4))));
        assert_eq!(ne, Some(bbox((5, 5), (9, 9))));
        assert_eq!(sw, Some(bbox((0, 0), (4, 4))));
        assert_eq!(se, Some(bbox((0, 5), (4, 9))));
    }

    #[test]
    fn two_unit_cell_splits_into_single_units() {
        let [nw, ne, sw, se] = split(&bbox((0, 0), (1, 1)));
        assert_eq!(nw, Some(bbox((1, 0), (1, 0))));
        assert_eq!(ne, Some(bbox((1, 1), (1, 1))));
        assert_eq!(sw, Some(bbox((0, 0), (0, 0))));
        assert_eq!(se, Some(bbox((0, 1), (0, 1))));
    }

    #[test]
    fn odd_width_split_keeps_the_midline_north_west() {
        let [nw, _, sw, _] = split(&bbox((0, 0), (2, 2)));
        assert_eq!(nw, Some(bbox((1, 0), (2, 1))));
        assert_eq!(sw, Some(bbox((0, 0), (0, 1))));
    }

    #[test]
    fn split_of_single_unit_keeps_only_north_west() {
        let p = BoundingBox::point(Coord::new(7, 7));
        assert_eq!(split(&p), [Some(p), None, None, None]);
    }

    #[test]
    fn quadrant_offsets_round_trip() {
        for (i, q) in Quadrant::ALL.into_iter().enumerate() {
            assert_eq!(q.index(), i);
            assert_eq!(Quadrant::from_offsets(q.dx(), q.dy()), q);
        }
    }

    #[test]
    fn new_validates_depth() {
        assert_eq!(TileGrid::new(BoundingBox::WORLD, MAX_ZOOM + 1), Err(GridError::DepthTooLarge(MAX_ZOOM + 1)));
        assert!(TileGrid::new(BoundingBox::WORLD, MAX_ZOOM).is_ok());
    }
}
