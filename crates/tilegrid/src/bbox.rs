use geo::Rect;

use crate::coord::{Coord, LAT_LIMIT, LON_LIMIT};

/// An axis-aligned box over fixed-point coordinates.
///
/// Both bounds are inclusive: a box with `min == max` is a single point and
/// still intersects the cell that contains it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    min: Coord,
    max: Coord,
}

impl BoundingBox {
    /// The whole globe: latitude [-90, 90], longitude [-180, 180].
    pub const WORLD: Self = Self {
        min: Coord::new(-LAT_LIMIT, -LON_LIMIT),
        max: Coord::new(LAT_LIMIT, LON_LIMIT),
    };

    /// Create a box from its corners; `None` if `min` exceeds `max` on either axis.
    pub fn new(min: Coord, max: Coord) -> Option<Self> {
        (min.lat <= max.lat && min.lon <= max.lon).then_some(Self { min, max })
    }

    /// A zero-area box around a single coordinate.
    #[inline] pub fn point(c: Coord) -> Self { Self { min: c, max: c } }

    /// Smallest box containing every coordinate, or `None` for an empty sequence.
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let mut bbox = Self::point(*iter.next()?);
        for c in iter { bbox.expand(*c) }
        Some(bbox)
    }

    #[inline] pub fn min(&self) -> Coord { self.min }

    #[inline] pub fn max(&self) -> Coord { self.max }

    /// Grow the box to include `c`.
    pub fn expand(&mut self, c: Coord) {
        self.min.lat = self.min.lat.min(c.lat);
        self.min.lon = self.min.lon.min(c.lon);
        self.max.lat = self.max.lat.max(c.lat);
        self.max.lon = self.max.lon.max(c.lon);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.expand(other.min);
        out.expand(other.max);
        out
    }

    /// True if the boxes share at least one coordinate (bounds are inclusive).
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.lat <= other.max.lat && other.min.lat <= self.max.lat
            && self.min.lon <= other.max.lon && other.min.lon <= self.max.lon
    }

    /// True if `c` lies inside the box or on its edge.
    #[inline]
    pub fn contains(&self, c: Coord) -> bool {
        (self.min.lat..=self.max.lat).contains(&c.lat) && (self.min.lon..=self.max.lon).contains(&c.lon)
    }

    /// True if `other` lies entirely inside this box.
    #[inline]
    pub fn contains_box(&self, other: &Self) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// True if the box has zero extent along latitude or longitude.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.min.lat == self.max.lat || self.min.lon == self.max.lon
    }

    /// True if both corners are valid coordinates.
    #[inline] pub fn is_valid(&self) -> bool { self.min.is_valid() && self.max.is_valid() }

    /// Convert to a floating-point rectangle in degrees (`x = lon`, `y = lat`).
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(geo::Coord::from(self.min), geo::Coord::from(self.max))
    }
}
