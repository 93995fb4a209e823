use std::fmt;
use std::str::FromStr;

use crate::grid::Quadrant;

/// Deepest zoom a `TileKey` can address. Tile x/y then fit in 24 bits, which
/// leaves room for the zoom in a packed `u64`.
pub const MAX_ZOOM: u8 = 24;

const AXIS_BITS: u32 = 28;
const AXIS_MASK: u64 = (1 << AXIS_BITS) - 1;

/// Address of one quad-tree cell: zoom depth plus column (`x`, grows east) and
/// row (`y`, grows south).
///
/// The derived ordering (zoom, then x, then y) is the same as the ordering of
/// `packed()`, which is how keys are sorted on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    zoom: u8,
    x: u32,
    y: u32,
}

impl TileKey {
    /// The single cell at zoom 0.
    pub const ROOT: Self = Self { zoom: 0, x: 0, y: 0 };

    /// Create a key, or `None` if the zoom is beyond `MAX_ZOOM` or x/y fall
    /// outside the `2^zoom × 2^zoom` grid.
    pub fn new(zoom: u8, x: u32, y: u32) -> Option<Self> {
        if zoom > MAX_ZOOM { return None }
        let side = 1u32 << zoom;
        (x < side && y < side).then_some(Self { zoom, x, y })
    }

    #[inline] pub fn zoom(&self) -> u8 { self.zoom }

    #[inline] pub fn x(&self) -> u32 { self.x }

    #[inline] pub fn y(&self) -> u32 { self.y }

    /// The child cell in quadrant `q`. Panics in debug at `MAX_ZOOM`.
    #[inline]
    pub fn child(&self, q: Quadrant) -> Self {
        debug_assert!(self.zoom < MAX_ZOOM, "child of a key at MAX_ZOOM");
        Self { zoom: self.zoom + 1, x: self.x * 2 + q.dx(), y: self.y * 2 + q.dy() }
    }

    /// All four children in `Quadrant::ALL` order.
    pub fn children(&self) -> [Self; 4] {
        Quadrant::ALL.map(|q| self.child(q))
    }

    /// The enclosing cell one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        (self.zoom > 0).then(|| Self { zoom: self.zoom - 1, x: self.x / 2, y: self.y / 2 })
    }

    /// Which quadrant of its parent this key occupies, or `None` for the root.
    pub fn quadrant(&self) -> Option<Quadrant> {
        (self.zoom > 0).then(|| Quadrant::from_offsets(self.x & 1, self.y & 1))
    }

    /// `zoom << 56 | x << 28 | y`.
    #[inline]
    pub fn packed(&self) -> u64 {
        (self.zoom as u64) << (2 * AXIS_BITS) | (self.x as u64) << AXIS_BITS | self.y as u64
    }

    /// Inverse of `packed()`; `None` if the value does not describe a valid key.
    pub fn from_packed(packed: u64) -> Option<Self> {
        let zoom = u8::try_from(packed >> (2 * AXIS_BITS)).ok()?;
        let x = ((packed >> AXIS_BITS) & AXIS_MASK) as u32;
        let y = (packed & AXIS_MASK) as u32;
        Self::new(zoom, x, y)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Error parsing a `z/x/y` tile address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TileKeyParseError {
    #[error("expected 'z/x/y', got '{0}'")]
    Format(String),
    #[error("tile {0} is outside the grid")]
    OutOfRange(String),
}

impl FromStr for TileKey {
    type Err = TileKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || TileKeyParseError::Format(s.to_string());
        let mut parts = s.trim().split('/');
        let mut next = || parts.next().ok_or_else(format_err);
        let zoom: u8 = next()?.parse().map_err(|_| format_err())?;
        let x: u32 = next()?.parse().map_err(|_| format_err())?;
        let y: u32 = next()?.parse().map_err(|_| format_err())?;
        if parts.next().is_some() { return Err(format_err()) }

        Self::new(zoom, x, y).ok_or_else(|| TileKeyParseError::OutOfRange(s.to_string()))
    }
}
