pub mod bbox;
pub mod coord;
pub mod grid;
pub mod key;

pub use bbox::BoundingBox;
pub use coord::{Coord, LAT_LIMIT, LON_LIMIT, SCALE};
pub use grid::{split, GridError, Quadrant, TileGrid};
pub use key::{TileKey, TileKeyParseError, MAX_ZOOM};
