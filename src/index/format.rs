//! On-disk layout of an index region.
//!
//! ```text
//! +--------------------+ 0
//! | RegionHeader       | 72 B
//! +--------------------+
//! | TileEntry × tiles  | 28 B each, ascending packed key
//! +--------------------+ payload_offset
//! | payload blocks     | per tile: FeatureRecord, coords, tags, repeated
//! +--------------------+ dictionary_offset
//! | dictionary         | count, (count + 1) end offsets, UTF-8 bytes
//! +--------------------+
//! ```
//!
//! Every field is little-endian and alignment-free, so all records are read
//! in place from the map.

use tilegrid::{BoundingBox, Coord, TileKey};
use zerocopy::little_endian::{I32, I64, U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::RootExtent;

pub const MAGIC: &[u8; 8] = b"QSTIDX\0\0";
pub const FORMAT_VERSION: u16 = 2;

pub const HEADER_SIZE: usize = 72;
pub const TILE_ENTRY_SIZE: usize = 28;
pub const FEATURE_RECORD_SIZE: usize = 20;
pub const COORD_RECORD_SIZE: usize = 8;
pub const TAG_RECORD_SIZE: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RegionHeader {
    magic: [u8; 8],
    version: U16,
    max_depth: u8,
    extent: u8,
    reserved: [u8; 4],
    min_lat: I32,
    min_lon: I32,
    max_lat: I32,
    max_lon: I32,
    feature_count: U64,
    tile_count: U64,
    payload_offset: U64,
    dictionary_offset: U64,
    dictionary_len: U64,
}

const _: () = assert!(std::mem::size_of::<RegionHeader>() == HEADER_SIZE);

/// Section positions recorded in the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sections {
    pub feature_count: u64,
    pub tile_count: u64,
    pub payload_offset: u64,
    pub dictionary_offset: u64,
    pub dictionary_len: u64,
}

impl RegionHeader {
    pub fn new(max_depth: u8, extent: RootExtent, root: &BoundingBox, sections: Sections) -> Self {
        Self {
            magic: *MAGIC,
            version: U16::new(FORMAT_VERSION),
            max_depth,
            extent: extent.to_byte(),
            reserved: [0; 4],
            min_lat: I32::new(root.min().lat),
            min_lon: I32::new(root.min().lon),
            max_lat: I32::new(root.max().lat),
            max_lon: I32::new(root.max().lon),
            feature_count: U64::new(sections.feature_count),
            tile_count: U64::new(sections.tile_count),
            payload_offset: U64::new(sections.payload_offset),
            dictionary_offset: U64::new(sections.dictionary_offset),
            dictionary_len: U64::new(sections.dictionary_len),
        }
    }

    #[inline] pub fn magic(&self) -> &[u8; 8] { &self.magic }

    #[inline] pub fn version(&self) -> u16 { self.version.get() }

    #[inline] pub fn max_depth(&self) -> u8 { self.max_depth }

    #[inline] pub fn extent(&self) -> Option<RootExtent> { RootExtent::from_byte(self.extent) }

    /// Stored root box; `None` if min exceeds max.
    pub fn root(&self) -> Option<BoundingBox> {
        BoundingBox::new(
            Coord::new(self.min_lat.get(), self.min_lon.get()),
            Coord::new(self.max_lat.get(), self.max_lon.get()),
        )
    }

    pub fn sections(&self) -> Sections {
        Sections {
            feature_count: self.feature_count.get(),
            tile_count: self.tile_count.get(),
            payload_offset: self.payload_offset.get(),
            dictionary_offset: self.dictionary_offset.get(),
            dictionary_len: self.dictionary_len.get(),
        }
    }
}

/// One offset table row.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TileEntry {
    key: U64,
    offset: U64,
    len: U64,
    feature_count: U32,
}

const _: () = assert!(std::mem::size_of::<TileEntry>() == TILE_ENTRY_SIZE);

impl TileEntry {
    pub fn new(key: TileKey, offset: u64, len: u64, feature_count: u32) -> Self {
        Self {
            key: U64::new(key.packed()),
            offset: U64::new(offset),
            len: U64::new(len),
            feature_count: U32::new(feature_count),
        }
    }

    #[inline] pub fn packed_key(&self) -> u64 { self.key.get() }

    #[inline] pub fn key(&self) -> Option<TileKey> { TileKey::from_packed(self.key.get()) }

    /// Absolute byte offset of the tile's payload block.
    #[inline] pub fn offset(&self) -> u64 { self.offset.get() }

    #[inline] pub fn len(&self) -> u64 { self.len.get() }

    #[inline] pub fn feature_count(&self) -> u32 { self.feature_count.get() }
}

/// Fixed header of one encoded feature; followed by `coord_count`
/// `CoordRecord`s and `tag_count` `TagRecord`s.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FeatureRecord {
    id: I64,
    kind: u8,
    reserved: [u8; 3],
    coord_count: U32,
    tag_count: U32,
}

const _: () = assert!(std::mem::size_of::<FeatureRecord>() == FEATURE_RECORD_SIZE);

impl FeatureRecord {
    pub fn new(id: i64, kind: u8, coord_count: u32, tag_count: u32) -> Self {
        Self {
            id: I64::new(id),
            kind,
            reserved: [0; 3],
            coord_count: U32::new(coord_count),
            tag_count: U32::new(tag_count),
        }
    }

    #[inline] pub fn id(&self) -> i64 { self.id.get() }

    #[inline] pub fn kind(&self) -> u8 { self.kind }

    #[inline] pub fn coord_count(&self) -> u32 { self.coord_count.get() }

    #[inline] pub fn tag_count(&self) -> u32 { self.tag_count.get() }

    /// Bytes taken by this record plus its trailing arrays.
    pub fn encoded_len(&self) -> u64 {
        FEATURE_RECORD_SIZE as u64
            + self.coord_count() as u64 * COORD_RECORD_SIZE as u64
            + self.tag_count() as u64 * TAG_RECORD_SIZE as u64
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct CoordRecord {
    lat: I32,
    lon: I32,
}

impl CoordRecord {
    #[inline] pub fn coord(&self) -> Coord { Coord::new(self.lat.get(), self.lon.get()) }
}

impl From<Coord> for CoordRecord {
    fn from(c: Coord) -> Self { Self { lat: I32::new(c.lat), lon: I32::new(c.lon) } }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TagRecord {
    key: U32,
    value: U32,
}

impl TagRecord {
    pub fn new(key: u32, value: u32) -> Self { Self { key: U32::new(key), value: U32::new(value) } }

    #[inline] pub fn key(&self) -> u32 { self.key.get() }

    #[inline] pub fn value(&self) -> u32 { self.value.get() }
}
