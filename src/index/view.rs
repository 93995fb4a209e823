//! Zero-copy views over the mapped region.

use std::fmt;

use geo::{Geometry, LineString, Point, Polygon};
use tilegrid::{BoundingBox, Coord, TileKey};
use zerocopy::little_endian::U32;
use zerocopy::FromBytes;

use crate::error::MapError;
use crate::feature::{FeatureError, GeographicFeature, GeometryKind};
use crate::index::format::{CoordRecord, FeatureRecord, TagRecord};

/// The tag string table, borrowed from the map.
#[derive(Clone, Copy)]
pub struct Dictionary<'a> {
    ends: &'a [U32],
    bytes: &'a [u8],
}

const NO_ENDS: [U32; 1] = [U32::ZERO];

impl<'a> Dictionary<'a> {
    pub const EMPTY: Dictionary<'static> = Dictionary { ends: &NO_ENDS, bytes: &[] };

    /// Split the section into offsets and bytes without inspecting them.
    pub(crate) fn split(section: &'a [u8]) -> Result<Self, String> {
        let (count, rest) = U32::ref_from_prefix(section)
            .map_err(|_| "dictionary shorter than its string count".to_string())?;
        let count = count.get() as usize;
        let (ends, bytes) = <[U32]>::ref_from_prefix_with_elems(rest, count + 1)
            .map_err(|_| format!("dictionary offsets truncated ({count} strings)"))?;
        Ok(Self { ends, bytes })
    }

    /// `split` plus a full check of offsets and UTF-8; the error is a
    /// human-readable reason.
    pub(crate) fn parse(section: &'a [u8]) -> Result<Self, String> {
        let dict = Self::split(section)?;
        let text = std::str::from_utf8(dict.bytes).map_err(|e| format!("dictionary is not UTF-8: {e}"))?;
        let count = dict.len();

        if dict.ends[0].get() != 0 { return Err("dictionary offsets do not start at 0".into()) }
        if dict.ends[count].get() as usize != text.len() {
            return Err(format!("dictionary ends at {} but holds {} bytes", dict.ends[count].get(), text.len()));
        }
        for pair in dict.ends.windows(2) {
            let (start, end) = (pair[0].get() as usize, pair[1].get() as usize);
            if start > end || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
                return Err(format!("dictionary offset {start}..{end} is out of order or splits a character"));
            }
        }
        Ok(dict)
    }

    #[inline] pub fn len(&self) -> usize { self.ends.len() - 1 }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn get(&self, id: u32) -> Option<&'a str> {
        let id = id as usize;
        if id >= self.len() { return None }
        let bytes = self.bytes.get(self.ends[id].get() as usize..self.ends[id + 1].get() as usize)?;
        std::str::from_utf8(bytes).ok()
    }
}

impl fmt::Debug for Dictionary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary").field("len", &self.len()).finish()
    }
}

/// The payload block of one populated tile.
#[derive(Debug, Clone, Copy)]
pub struct TileView<'a> {
    key: TileKey,
    offset: u64,
    bytes: &'a [u8],
    feature_count: u32,
    dictionary: Dictionary<'a>,
}

impl<'a> TileView<'a> {
    pub(crate) fn new(key: TileKey, offset: u64, bytes: &'a [u8], feature_count: u32, dictionary: Dictionary<'a>) -> Self {
        Self { key, offset, bytes, feature_count, dictionary }
    }

    #[inline] pub fn key(&self) -> TileKey { self.key }

    /// The raw payload block, straight from the map.
    #[inline] pub fn bytes(&self) -> &'a [u8] { self.bytes }

    #[inline] pub fn feature_count(&self) -> u32 { self.feature_count }

    pub fn features(&self) -> FeatureIter<'a> {
        FeatureIter {
            key: self.key,
            offset: self.offset,
            rest: self.bytes,
            remaining: self.feature_count,
            dictionary: self.dictionary,
            failed: false,
        }
    }
}

/// Walks a payload block. Yields `MapError::CorruptPayload` once and stops if
/// a record does not fit or refers outside the dictionary.
pub struct FeatureIter<'a> {
    key: TileKey,
    offset: u64,
    rest: &'a [u8],
    remaining: u32,
    dictionary: Dictionary<'a>,
    failed: bool,
}

impl<'a> Iterator for FeatureIter<'a> {
    type Item = Result<FeatureView<'a>, MapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed { return None }
        if self.remaining == 0 {
            if self.rest.is_empty() { return None }
            return Some(Err(self.fail()));
        }

        match FeatureView::decode(self.rest, self.dictionary) {
            Some((view, rest)) => {
                self.offset += (self.rest.len() - rest.len()) as u64;
                self.rest = rest;
                self.remaining -= 1;
                Some(Ok(view))
            }
            None => Some(Err(self.fail())),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed { (0, Some(0)) } else { (0, Some(self.remaining as usize + 1)) }
    }
}

impl FeatureIter<'_> {
    fn fail(&mut self) -> MapError {
        self.failed = true;
        MapError::CorruptPayload { key: self.key, offset: self.offset }
    }
}

/// One encoded feature, read in place.
#[derive(Clone, Copy)]
pub struct FeatureView<'a> {
    record: &'a FeatureRecord,
    kind: GeometryKind,
    coords: &'a [CoordRecord],
    tags: &'a [TagRecord],
    dictionary: Dictionary<'a>,
}

impl<'a> FeatureView<'a> {
    fn decode(bytes: &'a [u8], dictionary: Dictionary<'a>) -> Option<(Self, &'a [u8])> {
        let (record, rest) = FeatureRecord::ref_from_prefix(bytes).ok()?;
        let kind = GeometryKind::from_byte(record.kind())?;
        let (coords, rest) = <[CoordRecord]>::ref_from_prefix_with_elems(rest, record.coord_count() as usize).ok()?;
        let (tags, rest) = <[TagRecord]>::ref_from_prefix_with_elems(rest, record.tag_count() as usize).ok()?;

        if coords.len() < kind.min_coords() { return None }
        let known = dictionary.len();
        if tags.iter().any(|t| t.key() as usize >= known || t.value() as usize >= known) { return None }

        Some((Self { record, kind, coords, tags, dictionary }, rest))
    }

    #[inline] pub fn id(&self) -> i64 { self.record.id() }

    #[inline] pub fn kind(&self) -> GeometryKind { self.kind }

    #[inline] pub fn coord_count(&self) -> usize { self.coords.len() }

    pub fn coords(&self) -> impl ExactSizeIterator<Item = Coord> + 'a {
        self.coords.iter().map(CoordRecord::coord)
    }

    /// Tags as `(key, value)` strings, ordered by key.
    pub fn tags(&self) -> impl ExactSizeIterator<Item = (&'a str, &'a str)> + 'a {
        let dictionary = self.dictionary;
        self.tags.iter().map(move |t| {
            (dictionary.get(t.key()).unwrap_or_default(), dictionary.get(t.value()).unwrap_or_default())
        })
    }

    pub fn tag(&self, key: &str) -> Option<&'a str> {
        self.tags().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn bbox(&self) -> BoundingBox {
        let mut coords = self.coords();
        // decode guarantees at least one coordinate
        let mut bbox = BoundingBox::point(coords.next().unwrap_or_default());
        for c in coords { bbox.expand(c) }
        bbox
    }

    /// Copy into an owned feature.
    pub fn to_feature(&self) -> Result<GeographicFeature, FeatureError> {
        GeographicFeature::new(self.id(), self.kind, self.coords().collect(), self.tags())
    }

    /// Geometry in degrees (x = longitude, y = latitude).
    pub fn to_geometry(&self) -> Geometry<f64> {
        let line: LineString<f64> = self.coords().map(geo::Coord::<f64>::from).collect();
        match self.kind {
            GeometryKind::Point => Geometry::Point(Point(line.0[0])),
            GeometryKind::Way => Geometry::LineString(line),
            GeometryKind::Area => Geometry::Polygon(Polygon::new(line, Vec::new())),
        }
    }
}

impl fmt::Debug for FeatureView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureView")
            .field("id", &self.id())
            .field("kind", &self.kind)
            .field("coords", &self.coords.len())
            .field("tags", &self.tags.len())
            .finish()
    }
}
