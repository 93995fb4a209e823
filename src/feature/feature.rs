use std::collections::BTreeMap;

use tilegrid::{BoundingBox, Coord};

/// Geometry class of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    Point,
    Way,
    Area,
}

impl GeometryKind {
    /// Fewest coordinates a feature of this kind may carry.
    #[inline]
    pub fn min_coords(self) -> usize {
        match self { Self::Point => 1, Self::Way => 2, Self::Area => 3 }
    }

    #[inline]
    pub(crate) fn to_byte(self) -> u8 {
        match self { Self::Point => 0, Self::Way => 1, Self::Area => 2 }
    }

    #[inline]
    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b { 0 => Some(Self::Point), 1 => Some(Self::Way), 2 => Some(Self::Area), _ => None }
    }

    pub fn as_str(self) -> &'static str {
        match self { Self::Point => "point", Self::Way => "way", Self::Area => "area" }
    }
}

/// Reasons a decoded record cannot become a feature.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("{kind} needs at least {min} coordinate(s), got {found}")]
    TooFewCoords { kind: &'static str, min: usize, found: usize },
    #[error("a point has exactly one coordinate, got {0}")]
    PointArity(usize),
    #[error("coordinate {0:?} is outside the valid latitude/longitude range")]
    OutOfRange(Coord),
    #[error("position (lat {lat}, lon {lon}) is not a finite coordinate on the globe")]
    InvalidDegrees { lat: f64, lon: f64 },
}

/// A decoded map feature. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeographicFeature {
    id: i64,
    kind: GeometryKind,
    coords: Vec<Coord>,
    tags: BTreeMap<String, String>,
    bbox: BoundingBox,
}

impl GeographicFeature {
    /// Build a feature, checking the coordinate count for `kind` and that every
    /// coordinate lies on the globe.
    pub fn new<K, V>(
        id: i64,
        kind: GeometryKind,
        coords: Vec<Coord>,
        tags: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, FeatureError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        if kind == GeometryKind::Point && coords.len() != 1 {
            return Err(FeatureError::PointArity(coords.len()));
        }
        if coords.len() < kind.min_coords() {
            return Err(FeatureError::TooFewCoords { kind: kind.as_str(), min: kind.min_coords(), found: coords.len() });
        }
        if let Some(bad) = coords.iter().find(|c| !c.is_valid()) {
            return Err(FeatureError::OutOfRange(*bad));
        }

        let bbox = BoundingBox::from_coords(&coords)
            .ok_or(FeatureError::TooFewCoords { kind: kind.as_str(), min: 1, found: 0 })?;
        let tags = tags.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        Ok(Self { id, kind, coords, tags, bbox })
    }

    /// A tagged point feature.
    pub fn point<K, V>(id: i64, at: Coord, tags: impl IntoIterator<Item = (K, V)>) -> Result<Self, FeatureError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(id, GeometryKind::Point, vec![at], tags)
    }

    #[inline] pub fn id(&self) -> i64 { self.id }

    #[inline] pub fn kind(&self) -> GeometryKind { self.kind }

    #[inline] pub fn coords(&self) -> &[Coord] { &self.coords }

    /// Tags, ordered by key.
    #[inline] pub fn tags(&self) -> &BTreeMap<String, String> { &self.tags }

    #[inline] pub fn tag(&self, key: &str) -> Option<&str> { self.tags.get(key).map(String::as_str) }

    /// Bounding box of all coordinates.
    #[inline] pub fn bbox(&self) -> &BoundingBox { &self.bbox }
}
