//! Newline-delimited GeoJSON (one `Feature` per line, RFC 8142 record
//! separators tolerated), optionally gzip-compressed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use geo::{Geometry, LineString, Point, Polygon};
use serde_json::Value;
use tilegrid::Coord;

use crate::decode::FeatureSource;
use crate::error::DecodeError;
use crate::feature::{FeatureError, GeographicFeature, GeometryKind};

/// A GeoJSON feature sequence on disk. Files ending in `.gz` are decompressed
/// on the fly.
#[derive(Debug, Clone)]
pub struct GeoJsonSeqSource {
    path: PathBuf,
}

impl GeoJsonSeqSource {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    #[inline] pub fn path(&self) -> &Path { &self.path }

    /// Open the file and return a lazy iterator over its features.
    pub fn iter(&self) -> Result<GeoJsonFeatures, DecodeError> {
        let file = File::open(&self.path)
            .map_err(|source| DecodeError::Io { path: self.path.clone(), source })?;
        let gzipped = self.path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        let reader: Box<dyn BufRead + Send> = if gzipped {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(GeoJsonFeatures {
            path: self.path.clone(),
            reader,
            buf: String::new(),
            line: 0,
            pending: Vec::new().into_iter(),
            done: false,
        })
    }
}

impl FeatureSource for GeoJsonSeqSource {
    fn scan(&self, sink: &mut dyn FnMut(GeographicFeature) -> Result<(), DecodeError>) -> Result<u64, DecodeError> {
        let mut count = 0;
        for feature in self.iter()? {
            sink(feature?)?;
            count += 1;
        }
        Ok(count)
    }
}

/// Lazy iterator over the features of a `GeoJsonSeqSource`. Stops after the
/// first error.
pub struct GeoJsonFeatures {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    buf: String,
    line: u64,
    pending: std::vec::IntoIter<GeographicFeature>,
    done: bool,
}

impl Iterator for GeoJsonFeatures {
    type Item = Result<GeographicFeature, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(feature) = self.pending.next() { return Some(Ok(feature)) }
            if self.done { return None }

            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => self.line += 1,
                Err(source) => {
                    self.done = true;
                    return Some(Err(DecodeError::Io { path: self.path.clone(), source }));
                }
            }

            let text = self.buf.trim_start_matches('\u{1e}').trim();
            if text.is_empty() { continue }

            match parse_line(text, self.line) {
                Ok(features) => self.pending = features.into_iter(),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into_decode_error(&self.path, self.line)));
                }
            }
        }
    }
}

enum LineError {
    Malformed(String),
    Invalid(FeatureError),
}

impl LineError {
    fn into_decode_error(self, path: &Path, line: u64) -> DecodeError {
        match self {
            Self::Malformed(reason) => DecodeError::Malformed { path: path.to_path_buf(), line, reason },
            Self::Invalid(source) => DecodeError::InvalidFeature { record: line, source },
        }
    }
}

impl From<FeatureError> for LineError {
    fn from(e: FeatureError) -> Self { Self::Invalid(e) }
}

fn malformed(reason: impl Into<String>) -> LineError { LineError::Malformed(reason.into()) }

/// Parse one line into zero or more features. Multi-geometries expand into one
/// feature per member, all sharing the feature id.
fn parse_line(text: &str, line: u64) -> Result<Vec<GeographicFeature>, LineError> {
    let value: Value = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    if value["type"].as_str() != Some("Feature") {
        return Err(malformed("expected a GeoJSON Feature object"));
    }

    let geometry = &value["geometry"];
    if geometry.is_null() { return Ok(Vec::new()) }

    let id = value["id"].as_i64().unwrap_or(line as i64);
    let tags = parse_properties(&value["properties"]);

    let mut features = Vec::new();
    for geom in parse_geometry(geometry)? {
        let (kind, coords) = match geom {
            Geometry::Point(p) => (GeometryKind::Point, vec![to_coord(p.0)?]),
            Geometry::LineString(ls) => (GeometryKind::Way, to_coords(&ls)?),
            Geometry::Polygon(poly) => (GeometryKind::Area, to_coords(poly.exterior())?),
            _ => return Err(malformed("unsupported geometry member")),
        };
        features.push(GeographicFeature::new(id, kind, coords, tags.clone())?);
    }
    Ok(features)
}

/// String properties verbatim, numbers and booleans stringified, the rest skipped.
fn parse_properties(properties: &Value) -> BTreeMap<String, String> {
    let Some(object) = properties.as_object() else { return BTreeMap::new() };
    object.iter()
        .filter_map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k.clone(), v))
        })
        .collect()
}

fn parse_geometry(geometry: &Value) -> Result<Vec<Geometry<f64>>, LineError> {
    let ty = geometry["type"].as_str().ok_or_else(|| malformed("geometry without a type"))?;
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| malformed(format!("{ty} without a coordinates array")))?;

    let members = |f: fn(&Value) -> Result<Geometry<f64>, LineError>| -> Result<Vec<Geometry<f64>>, LineError> {
        coords.iter().map(f).collect()
    };

    match ty {
        "Point" => Ok(vec![Geometry::Point(Point(parse_position(coords)?))]),
        "LineString" => Ok(vec![Geometry::LineString(parse_positions(coords)?)]),
        "Polygon" => Ok(vec![Geometry::Polygon(parse_polygon(coords)?)]),
        "MultiPoint" => members(|v| Ok(Geometry::Point(Point(parse_position(as_array(v)?)?)))),
        "MultiLineString" => members(|v| Ok(Geometry::LineString(parse_positions(as_array(v)?)?))),
        "MultiPolygon" => members(|v| Ok(Geometry::Polygon(parse_polygon(as_array(v)?)?))),
        other => Err(malformed(format!("unsupported geometry type '{other}'"))),
    }
}

fn as_array(v: &Value) -> Result<&[Value], LineError> {
    v.as_array().map(Vec::as_slice).ok_or_else(|| malformed("expected an array"))
}

/// `[lon, lat, ...]`; any altitude is ignored.
fn parse_position(position: &[Value]) -> Result<geo::Coord<f64>, LineError> {
    match position {
        [x, y, ..] => {
            let x = x.as_f64().ok_or_else(|| malformed("longitude must be a number"))?;
            let y = y.as_f64().ok_or_else(|| malformed("latitude must be a number"))?;
            Ok(geo::Coord { x, y })
        }
        _ => Err(malformed("position needs at least two numbers")),
    }
}

fn parse_positions(positions: &[Value]) -> Result<LineString<f64>, LineError> {
    positions.iter()
        .map(|p| parse_position(as_array(p)?))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString)
}

/// Rings are closed if the input left them open.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>, LineError> {
    let mut rings = rings.iter()
        .map(|r| parse_positions(as_array(r)?))
        .collect::<Result<Vec<_>, _>>()?;
    if rings.is_empty() { return Err(malformed("polygon without an exterior ring")) }

    for ring in &mut rings {
        if let (Some(first), Some(last)) = (ring.0.first().copied(), ring.0.last().copied()) {
            if first != last { ring.0.push(first) }
        }
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn to_coord(c: geo::Coord<f64>) -> Result<Coord, FeatureError> {
    Coord::from_degrees(c.y, c.x).ok_or(FeatureError::InvalidDegrees { lat: c.y, lon: c.x })
}

fn to_coords(ls: &LineString<f64>) -> Result<Vec<Coord>, FeatureError> {
    ls.coords().map(|c| to_coord(*c)).collect()
}
