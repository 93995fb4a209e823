use std::path::{Path, PathBuf};

use ahash::AHashMap;
use osmpbf::{Element, ElementReader};
use tilegrid::Coord;
use tracing::debug;

use crate::decode::FeatureSource;
use crate::error::DecodeError;
use crate::feature::{GeographicFeature, GeometryKind};

/// Keys that make a closed way an area unless `area=no` says otherwise.
const AREA_KEYS: [&str; 5] = ["building", "landuse", "natural", "leisure", "amenity"];

/// An OpenStreetMap PBF extract.
///
/// Every node position is kept in memory so ways can be resolved in the same
/// pass; tagged nodes become point features, ways become ways or areas.
/// Relations are skipped.
#[derive(Debug, Clone)]
pub struct PbfSource {
    path: PathBuf,
}

impl PbfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    #[inline] pub fn path(&self) -> &Path { &self.path }
}

impl FeatureSource for PbfSource {
    fn scan(&self, sink: &mut dyn FnMut(GeographicFeature) -> Result<(), DecodeError>) -> Result<u64, DecodeError> {
        let reader = ElementReader::from_path(&self.path)
            .map_err(|source| DecodeError::Pbf { path: self.path.clone(), source })?;

        let mut nodes: AHashMap<i64, Coord> = AHashMap::new();
        let mut failure: Option<DecodeError> = None;
        let mut record: u64 = 0;
        let mut delivered: u64 = 0;
        let mut short_ways: u64 = 0;

        let mut emit = |feature: Result<GeographicFeature, crate::feature::FeatureError>, record: u64, failure: &mut Option<DecodeError>| {
            let result = feature
                .map_err(|source| DecodeError::InvalidFeature { record, source })
                .and_then(&mut *sink);
            match result {
                Ok(()) => delivered += 1,
                Err(e) => *failure = Some(e),
            }
        };

        reader.for_each(|element| {
            if failure.is_some() { return }
            record += 1;

            match element {
                Element::Node(n) => {
                    let at = Coord::new(n.decimicro_lat(), n.decimicro_lon());
                    nodes.insert(n.id(), at);
                    let tags: Vec<(&str, &str)> = n.tags().collect();
                    if !tags.is_empty() {
                        emit(GeographicFeature::point(n.id(), at, tags), record, &mut failure);
                    }
                }
                Element::DenseNode(n) => {
                    let at = Coord::new(n.decimicro_lat(), n.decimicro_lon());
                    nodes.insert(n.id(), at);
                    let tags: Vec<(&str, &str)> = n.tags().collect();
                    if !tags.is_empty() {
                        emit(GeographicFeature::point(n.id(), at, tags), record, &mut failure);
                    }
                }
                Element::Way(w) => {
                    let refs: Vec<i64> = w.refs().collect();
                    let coords: Vec<Coord> = refs.iter().filter_map(|r| nodes.get(r).copied()).collect();
                    if coords.len() < 2 {
                        short_ways += 1;
                        return;
                    }

                    let tags: Vec<(&str, &str)> = w.tags().collect();
                    let closed = refs.len() >= 4 && refs.first() == refs.last();
                    let kind = if closed && is_area(&tags) && coords.len() >= 3 {
                        GeometryKind::Area
                    } else {
                        GeometryKind::Way
                    };
                    emit(GeographicFeature::new(w.id(), kind, coords, tags), record, &mut failure);
                }
                Element::Relation(_) => {}
            }
        })
        .map_err(|source| DecodeError::Pbf { path: self.path.clone(), source })?;

        if let Some(e) = failure { return Err(e) }
        if short_ways > 0 {
            debug!("[decode::pbf] dropped {short_ways} way(s) with fewer than two resolvable nodes");
        }
        debug!("[decode::pbf] {} elements, {} node positions, {delivered} features", record, nodes.len());
        Ok(delivered)
    }
}

fn is_area(tags: &[(&str, &str)]) -> bool {
    let mut area = false;
    for &(k, v) in tags {
        match (k, v) {
            ("area", "no") => return false,
            ("area", "yes") => area = true,
            (k, _) if AREA_KEYS.contains(&k) => area = true,
            _ => {}
        }
    }
    area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_classification() {
        assert!(is_area(&[("building", "yes")]));
        assert!(is_area(&[("area", "yes"), ("highway", "pedestrian")]));
        assert!(!is_area(&[("highway", "residential")]));
        assert!(!is_area(&[("landuse", "grass"), ("area", "no")]));
        assert!(!is_area(&[]));
    }

    #[test]
    fn missing_file_is_reported() {
        let source = PbfSource::new("/nonexistent/extract.osm.pbf");
        assert!(matches!(source.scan(&mut |_| Ok(())), Err(DecodeError::Pbf { .. })));
    }
}
