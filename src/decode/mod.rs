//! Streaming decoders from source datasets into `GeographicFeature`s.

mod geojson;
mod pbf;

use std::path::Path;

use crate::error::DecodeError;
use crate::feature::GeographicFeature;

pub use geojson::{GeoJsonFeatures, GeoJsonSeqSource};
pub use pbf::PbfSource;

/// A restartable, finite sequence of features.
///
/// Every call to `scan` starts from the beginning of the dataset and pushes
/// features to `sink` in presentation order without buffering the dataset.
/// An error from the sink stops the scan and is returned unchanged.
pub trait FeatureSource {
    /// Returns the number of features delivered.
    fn scan(&self, sink: &mut dyn FnMut(GeographicFeature) -> Result<(), DecodeError>) -> Result<u64, DecodeError>;
}

impl FeatureSource for [GeographicFeature] {
    fn scan(&self, sink: &mut dyn FnMut(GeographicFeature) -> Result<(), DecodeError>) -> Result<u64, DecodeError> {
        for feature in self { sink(feature.clone())? }
        Ok(self.len() as u64)
    }
}

impl FeatureSource for Vec<GeographicFeature> {
    fn scan(&self, sink: &mut dyn FnMut(GeographicFeature) -> Result<(), DecodeError>) -> Result<u64, DecodeError> {
        self.as_slice().scan(sink)
    }
}

/// Pick a decoder from the file name: `.pbf` is OpenStreetMap PBF, anything
/// else is read as a (possibly gzipped) GeoJSON feature sequence.
pub fn source_for_path(path: &Path) -> Box<dyn FeatureSource> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_ascii_lowercase();
    if name.ends_with(".pbf") {
        Box::new(PbfSource::new(path))
    } else {
        Box::new(GeoJsonSeqSource::new(path))
    }
}

/// Collect every feature of `source` into memory. Intended for tests and small inputs.
pub fn collect<S: FeatureSource + ?Sized>(source: &S) -> Result<Vec<GeographicFeature>, DecodeError> {
    let mut out = Vec::new();
    source.scan(&mut |f| { out.push(f); Ok(()) })?;
    Ok(out)
}
