use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed or unreadable source data. Fatal to a build.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}:{line}: malformed record: {reason}")]
    Malformed { path: PathBuf, line: u64, reason: String },
    #[error("record {record}: invalid feature: {source}")]
    InvalidFeature {
        record: u64,
        #[source]
        source: crate::feature::FeatureError,
    },
    #[error("osm pbf {path}: {source}")]
    Pbf {
        path: PathBuf,
        #[source]
        source: osmpbf::Error,
    },
    #[error("scan interrupted by its consumer")]
    Interrupted,
}

/// Failure while assigning features to cells. Fatal to a build.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error(transparent)]
    Grid(#[from] tilegrid::GridError),
    #[error("more than {} features", u32::MAX)]
    TooManyFeatures,
    #[error("more than {} distinct tag strings", u32::MAX)]
    TooManyStrings,
    #[error("feature {id} has too many {what} to encode")]
    FeatureTooLarge { id: i64, what: &'static str },
    #[error("feature {id} lies outside the root box; the source changed between scans")]
    OutsideRoot { id: i64 },
    #[error("source yielded {found} features on the second scan and {expected} on the first")]
    CountChanged { expected: u64, found: u64 },
    #[error("failed to write spill file: {0}")]
    Spill(#[source] io::Error),
}

/// I/O failure while writing an index region. Fatal to a build; the
/// previously persisted region is left untouched.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("io error writing index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to persist index to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("index section too large: {0}")]
    Overflow(&'static str),
    #[error("feature {0} missing from the partition spill")]
    MissingFeature(u32),
}

/// A region that cannot be mapped or does not look like an index.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: not an index region (bad magic)")]
    BadMagic { path: PathBuf },
    #[error("{path}: unsupported format version {found} (expected {expected})")]
    Version { path: PathBuf, found: u16, expected: u16 },
    #[error("{path}: corrupt index: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("corrupt payload in tile {key} at byte {offset}")]
    CorruptPayload { key: tilegrid::TileKey, offset: u64 },
    #[error("index is closed")]
    Closed,
    #[error("{in_flight} lease(s) still held after drain timeout")]
    DrainTimeout { in_flight: usize },
}

/// Rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_depth {0} exceeds the supported maximum of {max}", max = tilegrid::MAX_ZOOM)]
    MaxDepth(u8),
    #[error("tile_size {0} must be between 16 and 4096")]
    TileSize(u32),
    #[error("point_radius {radius} exceeds tile_size {tile_size}")]
    PointRadius { radius: u32, tile_size: u32 },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Any failure of the offline build pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Failure inside the render adapter.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("failed to encode tile image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("tile {0} has no cell in this index")]
    NoCell(tilegrid::TileKey),
}
