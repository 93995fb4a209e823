#![doc = "Quad-tree tile index over memory-mapped map features"]
pub mod build;
pub mod config;
pub mod decode;
pub mod error;
pub mod feature;
pub mod index;
pub mod partition;
pub mod render;
pub mod store;

#[doc(inline)]
pub use tilegrid::{BoundingBox, Coord, TileGrid, TileKey};

#[doc(inline)]
pub use build::{build_ephemeral, build_index, partition_source};

#[doc(inline)]
pub use config::{Config, IndexConfig, RenderConfig, RootExtent};

#[doc(inline)]
pub use decode::{FeatureSource, GeoJsonSeqSource, PbfSource};

#[doc(inline)]
pub use error::{BuildError, ConfigError, DecodeError, MapError, PartitionError, RenderError, SerializeError};

#[doc(inline)]
pub use feature::{GeographicFeature, GeometryKind};

#[doc(inline)]
pub use index::{FeatureView, IndexArtifact, TileView};

#[doc(inline)]
pub use render::{render_tile, RasterRenderer, RenderAdapter, RenderContext, TileRequest};

#[doc(inline)]
pub use store::{ByteRange, IndexLease, MappedHandle, RetiredIndex, ServingIndex, TileLookup};
