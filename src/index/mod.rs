//! The persisted index region: layout, writer and zero-copy readers.

pub mod format;
mod view;
mod write;

pub use view::{Dictionary, FeatureIter, FeatureView, TileView};
pub use write::{serialize, serialize_ephemeral, sha256_file, IndexArtifact};
