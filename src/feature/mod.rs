mod dict;
mod feature;

pub use dict::TagDictionary;
pub use feature::{FeatureError, GeographicFeature, GeometryKind};
