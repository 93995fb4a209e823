//! Read path: mapping a region, resolving tiles, and serving generations.

mod mapped;
mod resolve;
mod serve;

pub use mapped::MappedHandle;
pub use resolve::{ByteRange, TileLookup};
pub use serve::{IndexLease, RetiredIndex, ServingIndex};
