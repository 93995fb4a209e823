//! Turning a resolved tile into an encoded image.

mod raster;

use std::sync::atomic::{AtomicU64, Ordering};

use tilegrid::{BoundingBox, TileKey};
use tracing::info;

use crate::config::RenderConfig;
use crate::error::{ConfigError, RenderError};
use crate::store::{MappedHandle, TileLookup};

pub use raster::RasterRenderer;

/// Everything a backend needs to draw one tile.
#[derive(Debug, Clone, Copy)]
pub struct TileRequest<'a> {
    pub key: TileKey,
    /// Cell box the tile covers.
    pub bounds: BoundingBox,
    pub lookup: TileLookup<'a>,
}

impl<'a> TileRequest<'a> {
    /// Resolve `key` against `handle`. Keys past the index depth still get a
    /// box and render as empty tiles.
    ///
    /// A narrow root leaves some keys without a cell of their own; those are
    /// empty and take the box of their nearest ancestor that has one.
    pub fn new(handle: &'a MappedHandle, key: TileKey) -> Result<Self, RenderError> {
        let lookup = handle.resolve(key);
        let bounds = match handle.grid().cell_bounds(key) {
            Some(bounds) => bounds,
            None if lookup.is_empty() => nearest_cell(handle, key),
            None => return Err(RenderError::NoCell(key)),
        };
        Ok(Self { key, bounds, lookup })
    }
}

/// Box of the deepest ancestor of `key` that has a cell. The root always does.
fn nearest_cell(handle: &MappedHandle, key: TileKey) -> BoundingBox {
    let grid = handle.grid();
    let mut current = key;
    while let Some(parent) = current.parent() {
        if let Some(bounds) = grid.cell_bounds(parent) { return bounds }
        current = parent;
    }
    *grid.root()
}

/// A rasterization backend: features of one tile in, encoded pixels out.
pub trait RenderAdapter: Send + Sync {
    fn render(&self, request: &TileRequest<'_>) -> Result<Vec<u8>, RenderError>;
}

/// Process-wide rendering state, acquired once at startup and handed to
/// backends by reference. Released on drop.
#[derive(Debug)]
pub struct RenderContext {
    config: RenderConfig,
    rendered: AtomicU64,
}

impl RenderContext {
    pub fn acquire(config: RenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!("[render] context acquired ({}px tiles)", config.tile_size);
        Ok(Self { config, rendered: AtomicU64::new(0) })
    }

    #[inline] pub fn config(&self) -> &RenderConfig { &self.config }

    /// Tiles rendered through this context so far.
    #[inline] pub fn rendered(&self) -> u64 { self.rendered.load(Ordering::Relaxed) }

    pub(crate) fn record_render(&self) { self.rendered.fetch_add(1, Ordering::Relaxed); }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        info!("[render] context released after {} tile(s)", self.rendered());
    }
}

/// Resolve and render one tile.
pub fn render_tile(adapter: &dyn RenderAdapter, handle: &MappedHandle, key: TileKey) -> Result<Vec<u8>, RenderError> {
    let request = TileRequest::new(handle, key)?;
    adapter.render(&request)
}
