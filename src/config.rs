use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tilegrid::MAX_ZOOM;

use crate::error::ConfigError;

/// Default subdivision depth.
pub const DEFAULT_MAX_DEPTH: u8 = 15;

/// Default rendered tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Which box the quad-tree subdivides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootExtent {
    /// Union of all feature boxes.
    #[default]
    Dataset,
    /// Latitude [-90, 90] × longitude [-180, 180], independent of the data.
    World,
}

impl RootExtent {
    #[inline]
    pub(crate) fn to_byte(self) -> u8 {
        match self { Self::Dataset => 0, Self::World => 1 }
    }

    #[inline]
    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b { 0 => Some(Self::Dataset), 1 => Some(Self::World), _ => None }
    }
}

/// Parameters of an index build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Deepest zoom level subdivided (inclusive).
    pub max_depth: u8,
    pub extent: RootExtent,
    /// Directory for the build's spill file. `build_index` falls back to the
    /// output's directory, everything else to the system temp directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, extent: RootExtent::default(), scratch_dir: None }
    }
}

impl IndexConfig {
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_extent(mut self, extent: RootExtent) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth > MAX_ZOOM { return Err(ConfigError::MaxDepth(self.max_depth)) }
        Ok(())
    }
}

/// Parameters of the software raster backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Edge length of the square output image, in pixels.
    pub tile_size: u32,
    /// Background colour, RGBA.
    pub background: [u8; 4],
    /// Half-width of a rendered point marker, in pixels.
    pub point_radius: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { tile_size: DEFAULT_TILE_SIZE, background: [242, 239, 233, 255], point_radius: 1 }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(16..=4096).contains(&self.tile_size) { return Err(ConfigError::TileSize(self.tile_size)) }
        if self.point_radius > self.tile_size {
            return Err(ConfigError::PointRadius { radius: self.point_radius, tile_size: self.tile_size });
        }
        Ok(())
    }
}

/// Top-level configuration file. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.index.validate()?;
        self.render.validate()
    }
}
