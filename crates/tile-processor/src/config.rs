//! Settings consumed by the tile pipeline.

use serde::{Deserialize, Serialize};
use tile_common::{TileBufferConfig, DEFAULT_BUFFER, DEFAULT_EXTENT};
use tile_encoder::{
    EncodeOptions, EncodeResult, PrecisionGrid, DEFAULT_MIN_LINEAL_EXTENT,
    DEFAULT_MIN_POLYGONAL_EXTENT, DEFAULT_PRECISION_DECIMALS,
};

/// Tile pipeline configuration.
///
/// Plain data: the service crate fills it from its own config sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Tile coordinate space.
    pub extent: u32,

    /// Extra margin around each tile, in extent units.
    pub buffer: u32,

    /// Decimal places of the clipping precision grid.
    pub precision_decimals: u32,

    pub min_lineal_extent: f64,
    pub min_polygonal_extent: f64,

    /// Response cache time-to-live. Zero or negative disables the cache.
    pub cache_ttl_secs: i64,

    /// Response cache memory budget.
    pub cache_max_mb: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            extent: DEFAULT_EXTENT,
            buffer: DEFAULT_BUFFER,
            precision_decimals: DEFAULT_PRECISION_DECIMALS,
            min_lineal_extent: DEFAULT_MIN_LINEAL_EXTENT,
            min_polygonal_extent: DEFAULT_MIN_POLYGONAL_EXTENT,
            cache_ttl_secs: 0,
            cache_max_mb: 256,
        }
    }
}

impl TileConfig {
    pub fn buffer_config(&self) -> TileBufferConfig {
        TileBufferConfig::new(self.extent, self.buffer)
    }

    pub fn encode_options(&self) -> EncodeResult<EncodeOptions> {
        Ok(EncodeOptions::new(self.extent)?
            .with_min_extents(self.min_lineal_extent, self.min_polygonal_extent))
    }

    pub fn precision_grid(&self) -> EncodeResult<PrecisionGrid> {
        PrecisionGrid::new(self.precision_decimals)
    }
}
