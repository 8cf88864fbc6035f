//! Slippy-map tile coordinates and their geographic bounds.
//!
//! Tiles follow the XYZ scheme: zoom `z` has `2^z` columns and rows, row 0 is
//! the northernmost. Bounds are returned in EPSG:4326 degrees.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::{BoundingBox, TileServError, TileServResult};

/// Deepest zoom level accepted.
pub const MAX_ZOOM: u32 = 30;

/// Default tile extent in tile-space units.
pub const DEFAULT_EXTENT: u32 = 4096;

/// Default buffer in tile-space units on each side of the tile.
pub const DEFAULT_BUFFER: u32 = 256;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Reject zoom levels above [`MAX_ZOOM`] and columns/rows outside `0..2^z`.
    pub fn validate(&self) -> TileServResult<()> {
        let invalid = TileServError::InvalidTile {
            z: self.z,
            x: self.x,
            y: self.y,
        };
        if self.z > MAX_ZOOM {
            return Err(invalid);
        }
        let n = 1u64 << self.z;
        if u64::from(self.x) >= n || u64::from(self.y) >= n {
            return Err(invalid);
        }
        Ok(())
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Longitude/latitude of the top-left (north-west) corner of tile `x, y` at
/// zoom `z`. Also valid for `x = 2^z` or `y = 2^z`, which address the far
/// edge of the last column or row.
pub fn tile_to_lonlat(x: u32, y: u32, z: u32) -> (f64, f64) {
    let n = 2f64.powi(z as i32);
    let lon = x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Exact EPSG:4326 bounds of a tile.
pub fn tile_bounds(coord: &TileCoord) -> BoundingBox {
    let (min_x, max_y) = tile_to_lonlat(coord.x, coord.y, coord.z);
    let (max_x, min_y) = tile_to_lonlat(coord.x + 1, coord.y + 1, coord.z);
    BoundingBox::new(min_x, min_y, max_x, max_y)
}

/// Tile bounds grown by `buffer` tile-space units on every side, where one
/// unit is `dimension / extent` of the tile's width or height in degrees.
/// A zero buffer returns the exact tile bounds.
pub fn buffered_tile_bounds(coord: &TileCoord, extent: u32, buffer: u32) -> BoundingBox {
    let bounds = tile_bounds(coord);
    if buffer == 0 || extent == 0 {
        return bounds;
    }

    let unit_x = bounds.width() / extent as f64;
    let unit_y = bounds.height() / extent as f64;
    bounds.expand(buffer as f64 * unit_x, buffer as f64 * unit_y)
}

/// Cache key for a rendered tile of a layer: the layer name followed by `z/x/y`.
pub fn tile_cache_key(layer: &str, coord: &TileCoord) -> String {
    format!("{}{}", layer, coord.cache_key())
}

/// Tile-space extent and buffer used when querying and encoding tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBufferConfig {
    /// Tile-space units across one tile edge
    pub extent: u32,
    /// Units added on each side of the tile
    pub buffer: u32,
}

impl Default for TileBufferConfig {
    fn default() -> Self {
        Self {
            extent: DEFAULT_EXTENT,
            buffer: DEFAULT_BUFFER,
        }
    }
}

impl TileBufferConfig {
    pub fn new(extent: u32, buffer: u32) -> Self {
        Self { extent, buffer }
    }

    /// Create from environment variables (TILE_EXTENT, TILE_BUFFER).
    /// Falls back to 4096/256 if unset or unparsable.
    pub fn from_env() -> Self {
        let extent = std::env::var("TILE_EXTENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_EXTENT);

        let buffer = std::env::var("TILE_BUFFER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BUFFER);

        Self { extent, buffer }
    }

    /// Buffered bounds of a tile under this configuration.
    pub fn buffered_bounds(&self, coord: &TileCoord) -> BoundingBox {
        buffered_tile_bounds(coord, self.extent, self.buffer)
    }
}
