//! Common types and utilities shared across the tile server crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod feature;
pub mod layer;
pub mod tile;

pub use bbox::BoundingBox;
pub use crs::{
    lonlat_to_mercator, mercator_to_lonlat, srid_label, Srid, EPSG_3857, EPSG_4326,
    WEB_MERCATOR_MAX_EXTENT, WEB_MERCATOR_MAX_LAT,
};
pub use error::{TileServError, TileServResult};
pub use feature::{AttributeValue, Feature};
pub use layer::{
    ColumnInfo, GeometryKind, HealthLevel, LayerDescriptor, ObjectKind, MSG_MISSING_SPATIAL_INDEX,
    MSG_MULTIPLE_SRIDS,
};
pub use tile::{
    buffered_tile_bounds, tile_bounds, tile_cache_key, tile_to_lonlat, TileBufferConfig,
    TileCoord, DEFAULT_BUFFER, DEFAULT_EXTENT, MAX_ZOOM,
};
