//! Vector tile pipeline.
//!
//! ```text
//! GET /{layer}/{z}/{x}/{y}
//!      │
//!      ▼
//! TileService::get_tile
//!      │
//!      ├─► Validate coordinate, resolve layer (404 / 422)
//!      │
//!      ├─► TileMemoryCache (single-flight per key)
//!      │         │
//!      │         └─► Miss: render
//!      │               ├─► Tile bounds + buffered bounds (EPSG:4326)
//!      │               ├─► Project bounds into the layer srid
//!      │               ├─► FeatureSource::fetch_features   (await)
//!      │               └─► spawn_blocking: clip ─► reproject ─► encode ─► gzip
//!      │
//!      └─► (gzip bytes, HIT|MISS)
//! ```

pub mod config;
pub mod service;

pub use config::TileConfig;
pub use service::{empty_tile, TileService};
