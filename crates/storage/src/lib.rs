//! Storage layer for the tile server.
//!
//! Provides:
//! - Layer discovery and the layer catalog over PostGIS
//! - Parameterized tile queries and feature retrieval
//! - WKB/EWKB geometry decoding
//! - An in-memory TTL cache for encoded tiles

pub mod catalog;
pub mod decode;
pub mod error;
pub mod introspect;
pub mod query;
pub mod source;
pub mod tile_memory_cache;

pub use catalog::{discover_layers, LayerCatalog};
pub use decode::{decode_row, read_wkb, NativeGeometryDecoder, PostgisDecoder, WkbGeometry};
pub use error::{StorageError, StorageResult};
pub use introspect::{PgIntrospector, SchemaIntrospector, SpatialColumn};
pub use query::{build_tile_query, quote_ident, TileQuery};
pub use source::{connect_pool, FeatureSource, PgFeatureSource};
pub use tile_memory_cache::{CacheStatus, TileMemoryCache, TileMemoryCacheStats};
