//! Vector tile production: clipping, MVT encoding and gzip compression.
//!
//! The pipeline in `tile-processor` drives these in order:
//! [`clip_features`] on the store's geometries, then [`encode_layer`],
//! then [`gzip`].

pub mod clip;
pub mod compress;
pub mod encode;
pub mod error;
pub mod vector_tile;

pub use clip::{
    classify, clip_features, clip_geometry, ClipStrategy, PrecisionGrid,
    DEFAULT_PRECISION_DECIMALS, MAX_PRECISION_DECIMALS,
};
pub use compress::{gunzip, gzip};
pub use encode::{
    command_encode, decode_tile, encode_layer, zigzag_encode, EncodeOptions, LayerBuilder,
    TileBuilder, TileTransform, DEFAULT_MIN_LINEAL_EXTENT, DEFAULT_MIN_POLYGONAL_EXTENT,
};
pub use error::{EncodeError, EncodeResult};
