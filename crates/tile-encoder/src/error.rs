//! Encoder error types.

use thiserror::Error;
use tile_common::TileServError;

pub type EncodeResult<T> = Result<T, EncodeError>;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid tile extent: {0}")]
    InvalidExtent(u32),

    #[error("Invalid precision: {0} decimal places")]
    InvalidPrecision(u32),

    #[error("Compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Protobuf decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl From<EncodeError> for TileServError {
    fn from(err: EncodeError) -> Self {
        TileServError::Encode(err.to_string())
    }
}
