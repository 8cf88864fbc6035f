//! Error types for the tile server.

use thiserror::Error;

/// Result type alias using TileServError.
pub type TileServResult<T> = Result<T, TileServError>;

/// Primary error type for tile requests.
///
/// Crate-local errors (projection, storage, encoding) convert into this type
/// at the pipeline boundary so the HTTP layer only maps one enum.
#[derive(Debug, Error)]
pub enum TileServError {
    // === Request Errors ===
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer '{name}' is unhealthy and will not be served: {reason}")]
    LayerUnhealthy { name: String, reason: String },

    #[error("Invalid tile coordinate {z}/{x}/{y}")]
    InvalidTile { z: u32, x: u32, y: u32 },

    // === Data Errors ===
    #[error("Unknown spatial reference system: {0}")]
    UnknownSrid(i32),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Database error: {0}")]
    Database(String),

    // === Output Errors ===
    #[error("Tile encoding failed: {0}")]
    Encode(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Request timeout")]
    Timeout,
}

impl TileServError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileServError::InvalidTile { .. } => 400,
            TileServError::LayerNotFound(_) => 404,
            TileServError::LayerUnhealthy { .. } => 422,
            TileServError::Timeout => 504,
            _ => 500,
        }
    }

    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

impl From<std::io::Error> for TileServError {
    fn from(err: std::io::Error) -> Self {
        TileServError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TileServError {
    fn from(err: serde_json::Error) -> Self {
        TileServError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TileServError::LayerNotFound("roads".into()).http_status_code(), 404);
        assert_eq!(
            TileServError::LayerUnhealthy {
                name: "mixed".into(),
                reason: "multiple srids".into()
            }
            .http_status_code(),
            422
        );
        assert_eq!(TileServError::InvalidTile { z: 1, x: 2, y: 0 }.http_status_code(), 400);
        assert_eq!(TileServError::UnknownSrid(9999).http_status_code(), 500);
        assert_eq!(TileServError::Database("boom".into()).http_status_code(), 500);
        assert_eq!(TileServError::Timeout.http_status_code(), 504);
    }

    #[test]
    fn test_client_error_classification() {
        assert!(TileServError::LayerNotFound("x".into()).is_client_error());
        assert!(!TileServError::Encode("x".into()).is_client_error());
    }
}
