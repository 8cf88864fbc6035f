//! Storage error types.

use thiserror::Error;
use tile_common::TileServError;

pub type StorageResult<T> = Result<T, StorageError>;

/// Postgres SQLSTATE for a statement cancelled by `statement_timeout`.
const QUERY_CANCELED: &str = "57014";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Query timed out")]
    Timeout,

    #[error("Layer '{0}' has no usable srid and cannot be queried")]
    LayerNotServable(String),

    #[error("Invalid WKB: {0}")]
    InvalidWkb(String),

    #[error("Empty point geometry")]
    EmptyPoint,

    #[error("Blocking task failed: {0}")]
    Task(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => StorageError::Timeout,
            sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                StorageError::Timeout
            }
            _ => StorageError::Database(err.to_string()),
        }
    }
}

impl From<StorageError> for TileServError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Timeout => TileServError::Timeout,
            StorageError::Database(msg) => TileServError::Database(msg),
            StorageError::Task(msg) => TileServError::Internal(msg),
            other => TileServError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_timeout() {
        assert!(matches!(
            StorageError::from(sqlx::Error::PoolTimedOut),
            StorageError::Timeout
        ));
    }

    #[test]
    fn test_top_level_mapping() {
        assert_eq!(TileServError::from(StorageError::Timeout).http_status_code(), 504);
        assert_eq!(
            TileServError::from(StorageError::Database("down".into())).http_status_code(),
            500
        );
    }
}
