//! Projection error types.

use thiserror::Error;
use tile_common::TileServError;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Unknown srid: {0}")]
    UnknownSrid(i32),

    #[error("Duplicate srid {0} in CRS definitions")]
    DuplicateSrid(i32),

    #[error("Invalid definition for srid {srid}: {reason}")]
    InvalidDefinition { srid: i32, reason: String },

    #[error("Transform from {source_srid} to {target_srid} failed: {reason}")]
    TransformFailed {
        source_srid: i32,
        target_srid: i32,
        reason: String,
    },

    #[error("Geometry srid {actual} does not match transform source {expected}")]
    SridMismatch { expected: i32, actual: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<ProjectionError> for TileServError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::UnknownSrid(srid) => TileServError::UnknownSrid(srid),
            other => TileServError::Projection(other.to_string()),
        }
    }
}
