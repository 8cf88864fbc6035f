//! HTTP request handlers.

pub mod health;
pub mod landing;
pub mod layers;
pub mod tiles;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tile_common::TileServError;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON error body with the given status.
pub fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a pipeline error to its HTTP response.
pub fn error_response(err: &TileServError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if err.is_client_error() {
        warn!(status = status.as_u16(), error = %err, "Request rejected");
    } else {
        error!(status = status.as_u16(), error = %err, "Request failed");
    }
    error_body(status, err.to_string())
}
