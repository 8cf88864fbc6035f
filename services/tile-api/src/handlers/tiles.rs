//! Vector tile endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tile_common::TileCoord;
use tracing::instrument;

use super::{error_body, error_response};
use crate::state::AppState;

pub const MVT_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";

/// Reports whether the tile came from the response cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Deserialize)]
pub struct TilePath {
    pub layer: String,
    pub z: String,
    pub x: String,
    pub y: String,
}

/// Parse `z`, `x` and `y` path segments. `y` may carry a `.pbf` or `.mvt`
/// extension.
pub fn parse_tile_path(z: &str, x: &str, y: &str) -> Option<TileCoord> {
    let y = y
        .strip_suffix(".pbf")
        .or_else(|| y.strip_suffix(".mvt"))
        .unwrap_or(y);
    Some(TileCoord::new(
        z.parse().ok()?,
        x.parse().ok()?,
        y.parse().ok()?,
    ))
}

/// GET /:layer/:z/:x/:y
#[instrument(skip(state))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<TilePath>,
) -> Response {
    let started = Instant::now();
    let TilePath { layer, z, x, y } = path;

    let Some(coord) = parse_tile_path(&z, &x, &y) else {
        state.metrics.record_tile_error();
        return error_body(
            StatusCode::BAD_REQUEST,
            format!("Invalid tile path {}/{}/{}", z, x, y),
        );
    };

    match state.tile_service.get_tile(&layer, coord).await {
        Ok((data, cache_status)) => {
            state.metrics.record_tile(cache_status, started.elapsed()).await;
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, MVT_CONTENT_TYPE.to_string()),
                    (header::CONTENT_ENCODING, "gzip".to_string()),
                    (
                        header::CACHE_CONTROL,
                        format!("max-age={}", state.config.service.cache_control_max_age),
                    ),
                    (X_CACHE, cache_status.as_str().to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(e) => {
            state.metrics.record_tile_error();
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile_path() {
        assert_eq!(parse_tile_path("3", "1", "2"), Some(TileCoord::new(3, 1, 2)));
        assert_eq!(
            parse_tile_path("3", "1", "2.pbf"),
            Some(TileCoord::new(3, 1, 2))
        );
        assert_eq!(
            parse_tile_path("3", "1", "2.mvt"),
            Some(TileCoord::new(3, 1, 2))
        );
        assert_eq!(parse_tile_path("3", "-1", "2"), None);
        assert_eq!(parse_tile_path("a", "1", "2"), None);
        assert_eq!(parse_tile_path("3", "1", "2.png"), None);
    }
}
