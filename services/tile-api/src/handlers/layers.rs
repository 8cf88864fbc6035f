//! Layer catalog endpoints.

use std::sync::Arc;

use axum::{
    extract::Extension,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tile_common::LayerDescriptor;
use tracing::{info, instrument};

use super::error_response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub layers: usize,
}

/// GET /layers - every discovered layer, healthy or not, sorted by name.
pub async fn list_layers_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<Vec<LayerDescriptor>> {
    let layers = state
        .tile_service
        .catalog()
        .list()
        .await
        .iter()
        .map(|layer| layer.as_ref().clone())
        .collect();
    Json(layers)
}

/// POST /layers/refresh - rescan the store now.
#[instrument(skip(state))]
pub async fn refresh_layers_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.refresh_catalog().await {
        Ok(layers) => {
            info!(layers, "Catalog refreshed on request");
            Json(RefreshResponse { layers }).into_response()
        }
        Err(e) => error_response(&e),
    }
}
