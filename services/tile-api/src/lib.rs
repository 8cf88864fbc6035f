//! Tile API library.
//!
//! HTTP surface of the vector tile server: routing, handlers, service
//! configuration and application state.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod state;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Extension, Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::state::AppState;

/// CORS policy for the configured origins. `*` (or no origins) allows any.
pub fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    if config.cors_is_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .service
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::landing::landing_handler))
        // Layers
        .route("/layers", get(handlers::layers::list_layers_handler))
        .route(
            "/layers/refresh",
            post(handlers::layers::refresh_layers_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .route("/api/metrics", get(handlers::health::api_metrics_handler))
        // Tiles
        .route("/:layer/:z/:x/:y", get(handlers::tiles::tile_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        // Tile bodies already carry Content-Encoding and are left alone.
        .layer(CompressionLayer::new())
        .layer(cors)
}
