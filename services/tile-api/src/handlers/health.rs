//! Health and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub layers: usize,
}

/// GET /health - Basic health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready - Readiness check (verifies database connectivity)
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let db_status = match &state.pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => Some("ok".to_string()),
            Err(e) => Some(format!("error: {}", e)),
        },
        None => None,
    };
    let is_ready = db_status.as_deref().map_or(true, |s| s == "ok");

    let response = ReadyResponse {
        ready: is_ready,
        database: db_status,
        layers: state.tile_service.catalog().len().await,
    };
    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response)).into_response()
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    state
        .metrics
        .record_tile_memory_cache_stats(&state.tile_service.cache().stats());

    let body = state
        .prometheus
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

/// GET /api/metrics - collector snapshot as JSON
pub async fn api_metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot().await)
}
