//! Router tests against in-memory stores.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use geo::Geometry;
use projection::CrsRegistry;
use serde_json::Value;
use storage::{
    FeatureSource, LayerCatalog, SchemaIntrospector, SpatialColumn, StorageResult,
};
use test_utils::{sample_feature, sample_layer, square, unhealthy_layer, SRID_CSV};
use tile_api::build_router;
use tile_api::config::ServiceConfig;
use tile_api::state::AppState;
use tile_common::{BoundingBox, ColumnInfo, Feature, LayerDescriptor, ObjectKind};
use tile_encoder::{decode_tile, gunzip};
use tile_processor::TileService;
use tower::ServiceExt;

struct StaticSource {
    features: Vec<Feature>,
}

#[async_trait]
impl FeatureSource for StaticSource {
    async fn fetch_features(
        &self,
        _layer: &LayerDescriptor,
        _bounds: &BoundingBox,
        _buffered: &BoundingBox,
    ) -> StorageResult<Vec<Feature>> {
        Ok(self.features.clone())
    }
}

/// A store holding a single indexed `roads` table.
struct RoadsIntrospector;

#[async_trait]
impl SchemaIntrospector for RoadsIntrospector {
    async fn spatial_columns(&self) -> StorageResult<Vec<SpatialColumn>> {
        Ok(vec![SpatialColumn {
            table: "roads".to_string(),
            column: "geom".to_string(),
            type_name: "geometry".to_string(),
            object_kind: ObjectKind::Table,
        }])
    }

    async fn distinct_srids(&self, _table: &str, _column: &str) -> StorageResult<Vec<i32>> {
        Ok(vec![4326])
    }

    async fn spatially_indexed_columns(&self) -> StorageResult<HashSet<(String, String)>> {
        Ok(HashSet::from([("roads".to_string(), "geom".to_string())]))
    }

    async fn attribute_columns(&self, _table: &str) -> StorageResult<Vec<ColumnInfo>> {
        Ok(Vec::new())
    }
}

fn app_with(config: ServiceConfig) -> Router {
    let catalog = Arc::new(LayerCatalog::new(vec![
        sample_layer("parcels", 4326),
        unhealthy_layer("mixed"),
    ]));
    let registry = Arc::new(CrsRegistry::from_reader(SRID_CSV.as_bytes()).unwrap());
    let source = Arc::new(StaticSource {
        features: vec![sample_feature(
            Geometry::Polygon(square(10.0, 10.0, 20.0)),
            1,
        )],
    });
    let service = TileService::new(catalog, registry, source, config.tile_config()).unwrap();
    let state = AppState::from_parts(service, Arc::new(RoadsIntrospector), None, config);
    build_router(Arc::new(state))
}

fn app() -> Router {
    app_with(ServiceConfig::default())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_landing_page() {
    let response = app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(body, b"Welcome to the tileserv API!");
}

#[tokio::test]
async fn test_tile_response_headers_and_body() {
    let response = app().oneshot(get("/parcels/2/2/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/vnd.mapbox-vector-tile"
    );
    assert_eq!(headers[header::CONTENT_ENCODING], "gzip");
    assert_eq!(headers[header::CACHE_CONTROL], "max-age=3600");
    assert_eq!(headers["x-cache"], "MISS");

    let body = body_bytes(response).await;
    let tile = decode_tile(&gunzip(&body).unwrap()).unwrap();
    assert_eq!(tile.layers.len(), 1);
    assert_eq!(tile.layers[0].name, "parcels");
}

#[tokio::test]
async fn test_tile_path_accepts_pbf_extension() {
    let response = app().oneshot(get("/parcels/2/2/1.pbf")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_second_request_served_from_cache() {
    let mut config = ServiceConfig::default();
    config.service.cache_ttl_secs = 60;
    config.service.cache_control_max_age = 120;
    let app = app_with(config);

    let first = app.clone().oneshot(get("/parcels/2/2/1")).await.unwrap();
    assert_eq!(first.headers()["x-cache"], "MISS");
    let first_body = body_bytes(first).await;

    let second = app.oneshot(get("/parcels/2/2/1")).await.unwrap();
    assert_eq!(second.headers()["x-cache"], "HIT");
    assert_eq!(second.headers()[header::CACHE_CONTROL], "max-age=120");
    assert_eq!(body_bytes(second).await, first_body);
}

#[tokio::test]
async fn test_unknown_layer_is_404() {
    let response = app().oneshot(get("/nope/0/0/0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Layer not found: nope");
}

#[tokio::test]
async fn test_unhealthy_layer_is_422() {
    let response = app().oneshot(get("/mixed/0/0/0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_invalid_coordinates_are_400() {
    let response = app().oneshot(get("/parcels/1/2/0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app().oneshot(get("/parcels/a/0/0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_layers_listed_sorted() {
    let response = app().oneshot(get("/layers")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|layer| layer["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["mixed", "parcels"]);
    assert_eq!(body[0]["health"], "unhealthy");
}

#[tokio::test]
async fn test_refresh_replaces_catalog() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/layers/refresh")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["layers"], 1);

    let body = body_json(app.clone().oneshot(get("/layers")).await.unwrap()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "roads");
    assert_eq!(body[0]["srid"], 4326);

    let response = app.oneshot(get("/parcels/0/0/0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_ready() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    let response = app().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["layers"], 2);
}

#[tokio::test]
async fn test_metrics_endpoints() {
    let app = app();
    let _ = app.clone().oneshot(get("/parcels/2/2/1")).await.unwrap();

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );

    let body = body_json(app.oneshot(get("/api/metrics")).await.unwrap()).await;
    assert_eq!(body["tile_requests"], 1);
    assert_eq!(body["cache_misses"], 1);
}

#[tokio::test]
async fn test_cors_origins() {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://maps.example")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let mut config = ServiceConfig::default();
    config.service.cors_origins = vec!["https://maps.example".to_string()];
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://maps.example")
        .body(Body::empty())
        .unwrap();
    let response = app_with(config).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://maps.example"
    );
}
