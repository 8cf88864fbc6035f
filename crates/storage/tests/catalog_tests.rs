//! Layer discovery and catalog tests against an in-memory introspector.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use storage::{
    discover_layers, LayerCatalog, SchemaIntrospector, SpatialColumn, StorageError, StorageResult,
};
use tile_common::{
    ColumnInfo, GeometryKind, HealthLevel, ObjectKind, TileServError, MSG_MISSING_SPATIAL_INDEX,
    MSG_MULTIPLE_SRIDS,
};

#[derive(Default)]
struct FakeIntrospector {
    columns: Mutex<Vec<SpatialColumn>>,
    srids: Mutex<HashMap<String, Vec<i32>>>,
    indexed: Mutex<HashSet<(String, String)>>,
    fail: Mutex<bool>,
}

impl FakeIntrospector {
    fn add(&self, table: &str, column: &str, type_name: &str, kind: ObjectKind, srids: &[i32]) {
        self.columns.lock().unwrap().push(SpatialColumn {
            table: table.to_string(),
            column: column.to_string(),
            type_name: type_name.to_string(),
            object_kind: kind,
        });
        self.srids
            .lock()
            .unwrap()
            .insert(format!("{}.{}", table, column), srids.to_vec());
    }

    fn index(&self, table: &str, column: &str) {
        self.indexed
            .lock()
            .unwrap()
            .insert((table.to_string(), column.to_string()));
    }
}

#[async_trait]
impl SchemaIntrospector for FakeIntrospector {
    async fn spatial_columns(&self) -> StorageResult<Vec<SpatialColumn>> {
        if *self.fail.lock().unwrap() {
            return Err(StorageError::Database("connection refused".into()));
        }
        Ok(self.columns.lock().unwrap().clone())
    }

    async fn distinct_srids(&self, table: &str, column: &str) -> StorageResult<Vec<i32>> {
        Ok(self
            .srids
            .lock()
            .unwrap()
            .get(&format!("{}.{}", table, column))
            .cloned()
            .unwrap_or_default())
    }

    async fn spatially_indexed_columns(&self) -> StorageResult<HashSet<(String, String)>> {
        Ok(self.indexed.lock().unwrap().clone())
    }

    async fn attribute_columns(&self, _table: &str) -> StorageResult<Vec<ColumnInfo>> {
        Ok(vec![ColumnInfo {
            name: "id".to_string(),
            data_type: "int4".to_string(),
        }])
    }
}

fn introspector() -> FakeIntrospector {
    let fake = FakeIntrospector::default();
    fake.add("roads", "geom", "geometry", ObjectKind::Table, &[3857]);
    fake.index("roads", "geom");
    fake.add("parcels", "shape", "geometry", ObjectKind::Table, &[4326]);
    fake.add("mixed", "geom", "geometry", ObjectKind::View, &[3857, 4326]);
    fake.add("places", "location", "geography", ObjectKind::MaterializedView, &[4326]);
    fake.add("places", "other_geom", "geometry", ObjectKind::MaterializedView, &[3857]);
    fake.index("places", "location");
    fake
}

#[tokio::test]
async fn test_discover_layer_health() {
    let layers = discover_layers(&introspector()).await.unwrap();
    let by_name: HashMap<_, _> = layers.iter().map(|l| (l.name.as_str(), l)).collect();
    assert_eq!(by_name.len(), 4);

    let roads = by_name["roads"];
    assert_eq!(roads.health, HealthLevel::Healthy);
    assert_eq!(roads.srid, Some(3857));
    assert!(roads.has_spatial_index);
    assert_eq!(roads.columns.len(), 1);

    let parcels = by_name["parcels"];
    assert_eq!(parcels.health, HealthLevel::Warning);
    assert_eq!(parcels.health_messages, vec![MSG_MISSING_SPATIAL_INDEX]);
    assert_eq!(parcels.geometry_column, "shape");

    let mixed = by_name["mixed"];
    assert_eq!(mixed.health, HealthLevel::Unhealthy);
    assert_eq!(mixed.srid, None);
    assert_eq!(
        mixed.health_messages,
        vec![MSG_MULTIPLE_SRIDS, MSG_MISSING_SPATIAL_INDEX]
    );
}

#[tokio::test]
async fn test_first_geometry_column_wins() {
    let layers = discover_layers(&introspector()).await.unwrap();
    let places = layers.iter().find(|l| l.name == "places").unwrap();
    assert_eq!(places.geometry_column, "location");
    assert_eq!(places.geometry_kind, GeometryKind::Geodetic);
    assert_eq!(places.object_kind, ObjectKind::MaterializedView);
    assert_eq!(places.srid, Some(4326));
}

#[tokio::test]
async fn test_resolve_servable() {
    let catalog = LayerCatalog::load(&introspector()).await.unwrap();

    assert!(catalog.resolve_servable("roads").await.is_ok());
    assert!(catalog.resolve_servable("parcels").await.is_ok());

    let err = catalog.resolve_servable("mixed").await.unwrap_err();
    assert!(matches!(err, TileServError::LayerUnhealthy { .. }));
    assert_eq!(err.http_status_code(), 422);

    let err = catalog.resolve_servable("nope").await.unwrap_err();
    assert!(matches!(err, TileServError::LayerNotFound(_)));
    assert_eq!(err.http_status_code(), 404);
}

#[tokio::test]
async fn test_list_sorted_by_name() {
    let catalog = LayerCatalog::load(&introspector()).await.unwrap();
    let names: Vec<String> = catalog
        .list()
        .await
        .iter()
        .map(|l| l.name.clone())
        .collect();
    assert_eq!(names, vec!["mixed", "parcels", "places", "roads"]);
}

#[tokio::test]
async fn test_refresh_swaps_snapshot() {
    let fake = introspector();
    let catalog = LayerCatalog::load(&fake).await.unwrap();
    let held = catalog.get("parcels").await.unwrap();
    assert_eq!(held.health, HealthLevel::Warning);

    fake.index("parcels", "shape");
    fake.add("rivers", "geom", "geometry", ObjectKind::Table, &[4326]);
    let count = catalog.refresh(&fake).await.unwrap();
    assert_eq!(count, 5);

    // The descriptor resolved before the refresh is unchanged.
    assert_eq!(held.health, HealthLevel::Warning);
    let fresh = catalog.get("parcels").await.unwrap();
    assert_eq!(fresh.health, HealthLevel::Healthy);
    assert!(catalog.get("rivers").await.is_some());
}

#[tokio::test]
async fn test_failed_refresh_keeps_snapshot() {
    let fake = introspector();
    let catalog = LayerCatalog::load(&fake).await.unwrap();

    *fake.fail.lock().unwrap() = true;
    assert!(catalog.refresh(&fake).await.is_err());
    assert_eq!(catalog.len().await, 4);
}
