//! Layer catalog built from schema introspection.
//!
//! The catalog is an immutable snapshot swapped as a whole on refresh, so a
//! request that resolved a layer keeps a consistent descriptor even while a
//! rescan is running.

use std::collections::HashMap;
use std::sync::Arc;

use tile_common::{GeometryKind, HealthLevel, LayerDescriptor, TileServError, TileServResult};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::introspect::SchemaIntrospector;
use crate::StorageResult;

type Snapshot = Arc<HashMap<String, Arc<LayerDescriptor>>>;

/// Scan the store and describe every relation with a spatial column.
///
/// The first spatial column of a relation is its geometry column. Health is
/// derived from the srids found in that column and from spatial index
/// coverage.
pub async fn discover_layers(
    introspector: &dyn SchemaIntrospector,
) -> StorageResult<Vec<LayerDescriptor>> {
    let columns = introspector.spatial_columns().await?;
    let indexed = introspector.spatially_indexed_columns().await?;

    let mut layers: Vec<LayerDescriptor> = Vec::new();
    for column in columns {
        if layers.iter().any(|layer| layer.name == column.table) {
            continue;
        }
        let Some(kind) = GeometryKind::from_type_name(&column.type_name) else {
            continue;
        };

        let mut layer =
            LayerDescriptor::new(&column.table, column.object_kind, &column.column, kind);

        let srids = introspector
            .distinct_srids(&column.table, &column.column)
            .await?;
        layer.apply_srids(&srids);

        let key = (column.table.clone(), column.column.clone());
        layer.apply_spatial_index(indexed.contains(&key));

        layer.columns = introspector.attribute_columns(&column.table).await?;

        if layer.health != HealthLevel::Healthy {
            warn!(
                layer = %layer.name,
                health = ?layer.health,
                messages = %layer.health_summary(),
                "Layer health degraded"
            );
        }
        layers.push(layer);
    }

    Ok(layers)
}

/// Process-wide registry of discovered layers.
pub struct LayerCatalog {
    snapshot: RwLock<Snapshot>,
}

fn build_snapshot(layers: Vec<LayerDescriptor>) -> Snapshot {
    Arc::new(
        layers
            .into_iter()
            .map(|layer| (layer.name.clone(), Arc::new(layer)))
            .collect(),
    )
}

impl LayerCatalog {
    pub fn new(layers: Vec<LayerDescriptor>) -> Self {
        Self {
            snapshot: RwLock::new(build_snapshot(layers)),
        }
    }

    /// Build a catalog from a full scan.
    pub async fn load(introspector: &dyn SchemaIntrospector) -> StorageResult<Self> {
        let layers = discover_layers(introspector).await?;
        info!(layers = layers.len(), "Layer catalog loaded");
        Ok(Self::new(layers))
    }

    /// Rescan and swap in the new snapshot. On failure the current snapshot
    /// stays in place. Returns the new layer count.
    pub async fn refresh(&self, introspector: &dyn SchemaIntrospector) -> StorageResult<usize> {
        let layers = discover_layers(introspector).await?;
        let count = layers.len();
        let snapshot = build_snapshot(layers);
        *self.snapshot.write().await = snapshot;
        info!(layers = count, "Layer catalog refreshed");
        Ok(count)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<LayerDescriptor>> {
        self.snapshot.read().await.get(name).cloned()
    }

    /// All layers sorted by name.
    pub async fn list(&self) -> Vec<Arc<LayerDescriptor>> {
        let snapshot = self.snapshot.read().await.clone();
        let mut layers: Vec<_> = snapshot.values().cloned().collect();
        layers.sort_by(|a, b| a.name.cmp(&b.name));
        layers
    }

    /// Look up a layer that may be served: unknown names and unhealthy
    /// layers are errors.
    pub async fn resolve_servable(&self, name: &str) -> TileServResult<Arc<LayerDescriptor>> {
        let layer = self
            .get(name)
            .await
            .ok_or_else(|| TileServError::LayerNotFound(name.to_string()))?;

        if !layer.is_servable() {
            return Err(TileServError::LayerUnhealthy {
                name: layer.name.clone(),
                reason: layer.health_summary(),
            });
        }
        Ok(layer)
    }

    pub async fn len(&self) -> usize {
        self.snapshot.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot.read().await.is_empty()
    }
}
