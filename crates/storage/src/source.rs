//! Feature retrieval for a tile.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tile_common::{BoundingBox, Feature, LayerDescriptor};
use tracing::debug;

use crate::decode::{decode_row, NativeGeometryDecoder, PostgisDecoder};
use crate::query::build_tile_query;
use crate::{StorageError, StorageResult};

/// Fetches the features of a layer that intersect a tile.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// `bounds` filters rows, `buffered` clips their geometry. Both are in
    /// the layer's srid.
    async fn fetch_features(
        &self,
        layer: &LayerDescriptor,
        bounds: &BoundingBox,
        buffered: &BoundingBox,
    ) -> StorageResult<Vec<Feature>>;
}

/// Open a bounded connection pool.
pub async fn connect_pool(
    options: PgConnectOptions,
    max_connections: u32,
    acquire_timeout: Duration,
) -> StorageResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Database(format!("Connection failed: {}", e)))?;

    Ok(pool)
}

/// Reads features from PostGIS.
pub struct PgFeatureSource {
    pool: PgPool,
    schema: String,
    statement_timeout: Duration,
    decoder: Arc<dyn NativeGeometryDecoder>,
}

impl PgFeatureSource {
    pub fn new(pool: PgPool, schema: impl Into<String>, statement_timeout: Duration) -> Self {
        Self {
            pool,
            schema: schema.into(),
            statement_timeout,
            decoder: Arc::new(PostgisDecoder),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn NativeGeometryDecoder>) -> Self {
        self.decoder = decoder;
        self
    }
}

#[async_trait]
impl FeatureSource for PgFeatureSource {
    async fn fetch_features(
        &self,
        layer: &LayerDescriptor,
        bounds: &BoundingBox,
        buffered: &BoundingBox,
    ) -> StorageResult<Vec<Feature>> {
        let query = build_tile_query(&self.schema, layer, bounds, buffered)?;

        let mut tx = self.pool.begin().await?;
        // SET does not accept bind parameters; the value is an integer.
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;
        let rows = query.bind().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let row_count = rows.len();
        let decoder = Arc::clone(&self.decoder);
        let features = tokio::task::spawn_blocking(move || {
            rows.iter()
                .filter_map(|row| decode_row(row, decoder.as_ref()))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?;

        debug!(
            layer = %layer.name,
            rows = row_count,
            features = features.len(),
            "Fetched tile features"
        );

        Ok(features)
    }
}
