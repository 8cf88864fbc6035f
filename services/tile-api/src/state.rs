//! Application state for the tile API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use projection::CrsRegistry;
use sqlx::PgPool;
use storage::{connect_pool, LayerCatalog, PgFeatureSource, PgIntrospector, SchemaIntrospector};
use tile_common::TileServResult;
use tile_processor::TileService;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::metrics::MetricsCollector;

/// Shared application state.
pub struct AppState {
    pub tile_service: TileService,

    /// Used by on-demand and periodic catalog refreshes.
    pub introspector: Arc<dyn SchemaIntrospector>,

    /// Absent when the state is assembled without a database.
    pub pool: Option<PgPool>,

    pub metrics: Arc<MetricsCollector>,
    pub prometheus: Option<PrometheusHandle>,
    pub config: ServiceConfig,
}

impl AppState {
    /// Load the CRS registry, connect to the store and scan its layers.
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        let registry = CrsRegistry::load_from_path(&config.srid_file)
            .with_context(|| format!("Failed to load srid file {:?}", config.srid_file))?;
        info!(
            definitions = registry.len(),
            path = ?config.srid_file,
            "CRS registry loaded"
        );

        let options = config.connect_options()?;
        let host = options.get_host().to_string();
        let database = options.get_database().unwrap_or_default().to_string();
        let pool = connect_pool(
            options,
            config.database.pool_size,
            config.statement_timeout(),
        )
        .await
        .context("Failed to connect to database")?;
        info!(
            host = %host,
            database = %database,
            pool_size = config.database.pool_size,
            "Database pool ready"
        );

        let schema = config.database.schema.clone();
        let introspector: Arc<dyn SchemaIntrospector> =
            Arc::new(PgIntrospector::new(pool.clone(), schema.clone()));
        let catalog = LayerCatalog::load(introspector.as_ref())
            .await
            .context("Failed to scan layers")?;

        let source = Arc::new(PgFeatureSource::new(
            pool.clone(),
            schema,
            config.statement_timeout(),
        ));
        let tile_service = TileService::new(
            Arc::new(catalog),
            Arc::new(registry),
            source,
            config.tile_config(),
        )?;

        Ok(Self::from_parts(tile_service, introspector, Some(pool), config))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        tile_service: TileService,
        introspector: Arc<dyn SchemaIntrospector>,
        pool: Option<PgPool>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            tile_service,
            introspector,
            pool,
            metrics: Arc::new(MetricsCollector::new()),
            prometheus: None,
            config,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Rescan the store's layers and invalidate cached tiles.
    pub async fn refresh_catalog(&self) -> TileServResult<usize> {
        let count = self
            .tile_service
            .refresh_catalog(self.introspector.as_ref())
            .await?;
        self.metrics.record_catalog_refresh(count);
        Ok(count)
    }
}

/// Start the periodic catalog rescan if one is configured.
pub fn spawn_catalog_refresh(state: Arc<AppState>) -> Option<JoinHandle<()>> {
    let secs = state.config.service.catalog_refresh_secs;
    if secs == 0 {
        return None;
    }

    info!(interval_secs = secs, "Periodic catalog refresh enabled");
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        // The first tick completes immediately; the startup scan already ran.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = state.refresh_catalog().await {
                warn!(error = %e, "Catalog refresh failed, keeping previous layers");
            }
        }
    }))
}
