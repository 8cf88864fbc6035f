//! High-level tile service.
//!
//! `TileService` owns the shared, read-mostly state (layer catalog, CRS
//! registry, response cache) and runs one tile through the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::{counter, histogram};
use projection::{CrsRegistry, Reprojector, SridGeometry};
use storage::{CacheStatus, FeatureSource, LayerCatalog, SchemaIntrospector, TileMemoryCache};
use tile_common::{
    tile_bounds, tile_cache_key, BoundingBox, Feature, LayerDescriptor, Srid, TileBufferConfig,
    TileCoord, TileServError, TileServResult, EPSG_4326, WEB_MERCATOR_MAX_LAT,
};
use tile_encoder::{clip_features, encode_layer, gzip, EncodeOptions, PrecisionGrid, TileBuilder};
use tracing::{debug, info, instrument};

use crate::config::TileConfig;

/// Compressed tile with no layers.
pub fn empty_tile() -> TileServResult<Bytes> {
    Ok(gzip(&TileBuilder::new().encode())?)
}

/// Produces gzip-compressed vector tiles for catalog layers.
pub struct TileService {
    catalog: Arc<LayerCatalog>,
    registry: Arc<CrsRegistry>,
    source: Arc<dyn FeatureSource>,
    cache: Arc<TileMemoryCache>,
    config: TileConfig,
    buffer: TileBufferConfig,
    encode_options: EncodeOptions,
    grid: PrecisionGrid,
    /// Bumped on every catalog refresh and prefixed to cache keys.
    generation: AtomicU64,
}

impl TileService {
    /// Create a service with a response cache sized from `config`.
    pub fn new(
        catalog: Arc<LayerCatalog>,
        registry: Arc<CrsRegistry>,
        source: Arc<dyn FeatureSource>,
        config: TileConfig,
    ) -> TileServResult<Self> {
        let cache = Arc::new(TileMemoryCache::new(
            config.cache_max_mb,
            config.cache_ttl_secs,
        ));
        let encode_options = config.encode_options()?;
        let grid = config.precision_grid()?;

        info!(
            extent = config.extent,
            buffer = config.buffer,
            precision = grid.decimals(),
            cache_enabled = cache.is_enabled(),
            "Tile service configured"
        );

        Ok(Self {
            catalog,
            registry,
            source,
            cache,
            buffer: config.buffer_config(),
            config,
            encode_options,
            grid,
            generation: AtomicU64::new(0),
        })
    }

    /// Replace the response cache, e.g. to share one between services.
    pub fn with_cache(mut self, cache: Arc<TileMemoryCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn catalog(&self) -> &Arc<LayerCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<CrsRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<TileMemoryCache> {
        &self.cache
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    /// Fetch or render one tile.
    ///
    /// Returns the gzip-compressed MVT bytes and whether they came from the
    /// cache.
    #[instrument(skip(self), fields(tile = %coord))]
    pub async fn get_tile(
        &self,
        layer_name: &str,
        coord: TileCoord,
    ) -> TileServResult<(Bytes, CacheStatus)> {
        coord.validate()?;
        // Read before resolving so a refresh in between moves us to a new key.
        let generation = self.generation.load(Ordering::Acquire);
        let layer = self.catalog.resolve_servable(layer_name).await?;

        counter!("tile_requests_total", "layer" => layer.name.clone()).increment(1);

        let key = format!("{}:{}", generation, tile_cache_key(&layer.name, &coord));
        let result = self
            .cache
            .get_or_try_insert_with(&key, || self.render(Arc::clone(&layer), coord))
            .await;

        match &result {
            Ok((data, status)) => {
                counter!("tile_responses_total", "cache" => status.as_str()).increment(1);
                histogram!("tile_size_bytes").record(data.len() as f64);
            }
            Err(e) => {
                counter!("tile_errors_total", "status" => e.http_status_code().to_string())
                    .increment(1);
            }
        }
        result
    }

    /// Rescan the store and drop cached tiles rendered from the old catalog.
    ///
    /// Renders still running against the old catalog store their tiles under
    /// the previous generation, which no later request reads.
    pub async fn refresh_catalog(
        &self,
        introspector: &dyn SchemaIntrospector,
    ) -> TileServResult<usize> {
        let count = self.catalog.refresh(introspector).await?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.clear().await;
        Ok(count)
    }

    /// Number of catalog refreshes applied so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    async fn render(&self, layer: Arc<LayerDescriptor>, coord: TileCoord) -> TileServResult<Bytes> {
        let started = Instant::now();

        // A layer without rows has no srid and nothing to draw.
        let Some(srid) = layer.srid else {
            debug!(layer = %layer.name, "Layer has no srid, returning empty tile");
            return empty_tile();
        };

        let bounds = tile_bounds(&coord);
        let buffered = self.buffer.buffered_bounds(&coord);
        let (bounds, buffered) = if srid == EPSG_4326 {
            (bounds, buffered)
        } else {
            // Low-zoom buffers reach past the poles, which no projection accepts.
            let limits = projectable_lonlat();
            let forward = Reprojector::new(&self.registry, EPSG_4326, srid)?;
            (
                forward.transform_bbox(&bounds.clamp_to(&limits))?,
                forward.transform_bbox(&buffered.clamp_to(&limits))?,
            )
        };

        let fetch_started = Instant::now();
        let features = self
            .source
            .fetch_features(&layer, &bounds, &buffered)
            .await?;
        histogram!("tile_fetch_seconds").record(fetch_started.elapsed().as_secs_f64());
        histogram!("tile_features").record(features.len() as f64);

        let registry = Arc::clone(&self.registry);
        let grid = self.grid;
        let options = self.encode_options;
        let name = layer.name.clone();
        let data = tokio::task::spawn_blocking(move || -> TileServResult<Bytes> {
            let clipped = clip_features(features, &buffered, &grid);
            let display = to_display_srid(&registry, clipped, srid)?;
            let mvt = encode_layer(&name, &display, &coord, &options);
            Ok(gzip(&mvt)?)
        })
        .await
        .map_err(|e| TileServError::Internal(format!("Tile task failed: {}", e)))??;

        let elapsed = started.elapsed();
        histogram!("tile_render_seconds").record(elapsed.as_secs_f64());
        debug!(
            layer = %layer.name,
            bytes = data.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered tile"
        );
        Ok(data)
    }
}

/// Lon/lat range handed to the layer projection: the whole longitude span and
/// the latitudes the tile pyramid covers.
fn projectable_lonlat() -> BoundingBox {
    BoundingBox::new(-180.0, -WEB_MERCATOR_MAX_LAT, 180.0, WEB_MERCATOR_MAX_LAT)
}

/// Reproject features from the layer srid back to EPSG:4326.
fn to_display_srid(
    registry: &CrsRegistry,
    features: Vec<Feature>,
    srid: Srid,
) -> TileServResult<Vec<Feature>> {
    if srid == EPSG_4326 {
        return Ok(features);
    }
    let back = Reprojector::new(registry, srid, EPSG_4326)?;
    features
        .into_iter()
        .map(|feature| -> TileServResult<Feature> {
            let SridGeometry { geometry, .. } =
                back.transform_geometry(&SridGeometry::new(srid, feature.geometry))?;
            Ok(Feature {
                geometry,
                properties: feature.properties,
            })
        })
        .collect()
}
