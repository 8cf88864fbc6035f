//! Tile API Server
//!
//! Serves Mapbox Vector Tiles rendered on demand from PostGIS tables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tile_api::config::ServiceConfig;
use tile_api::state::{spawn_catalog_refresh, AppState};

/// Tile API Server
#[derive(Parser, Debug)]
#[command(name = "tile-api")]
#[command(about = "On-demand vector tile server over PostGIS")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "TILESERV_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the configuration)
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "TILESERV_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting tile API server");

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.service.listen = listen;
    }
    let addr: SocketAddr = config
        .service
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {:?}", config.service.listen))?;

    // Registry, pool and catalog scan all complete before the listener binds.
    let state = Arc::new(
        AppState::new(config)
            .await?
            .with_prometheus(prometheus_handle),
    );
    info!(
        layers = state.tile_service.catalog().len().await,
        "Layer catalog ready"
    );

    let _refresh = spawn_catalog_refresh(Arc::clone(&state));
    let app = tile_api::build_router(state);

    info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
