//! Service configuration loading and types.
//!
//! Values come from an optional YAML file and are then overridden from the
//! environment, so a container can run with no file at all.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use tile_encoder::MAX_PRECISION_DECIMALS;
use tile_processor::TileConfig;

/// Top-level configuration for the tile server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub service: HttpConfig,
    pub tile: TileSection,
    /// CSV of `auth_name,auth_srid,proj4text` rows.
    pub srid_file: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            service: HttpConfig::default(),
            tile: TileSection::default(),
            srid_file: PathBuf::from("config/srid.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub schema: String,
    pub timeout_secs: u64,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            name: "postgres".to_string(),
            schema: "public".to_string(),
            timeout_secs: 10,
            pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub listen: String,
    /// Response cache TTL; 0 or less disables the cache.
    pub cache_ttl_secs: i64,
    pub cache_max_mb: usize,
    /// Value of the `Cache-Control: max-age` header on tiles.
    pub cache_control_max_age: i64,
    pub cors_origins: Vec<String>,
    /// Periodic catalog rescan interval; 0 disables it.
    pub catalog_refresh_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
            cache_ttl_secs: 0,
            cache_max_mb: 256,
            cache_control_max_age: 3600,
            cors_origins: vec!["*".to_string()],
            catalog_refresh_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSection {
    pub extent: u32,
    pub buffer: u32,
    pub precision_decimals: u32,
}

impl Default for TileSection {
    fn default() -> Self {
        Self {
            extent: 4096,
            buffer: 256,
            precision_decimals: 7,
        }
    }
}

impl ServiceConfig {
    /// Load from `path` if given, apply environment overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: ServiceConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        tracing::info!(path = ?path, "Loaded service configuration");
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        override_string(&lookup, "DB_HOST", &mut self.database.host);
        override_parsed(&lookup, "DB_PORT", &mut self.database.port)?;
        override_string(&lookup, "DB_USER", &mut self.database.user);
        override_string(&lookup, "DB_PASSWORD", &mut self.database.password);
        override_string(&lookup, "DB_NAME", &mut self.database.name);
        override_string(&lookup, "DB_SCHEMA", &mut self.database.schema);
        override_parsed(&lookup, "DB_TIMEOUT_SECS", &mut self.database.timeout_secs)?;
        override_parsed(&lookup, "DB_POOL_SIZE", &mut self.database.pool_size)?;

        override_string(&lookup, "TILESERV_LISTEN", &mut self.service.listen);
        override_parsed(&lookup, "CACHE_TTL_SECS", &mut self.service.cache_ttl_secs)?;
        override_parsed(&lookup, "CACHE_MAX_MB", &mut self.service.cache_max_mb)?;
        override_parsed(
            &lookup,
            "CACHE_CONTROL_MAX_AGE",
            &mut self.service.cache_control_max_age,
        )?;
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.service.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        override_parsed(
            &lookup,
            "CATALOG_REFRESH_SECS",
            &mut self.service.catalog_refresh_secs,
        )?;

        override_parsed(&lookup, "TILE_EXTENT", &mut self.tile.extent)?;
        override_parsed(&lookup, "TILE_BUFFER", &mut self.tile.buffer)?;
        override_parsed(
            &lookup,
            "TILE_PRECISION_DECIMALS",
            &mut self.tile.precision_decimals,
        )?;

        if let Some(path) = lookup("SRID_FILE") {
            self.srid_file = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            bail!("database.pool_size must be at least 1");
        }
        if self.tile.extent == 0 {
            bail!("tile.extent must be positive");
        }
        if self.service.cache_control_max_age <= 0 {
            bail!(
                "service.cache_control_max_age must be positive, got {}",
                self.service.cache_control_max_age
            );
        }
        if self.tile.precision_decimals > MAX_PRECISION_DECIMALS {
            bail!(
                "tile.precision_decimals must be within 0..={}, got {}",
                MAX_PRECISION_DECIMALS,
                self.tile.precision_decimals
            );
        }
        Ok(())
    }

    /// Connection settings for the pool. `database.url` is parsed when set;
    /// otherwise the individual fields are used as given, unescaped.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.database.url {
            return url
                .parse::<PgConnectOptions>()
                .context("Invalid DATABASE_URL");
        }
        let db = &self.database;
        Ok(PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .password(&db.password)
            .database(&db.name))
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.database.timeout_secs)
    }

    /// The plain settings the tile pipeline consumes.
    pub fn tile_config(&self) -> TileConfig {
        TileConfig {
            extent: self.tile.extent,
            buffer: self.tile.buffer,
            precision_decimals: self.tile.precision_decimals,
            cache_ttl_secs: self.service.cache_ttl_secs,
            cache_max_mb: self.service.cache_max_mb,
            ..TileConfig::default()
        }
    }

    pub fn cors_is_permissive(&self) -> bool {
        self.service.cors_origins.is_empty() || self.service.cors_origins.iter().any(|o| o == "*")
    }
}

fn override_string<F>(lookup: &F, key: &str, target: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *target = value;
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = lookup(key) {
        *target = value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", key, value, e))?;
    }
    Ok(())
}
