//! Registry of coordinate reference system definitions.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::{ProjectionError, ProjectionResult};

/// A CRS definition: authority, numeric code and its proj4 string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsDefinition {
    pub code: i32,
    pub authority: String,
    pub definition: String,
}

impl CrsDefinition {
    /// Geographic (lon/lat) definitions take degrees at the API boundary
    /// and radians inside proj4rs.
    pub fn is_geographic(&self) -> bool {
        self.definition.split_whitespace().any(|token| {
            matches!(
                token,
                "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"
            )
        })
    }
}

/// One CSV record, shaped like a `spatial_ref_sys` export.
#[derive(Debug, Deserialize)]
struct CrsRecord {
    auth_name: String,
    auth_srid: i32,
    proj4text: String,
}

/// Immutable map from srid to definition. Built once at startup and shared
/// behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct CrsRegistry {
    definitions: HashMap<i32, CrsDefinition>,
}

impl CrsRegistry {
    /// Parse CSV with the header `auth_name,auth_srid,proj4text`.
    pub fn from_reader<R: Read>(reader: R) -> ProjectionResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut definitions = HashMap::new();
        for record in csv_reader.deserialize::<CrsRecord>() {
            let record = record?;
            if record.proj4text.trim().is_empty() {
                return Err(ProjectionError::InvalidDefinition {
                    srid: record.auth_srid,
                    reason: "empty proj4 definition".to_string(),
                });
            }
            if definitions.contains_key(&record.auth_srid) {
                return Err(ProjectionError::DuplicateSrid(record.auth_srid));
            }
            definitions.insert(
                record.auth_srid,
                CrsDefinition {
                    code: record.auth_srid,
                    authority: record.auth_name,
                    definition: record.proj4text,
                },
            );
        }

        Ok(Self { definitions })
    }

    /// Load the registry from a CSV file on disk.
    pub fn load_from_path(path: impl AsRef<Path>) -> ProjectionResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let registry = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            definitions = registry.len(),
            "Loaded CRS definitions"
        );
        Ok(registry)
    }

    /// Look up a definition. Absent ids are an error, never a default.
    pub fn get(&self, srid: i32) -> ProjectionResult<&CrsDefinition> {
        self.definitions
            .get(&srid)
            .ok_or(ProjectionError::UnknownSrid(srid))
    }

    pub fn contains(&self, srid: i32) -> bool {
        self.definitions.contains_key(&srid)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All known codes, ascending.
    pub fn codes(&self) -> Vec<i32> {
        let mut codes: Vec<i32> = self.definitions.keys().copied().collect();
        codes.sort_unstable();
        codes
    }
}
