//! Layer descriptors discovered from the spatial store.

use serde::{Deserialize, Serialize};

use crate::Srid;

/// Health message attached when a geometry column holds more than one srid.
pub const MSG_MULTIPLE_SRIDS: &str =
    "layer has multiple spatial reference ids and will not be served";

/// Health message attached when the geometry column has no spatial index.
pub const MSG_MISSING_SPATIAL_INDEX: &str = "missing spatial index; may affect performance";

/// Kind of relation a layer was discovered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    View,
    MaterializedView,
}

impl ObjectKind {
    /// Map a `pg_class.relkind` code.
    pub fn from_relkind(relkind: &str) -> Option<Self> {
        match relkind {
            "r" | "p" => Some(ObjectKind::Table),
            "v" => Some(ObjectKind::View),
            "m" => Some(ObjectKind::MaterializedView),
            _ => None,
        }
    }
}

/// Declared spatial type of the geometry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// `geometry`: planar coordinates
    Planar,
    /// `geography`: coordinates on the ellipsoid
    Geodetic,
}

impl GeometryKind {
    /// Map a store type name (`geometry` / `geography`).
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "geometry" => Some(GeometryKind::Planar),
            "geography" => Some(GeometryKind::Geodetic),
            _ => None,
        }
    }
}

/// Layer health. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Unhealthy,
}

/// A non-geometry column exposed as a feature attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Store type name, e.g. `int4`, `text`, `timestamptz`
    pub data_type: String,
}

/// Everything the pipeline needs to know about a servable relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    pub object_kind: ObjectKind,
    pub geometry_column: String,
    pub geometry_kind: GeometryKind,
    /// Unset when the column holds no rows or more than one srid.
    pub srid: Option<Srid>,
    pub has_spatial_index: bool,
    pub health: HealthLevel,
    pub health_messages: Vec<String>,
    pub columns: Vec<ColumnInfo>,
}

impl LayerDescriptor {
    /// A freshly discovered layer: healthy, no srid, no index, no columns.
    pub fn new(
        name: impl Into<String>,
        object_kind: ObjectKind,
        geometry_column: impl Into<String>,
        geometry_kind: GeometryKind,
    ) -> Self {
        Self {
            name: name.into(),
            object_kind,
            geometry_column: geometry_column.into(),
            geometry_kind,
            srid: None,
            has_spatial_index: false,
            health: HealthLevel::Healthy,
            health_messages: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Raise the health level. Health never improves.
    pub fn degrade(&mut self, level: HealthLevel, message: impl Into<String>) {
        self.health = self.health.max(level);
        self.health_messages.push(message.into());
    }

    /// Record the distinct srids found among non-null geometries.
    pub fn apply_srids(&mut self, srids: &[Srid]) {
        match srids {
            [] => self.srid = None,
            [srid] => self.srid = Some(*srid),
            _ => {
                self.srid = None;
                self.degrade(HealthLevel::Unhealthy, MSG_MULTIPLE_SRIDS);
            }
        }
    }

    /// Record whether the geometry column is covered by a spatial index.
    pub fn apply_spatial_index(&mut self, indexed: bool) {
        self.has_spatial_index = indexed;
        if !indexed {
            self.degrade(HealthLevel::Warning, MSG_MISSING_SPATIAL_INDEX);
        }
    }

    /// Unhealthy layers are listed but never served.
    pub fn is_servable(&self) -> bool {
        self.health != HealthLevel::Unhealthy
    }

    /// Health messages joined for error responses and logs.
    pub fn health_summary(&self) -> String {
        self.health_messages.join("; ")
    }
}
