//! Row decoding: native geometry values to `geo` geometries, other columns
//! to attribute values.

use geo::{CoordsIter, Geometry};
use geozero::wkb::{Ewkb, Wkb};
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry, ToGeo, ToWkb};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tile_common::{AttributeValue, Feature, GeometryKind};
use tracing::debug;

use crate::{StorageError, StorageResult};

/// Store types decoded directly; anything else is selected as `::text`.
pub const NATIVE_ATTRIBUTE_TYPES: &[&str] = &[
    "bool", "int2", "int4", "int8", "float4", "float8", "text", "varchar", "bpchar", "name",
];

pub fn is_native_attribute_type(type_name: &str) -> bool {
    NATIVE_ATTRIBUTE_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(type_name))
}

/// Plain WKB plus the srid carried by the native value, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WkbGeometry {
    pub srid: Option<i32>,
    pub wkb: Vec<u8>,
}

/// Converts a store's native geometry encoding into WKB.
pub trait NativeGeometryDecoder: Send + Sync {
    fn to_wkb(&self, native: &[u8]) -> StorageResult<WkbGeometry>;

    /// Decode straight to a geometry. The default goes through [`Self::to_wkb`].
    fn decode(&self, native: &[u8]) -> StorageResult<(Option<i32>, Geometry<f64>)> {
        let wkb = self.to_wkb(native)?;
        Ok((wkb.srid, read_wkb(&wkb.wkb)?))
    }
}

/// PostGIS sends `geometry` and `geography` values as EWKB.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgisDecoder;

impl NativeGeometryDecoder for PostgisDecoder {
    fn to_wkb(&self, native: &[u8]) -> StorageResult<WkbGeometry> {
        let (srid, geometry) = self.decode(native)?;
        let wkb = geometry
            .to_wkb(CoordDimensions::xy())
            .map_err(|e| StorageError::InvalidWkb(e.to_string()))?;
        Ok(WkbGeometry { srid, wkb })
    }

    fn decode(&self, native: &[u8]) -> StorageResult<(Option<i32>, Geometry<f64>)> {
        let ewkb = Ewkb(native.to_vec());
        let mut srid = SridReader::default();
        ewkb.process_geom(&mut srid)
            .map_err(|e| StorageError::InvalidWkb(e.to_string()))?;
        let geometry = ewkb
            .to_geo()
            .map_err(|e| StorageError::InvalidWkb(e.to_string()))?;
        Ok((srid.srid, finite(geometry)?))
    }
}

/// Records the srid from an EWKB header and ignores the coordinates.
#[derive(Default)]
struct SridReader {
    srid: Option<i32>,
}

impl GeomProcessor for SridReader {
    fn srid(&mut self, srid: Option<i32>) -> geozero::error::Result<()> {
        if self.srid.is_none() {
            self.srid = srid;
        }
        Ok(())
    }
}

/// Parse ISO WKB (either byte order). Z and M values are dropped.
pub fn read_wkb(bytes: &[u8]) -> StorageResult<Geometry<f64>> {
    let geometry = Wkb(bytes.to_vec())
        .to_geo()
        .map_err(|e| StorageError::InvalidWkb(e.to_string()))?;
    finite(geometry)
}

/// WKB writes an empty point as NaN coordinates; nothing downstream can draw it.
fn finite(geometry: Geometry<f64>) -> StorageResult<Geometry<f64>> {
    let all_finite = geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite());
    match (&geometry, all_finite) {
        (_, true) => Ok(geometry),
        (Geometry::Point(_), false) => Err(StorageError::EmptyPoint),
        (_, false) => Err(StorageError::InvalidWkb(
            "non-finite coordinate".to_string(),
        )),
    }
}

/// Build a feature from a geometry value and its attributes. Rows without a
/// geometry, or whose geometry fails to decode, are dropped.
pub fn build_feature(
    geometry: Option<&[u8]>,
    properties: Vec<(String, AttributeValue)>,
    decoder: &dyn NativeGeometryDecoder,
) -> Option<Feature> {
    let Some(bytes) = geometry else {
        debug!("Dropping row without geometry");
        return None;
    };

    match decoder.decode(bytes) {
        Ok((_, geometry)) => Some(Feature {
            geometry,
            properties,
        }),
        Err(e) => {
            debug!(error = %e, "Dropping row with undecodable geometry");
            None
        }
    }
}

fn decode_attribute(row: &PgRow, index: usize, type_name: &str) -> AttributeValue {
    let value = match type_name.to_ascii_lowercase().as_str() {
        "bool" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map(AttributeValue::Bool)),
        "int2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map(|n| AttributeValue::Int(n.into()))),
        "int4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map(|n| AttributeValue::Int(n.into()))),
        "int8" => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map(AttributeValue::Int)),
        "float4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(AttributeValue::Float)),
        "float8" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map(AttributeValue::Double)),
        _ => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map(AttributeValue::String)),
    };

    match value {
        Ok(value) => value.into(),
        Err(e) => {
            debug!(column = index, type_name, error = %e, "Attribute decode failed, using null");
            AttributeValue::Null
        }
    }
}

/// Decode one result row. The first `geometry`/`geography` column is the
/// feature geometry; all other columns become attributes in column order.
pub fn decode_row(row: &PgRow, decoder: &dyn NativeGeometryDecoder) -> Option<Feature> {
    let mut geometry: Option<&[u8]> = None;
    let mut seen_geometry = false;
    let mut properties = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        if GeometryKind::from_type_name(type_name).is_some() {
            if seen_geometry {
                continue;
            }
            seen_geometry = true;
            geometry = match row.try_get_raw(index) {
                Ok(raw) if !raw.is_null() => raw.as_bytes().ok(),
                _ => None,
            };
        } else {
            properties.push((
                column.name().to_string(),
                decode_attribute(row, index, type_name),
            ));
        }
    }

    build_feature(geometry, properties, decoder)
}
