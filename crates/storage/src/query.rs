//! Parameterized tile query construction.
//!
//! Identifiers come from the catalog and are quoted; every coordinate and
//! the srid are bound parameters.

use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use tile_common::{BoundingBox, GeometryKind, LayerDescriptor};

use crate::decode::is_native_attribute_type;
use crate::{StorageError, StorageResult};

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A tile query and the values it binds.
///
/// `$1..$4` are the unbuffered bounds (filter), `$5..$8` the buffered bounds
/// (clip) and `$9` the layer srid.
#[derive(Debug, Clone, PartialEq)]
pub struct TileQuery {
    pub sql: String,
    pub bounds: BoundingBox,
    pub buffered: BoundingBox,
    pub srid: i32,
}

impl TileQuery {
    /// Attach the nine bound parameters.
    pub fn bind(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(&self.sql)
            .bind(self.bounds.min_x)
            .bind(self.bounds.min_y)
            .bind(self.bounds.max_x)
            .bind(self.bounds.max_y)
            .bind(self.buffered.min_x)
            .bind(self.buffered.min_y)
            .bind(self.buffered.max_x)
            .bind(self.buffered.max_y)
            .bind(self.srid)
    }
}

/// Build the query for one tile of `layer`. Both boxes must already be in the
/// layer's srid.
pub fn build_tile_query(
    schema: &str,
    layer: &LayerDescriptor,
    bounds: &BoundingBox,
    buffered: &BoundingBox,
) -> StorageResult<TileQuery> {
    let srid = match layer.srid {
        Some(srid) if layer.is_servable() => srid,
        _ => return Err(StorageError::LayerNotServable(layer.name.clone())),
    };

    let geom_column = quote_ident(&layer.geometry_column);
    let geom = match layer.geometry_kind {
        GeometryKind::Planar => geom_column.clone(),
        GeometryKind::Geodetic => format!("{}::geometry", geom_column),
    };

    let mut select = Vec::with_capacity(layer.columns.len() + 1);
    for column in &layer.columns {
        let ident = quote_ident(&column.name);
        if is_native_attribute_type(&column.data_type) {
            select.push(ident);
        } else {
            select.push(format!("{}::text AS {}", ident, ident));
        }
    }
    select.push(format!(
        "ST_Intersection({}, ST_MakeEnvelope($5, $6, $7, $8, $9)) AS {}",
        geom, geom_column
    ));

    let sql = format!(
        "SELECT {} FROM {}.{} WHERE {} && ST_MakeEnvelope($1, $2, $3, $4, $9) \
         AND ST_Intersects({}, ST_MakeEnvelope($1, $2, $3, $4, $9))",
        select.join(", "),
        quote_ident(schema),
        quote_ident(&layer.name),
        geom,
        geom
    );

    Ok(TileQuery {
        sql,
        bounds: *bounds,
        buffered: *buffered,
        srid,
    })
}
