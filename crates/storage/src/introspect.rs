//! Schema introspection: where the spatial columns are.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tile_common::{ColumnInfo, ObjectKind};

use crate::query::quote_ident;
use crate::StorageResult;

/// A `geometry` or `geography` column on a table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialColumn {
    pub table: String,
    pub column: String,
    /// `geometry` or `geography`
    pub type_name: String,
    pub object_kind: ObjectKind,
}

/// Queries the store's catalog. Implemented over `sqlx` for PostGIS and by
/// in-memory fakes in tests.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Spatial columns in discovery order (table name, then column position).
    async fn spatial_columns(&self) -> StorageResult<Vec<SpatialColumn>>;

    /// Distinct srids among non-null values of a column, ascending.
    async fn distinct_srids(&self, table: &str, column: &str) -> StorageResult<Vec<i32>>;

    /// `(table, column)` pairs covered by a spatial index.
    async fn spatially_indexed_columns(&self) -> StorageResult<HashSet<(String, String)>>;

    /// Non-spatial columns of a table in column order.
    async fn attribute_columns(&self, table: &str) -> StorageResult<Vec<ColumnInfo>>;
}

/// Introspects one schema of a PostGIS database.
#[derive(Clone)]
pub struct PgIntrospector {
    pool: PgPool,
    schema: String,
}

impl PgIntrospector {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

#[derive(FromRow)]
struct SpatialColumnRow {
    table_name: String,
    column_name: String,
    type_name: String,
    relkind: String,
}

#[derive(FromRow)]
struct SridRow {
    srid: Option<i32>,
}

#[derive(FromRow)]
struct IndexedColumnRow {
    table_name: String,
    column_name: String,
}

#[derive(FromRow)]
struct AttributeRow {
    column_name: String,
    data_type: String,
}

const SPATIAL_COLUMNS_SQL: &str = r#"
    SELECT c.relname::text AS table_name,
           a.attname::text AS column_name,
           t.typname::text AS type_name,
           c.relkind::text AS relkind
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
    WHERE n.nspname = $1
      AND c.relkind IN ('r', 'p', 'v', 'm')
      AND a.attnum > 0
      AND NOT a.attisdropped
      AND t.typname IN ('geometry', 'geography')
    ORDER BY c.relname, a.attnum
"#;

const INDEXED_COLUMNS_SQL: &str = r#"
    SELECT DISTINCT c.relname::text AS table_name,
                    a.attname::text AS column_name
    FROM pg_catalog.pg_index i
    JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_class ic ON ic.oid = i.indexrelid
    JOIN pg_catalog.pg_am am ON am.oid = ic.relam
    JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey)
    WHERE n.nspname = $1
      AND am.amname IN ('gist', 'spgist', 'brin')
"#;

const ATTRIBUTE_COLUMNS_SQL: &str = r#"
    SELECT a.attname::text AS column_name,
           t.typname::text AS data_type
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
    WHERE n.nspname = $1
      AND c.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
      AND t.typname NOT IN ('geometry', 'geography')
    ORDER BY a.attnum
"#;

#[async_trait]
impl SchemaIntrospector for PgIntrospector {
    async fn spatial_columns(&self) -> StorageResult<Vec<SpatialColumn>> {
        let rows = sqlx::query_as::<_, SpatialColumnRow>(SPATIAL_COLUMNS_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                ObjectKind::from_relkind(&row.relkind).map(|object_kind| SpatialColumn {
                    table: row.table_name,
                    column: row.column_name,
                    type_name: row.type_name,
                    object_kind,
                })
            })
            .collect())
    }

    async fn distinct_srids(&self, table: &str, column: &str) -> StorageResult<Vec<i32>> {
        let column = quote_ident(column);
        let sql = format!(
            "SELECT DISTINCT ST_SRID({col}::geometry) AS srid FROM {schema}.{table} \
             WHERE {col} IS NOT NULL ORDER BY srid",
            col = column,
            schema = quote_ident(&self.schema),
            table = quote_ident(table),
        );

        let rows = sqlx::query_as::<_, SridRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().filter_map(|row| row.srid).collect())
    }

    async fn spatially_indexed_columns(&self) -> StorageResult<HashSet<(String, String)>> {
        let rows = sqlx::query_as::<_, IndexedColumnRow>(INDEXED_COLUMNS_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.table_name, row.column_name))
            .collect())
    }

    async fn attribute_columns(&self, table: &str) -> StorageResult<Vec<ColumnInfo>> {
        let rows = sqlx::query_as::<_, AttributeRow>(ATTRIBUTE_COLUMNS_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ColumnInfo {
                name: row.column_name,
                data_type: row.data_type,
            })
            .collect())
    }
}
