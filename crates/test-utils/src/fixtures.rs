//! Common test fixtures.

use geo::{line_string, point, polygon, Geometry, LineString, MultiPolygon, Polygon};
use tile_common::{
    AttributeValue, ColumnInfo, Feature, GeometryKind, HealthLevel, LayerDescriptor, ObjectKind,
};

/// CRS definitions in the registry's CSV format: WGS84, Web Mercator and
/// UTM zone 33N.
pub const SRID_CSV: &str = "auth_name,auth_srid,proj4text
EPSG,4326,+proj=longlat +datum=WGS84 +no_defs
EPSG,3857,+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs
EPSG,32633,+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs
";

/// Common bounding box definitions as (min_x, min_y, max_x, max_y).
pub mod bbox {
    /// World in geographic degrees, clamped to the Mercator square
    pub const WORLD: (f64, f64, f64, f64) = (-180.0, -85.0511287798066, 180.0, 85.0511287798066);

    /// A small box in central Europe inside UTM zone 33N
    pub const CENTRAL_EUROPE: (f64, f64, f64, f64) = (12.0, 48.0, 16.0, 52.0);
}

/// Axis-aligned square polygon, counter-clockwise in lon/lat.
pub fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: min_x + size, y: min_y),
        (x: min_x + size, y: min_y + size),
        (x: min_x, y: min_y + size),
        (x: min_x, y: min_y),
    ]
}

/// A square with a square hole in the middle.
pub fn square_with_hole(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
    let outer = square(min_x, min_y, size);
    let q = size / 4.0;
    let hole: LineString<f64> = line_string![
        (x: min_x + q, y: min_y + q),
        (x: min_x + q, y: min_y + 3.0 * q),
        (x: min_x + 3.0 * q, y: min_y + 3.0 * q),
        (x: min_x + 3.0 * q, y: min_y + q),
        (x: min_x + q, y: min_y + q),
    ];
    Polygon::new(outer.exterior().clone(), vec![hole])
}

/// Diagonal line from `(x0, y0)` to `(x1, y1)`.
pub fn segment(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
    line_string![(x: x0, y: y0), (x: x1, y: y1)]
}

pub fn sample_point() -> Geometry<f64> {
    Geometry::Point(point!(x: 1.0, y: 1.0))
}

pub fn sample_multipolygon() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(2.0, 2.0, 1.0)])
}

/// A feature with an id, a name and a null attribute.
pub fn sample_feature(geometry: Geometry<f64>, id: i64) -> Feature {
    Feature::new(geometry)
        .with_property("id", AttributeValue::Int(id))
        .with_property("name", AttributeValue::String(format!("feature-{}", id)))
        .with_property("note", AttributeValue::Null)
}

/// A healthy, indexed table layer.
pub fn sample_layer(name: &str, srid: i32) -> LayerDescriptor {
    let mut layer = LayerDescriptor::new(name, ObjectKind::Table, "geom", GeometryKind::Planar);
    layer.apply_srids(&[srid]);
    layer.apply_spatial_index(true);
    layer.columns = vec![
        ColumnInfo {
            name: "id".to_string(),
            data_type: "int8".to_string(),
        },
        ColumnInfo {
            name: "name".to_string(),
            data_type: "text".to_string(),
        },
    ];
    layer
}

/// A layer whose geometry column mixes srids.
pub fn unhealthy_layer(name: &str) -> LayerDescriptor {
    let mut layer = LayerDescriptor::new(name, ObjectKind::View, "geom", GeometryKind::Planar);
    layer.apply_srids(&[4326, 3857]);
    layer.apply_spatial_index(true);
    debug_assert_eq!(layer.health, HealthLevel::Unhealthy);
    layer
}
