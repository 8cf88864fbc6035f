//! Mapbox Vector Tile encoding.
//!
//! Features arrive in EPSG:4326 and are placed on the tile's integer grid
//! through spherical Mercator, so tile pixels line up with the slippy-map
//! grid. Geometry is written as zig-zag delta commands (MoveTo, LineTo,
//! ClosePath) with a cursor shared by all parts of a feature.
//!
//! Reference: <https://github.com/mapbox/vector-tile-spec/tree/master/2.1>

use std::collections::HashMap;

use geo::{Coord, Geometry, LineString, Polygon};
use prost::Message;
use tile_common::{
    lonlat_to_mercator, AttributeValue, Feature, TileCoord, DEFAULT_EXTENT,
    WEB_MERCATOR_MAX_EXTENT,
};
use tracing::debug;

use crate::error::{EncodeError, EncodeResult};
use crate::vector_tile::tile::{self, GeomType, Layer, Value};
use crate::vector_tile::Tile;

/// Lines shorter than this many tile units are dropped.
pub const DEFAULT_MIN_LINEAL_EXTENT: f64 = 1.0;

/// Rings with less area than this, in square tile units, are dropped.
pub const DEFAULT_MIN_POLYGONAL_EXTENT: f64 = 2.0;

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

const MVT_VERSION: u32 = 2;

#[inline]
pub fn zigzag_encode(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub fn command_encode(command_id: u32, count: u32) -> u32 {
    (command_id & 0x7) | (count << 3)
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    pub extent: u32,
    pub min_lineal_extent: f64,
    pub min_polygonal_extent: f64,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            extent: DEFAULT_EXTENT,
            min_lineal_extent: DEFAULT_MIN_LINEAL_EXTENT,
            min_polygonal_extent: DEFAULT_MIN_POLYGONAL_EXTENT,
        }
    }
}

impl EncodeOptions {
    pub fn new(extent: u32) -> EncodeResult<Self> {
        if extent == 0 {
            return Err(EncodeError::InvalidExtent(extent));
        }
        Ok(Self {
            extent,
            ..Self::default()
        })
    }

    pub fn with_min_extents(mut self, lineal: f64, polygonal: f64) -> Self {
        self.min_lineal_extent = lineal;
        self.min_polygonal_extent = polygonal;
        self
    }
}

/// Maps lon/lat degrees onto the integer grid of one tile.
///
/// (0, 0) is the tile's top-left corner and `extent` its bottom-right;
/// geometry inside the buffer lands slightly outside that range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileTransform {
    origin_x: f64,
    origin_y: f64,
    scale: f64,
}

impl TileTransform {
    pub fn new(coord: &TileCoord, extent: u32) -> Self {
        let tile_size = 2.0 * WEB_MERCATOR_MAX_EXTENT / 2f64.powi(coord.z as i32);
        Self {
            origin_x: -WEB_MERCATOR_MAX_EXTENT + coord.x as f64 * tile_size,
            origin_y: WEB_MERCATOR_MAX_EXTENT - coord.y as f64 * tile_size,
            scale: extent as f64 / tile_size,
        }
    }

    pub fn to_tile(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (mx, my) = lonlat_to_mercator(lon, lat);
        (
            ((mx - self.origin_x) * self.scale).round() as i32,
            ((self.origin_y - my) * self.scale).round() as i32,
        )
    }

    fn project_path(&self, coords: &[Coord<f64>]) -> Vec<(i32, i32)> {
        let mut points: Vec<(i32, i32)> = Vec::with_capacity(coords.len());
        for c in coords {
            let p = self.to_tile(c.x, c.y);
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        points
    }
}

/// Command stream for one feature. The cursor carries across parts.
#[derive(Default)]
struct CommandWriter {
    commands: Vec<u32>,
    cursor: (i32, i32),
}

impl CommandWriter {
    fn push_delta(&mut self, (x, y): (i32, i32)) {
        self.commands.push(zigzag_encode(x - self.cursor.0));
        self.commands.push(zigzag_encode(y - self.cursor.1));
        self.cursor = (x, y);
    }

    fn move_to(&mut self, points: &[(i32, i32)]) {
        self.commands
            .push(command_encode(CMD_MOVE_TO, points.len() as u32));
        for &p in points {
            self.push_delta(p);
        }
    }

    fn line_to(&mut self, points: &[(i32, i32)]) {
        self.commands
            .push(command_encode(CMD_LINE_TO, points.len() as u32));
        for &p in points {
            self.push_delta(p);
        }
    }

    fn close_path(&mut self) {
        self.commands.push(command_encode(CMD_CLOSE_PATH, 1));
    }

    fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn path_length(points: &[(i32, i32)]) -> f64 {
    points
        .windows(2)
        .map(|w| {
            let dx = (w[1].0 - w[0].0) as f64;
            let dy = (w[1].1 - w[0].1) as f64;
            dx.hypot(dy)
        })
        .sum()
}

/// Surveyor's formula in tile space. Positive means clockwise on screen.
fn ring_area(points: &[(i32, i32)]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            x1 as f64 * y2 as f64 - x2 as f64 * y1 as f64
        })
        .sum();
    twice / 2.0
}

fn encode_points(
    points: impl Iterator<Item = Coord<f64>>,
    transform: &TileTransform,
) -> Option<Vec<u32>> {
    let projected: Vec<(i32, i32)> = points.map(|c| transform.to_tile(c.x, c.y)).collect();
    if projected.is_empty() {
        return None;
    }
    let mut writer = CommandWriter::default();
    writer.move_to(&projected);
    Some(writer.commands)
}

fn encode_lines<'a>(
    lines: impl Iterator<Item = &'a LineString<f64>>,
    transform: &TileTransform,
    options: &EncodeOptions,
) -> Option<Vec<u32>> {
    let mut writer = CommandWriter::default();
    for line in lines {
        let points = transform.project_path(&line.0);
        if points.len() < 2 || path_length(&points) < options.min_lineal_extent {
            continue;
        }
        writer.move_to(&points[..1]);
        writer.line_to(&points[1..]);
    }
    (!writer.is_empty()).then_some(writer.commands)
}

/// Project a ring, drop its closing vertex and orient it. `None` if the
/// ring is too small to keep.
fn prepare_ring(
    ring: &LineString<f64>,
    exterior: bool,
    transform: &TileTransform,
    options: &EncodeOptions,
) -> Option<Vec<(i32, i32)>> {
    let mut points = transform.project_path(&ring.0);
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return None;
    }
    let area = ring_area(&points);
    if area.abs() < options.min_polygonal_extent {
        return None;
    }
    if (area > 0.0) != exterior {
        points.reverse();
    }
    Some(points)
}

fn encode_polygons<'a>(
    polygons: impl Iterator<Item = &'a Polygon<f64>>,
    transform: &TileTransform,
    options: &EncodeOptions,
) -> Option<Vec<u32>> {
    let mut writer = CommandWriter::default();
    for polygon in polygons {
        let Some(exterior) = prepare_ring(polygon.exterior(), true, transform, options) else {
            continue;
        };
        let rings = std::iter::once(exterior).chain(
            polygon
                .interiors()
                .iter()
                .filter_map(|ring| prepare_ring(ring, false, transform, options)),
        );
        for ring in rings {
            writer.move_to(&ring[..1]);
            writer.line_to(&ring[1..]);
            writer.close_path();
        }
    }
    (!writer.is_empty()).then_some(writer.commands)
}

/// Encode a single-typed geometry. Collections are split by the caller.
fn encode_geometry(
    geometry: &Geometry<f64>,
    transform: &TileTransform,
    options: &EncodeOptions,
) -> Option<(GeomType, Vec<u32>)> {
    match geometry {
        Geometry::Point(p) => {
            encode_points(std::iter::once(p.0), transform).map(|g| (GeomType::Point, g))
        }
        Geometry::MultiPoint(mp) => {
            encode_points(mp.0.iter().map(|p| p.0), transform).map(|g| (GeomType::Point, g))
        }
        Geometry::Line(line) => {
            let ls = LineString::new(vec![line.start, line.end]);
            encode_lines(std::iter::once(&ls), transform, options)
                .map(|g| (GeomType::Linestring, g))
        }
        Geometry::LineString(ls) => encode_lines(std::iter::once(ls), transform, options)
            .map(|g| (GeomType::Linestring, g)),
        Geometry::MultiLineString(mls) => {
            encode_lines(mls.0.iter(), transform, options).map(|g| (GeomType::Linestring, g))
        }
        Geometry::Polygon(poly) => encode_polygons(std::iter::once(poly), transform, options)
            .map(|g| (GeomType::Polygon, g)),
        Geometry::MultiPolygon(mp) => {
            encode_polygons(mp.0.iter(), transform, options).map(|g| (GeomType::Polygon, g))
        }
        Geometry::Rect(rect) => {
            let poly = rect.to_polygon();
            encode_polygons(std::iter::once(&poly), transform, options)
                .map(|g| (GeomType::Polygon, g))
        }
        Geometry::Triangle(tri) => {
            let poly = tri.to_polygon();
            encode_polygons(std::iter::once(&poly), transform, options)
                .map(|g| (GeomType::Polygon, g))
        }
        Geometry::GeometryCollection(_) => None,
    }
}

/// Hashable identity of a tag value. Floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Bool(bool),
    Int(i64),
    Float(u32),
    Double(u64),
    String(String),
}

fn tag_value(value: &AttributeValue) -> Option<(ValueKey, Value)> {
    let pair = match value {
        AttributeValue::Null => return None,
        AttributeValue::Bool(b) => (
            ValueKey::Bool(*b),
            Value {
                bool_value: Some(*b),
                ..Default::default()
            },
        ),
        AttributeValue::Int(i) => (
            ValueKey::Int(*i),
            Value {
                int_value: Some(*i),
                ..Default::default()
            },
        ),
        AttributeValue::Float(f) => (
            ValueKey::Float(f.to_bits()),
            Value {
                float_value: Some(*f),
                ..Default::default()
            },
        ),
        AttributeValue::Double(d) => (
            ValueKey::Double(d.to_bits()),
            Value {
                double_value: Some(*d),
                ..Default::default()
            },
        ),
        AttributeValue::String(s) => (
            ValueKey::String(s.clone()),
            Value {
                string_value: Some(s.clone()),
                ..Default::default()
            },
        ),
    };
    Some(pair)
}

/// Accumulates features of one named layer with deduplicated keys and values.
pub struct LayerBuilder {
    name: String,
    options: EncodeOptions,
    features: Vec<tile::Feature>,
    keys: Vec<String>,
    key_index: HashMap<String, u32>,
    values: Vec<Value>,
    value_index: HashMap<ValueKey, u32>,
}

impl LayerBuilder {
    pub fn new(name: impl Into<String>, options: EncodeOptions) -> Self {
        Self {
            name: name.into(),
            options,
            features: Vec::new(),
            keys: Vec::new(),
            key_index: HashMap::new(),
            values: Vec::new(),
            value_index: HashMap::new(),
        }
    }

    fn key(&mut self, key: &str) -> u32 {
        if let Some(&idx) = self.key_index.get(key) {
            return idx;
        }
        let idx = self.keys.len() as u32;
        self.keys.push(key.to_string());
        self.key_index.insert(key.to_string(), idx);
        idx
    }

    fn value(&mut self, key: ValueKey, value: Value) -> u32 {
        if let Some(&idx) = self.value_index.get(&key) {
            return idx;
        }
        let idx = self.values.len() as u32;
        self.values.push(value);
        self.value_index.insert(key, idx);
        idx
    }

    fn tags(&mut self, properties: &[(String, AttributeValue)]) -> Vec<u32> {
        let mut tags = Vec::with_capacity(properties.len() * 2);
        for (name, value) in properties {
            let Some((value_key, value)) = tag_value(value) else {
                continue;
            };
            tags.push(self.key(name));
            tags.push(self.value(value_key, value));
        }
        tags
    }

    /// Add a feature, returning how many MVT features it produced.
    ///
    /// A geometry collection becomes one MVT feature per surviving member,
    /// all sharing the same tags. Geometry that falls below the minimum
    /// extents produces nothing.
    pub fn add_feature(&mut self, feature: &Feature, transform: &TileTransform) -> usize {
        let mut encoded = Vec::new();
        collect_geometries(&feature.geometry, transform, &self.options, &mut encoded);
        if encoded.is_empty() {
            return 0;
        }

        let tags = self.tags(&feature.properties);
        let count = encoded.len();
        for (geom_type, geometry) in encoded {
            self.features.push(tile::Feature {
                id: None,
                tags: tags.clone(),
                r#type: Some(geom_type as i32),
                geometry,
            });
        }
        count
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn build(self) -> Layer {
        Layer {
            version: MVT_VERSION,
            name: self.name,
            features: self.features,
            keys: self.keys,
            values: self.values,
            extent: Some(self.options.extent),
        }
    }
}

fn collect_geometries(
    geometry: &Geometry<f64>,
    transform: &TileTransform,
    options: &EncodeOptions,
    out: &mut Vec<(GeomType, Vec<u32>)>,
) {
    match geometry {
        Geometry::GeometryCollection(gc) => {
            for member in &gc.0 {
                collect_geometries(member, transform, options, out);
            }
        }
        other => out.extend(encode_geometry(other, transform, options)),
    }
}

/// Assembles layers into a tile.
#[derive(Default)]
pub struct TileBuilder {
    layers: Vec<Layer>,
}

impl TileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn build(self) -> Tile {
        Tile {
            layers: self.layers,
        }
    }

    /// Serialize to protobuf bytes.
    pub fn encode(self) -> Vec<u8> {
        self.build().encode_to_vec()
    }
}

/// Encode one layer's features for `coord` into serialized MVT bytes.
///
/// A layer left without features is omitted, giving an empty tile.
pub fn encode_layer(
    name: &str,
    features: &[Feature],
    coord: &TileCoord,
    options: &EncodeOptions,
) -> Vec<u8> {
    let transform = TileTransform::new(coord, options.extent);
    let mut layer = LayerBuilder::new(name, *options);
    for feature in features {
        layer.add_feature(feature, &transform);
    }

    debug!(
        layer = name,
        tile = %coord,
        input = features.len(),
        encoded = layer.len(),
        "Encoded layer"
    );

    let mut tile = TileBuilder::new();
    if !layer.is_empty() {
        tile.add_layer(layer.build());
    }
    tile.encode()
}

/// Parse serialized (uncompressed) MVT bytes.
pub fn decode_tile(bytes: &[u8]) -> EncodeResult<Tile> {
    Ok(Tile::decode(bytes)?)
}
