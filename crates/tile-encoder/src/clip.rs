//! Clipping and precision reduction of feature geometries.
//!
//! Every non-point geometry is snapped to a decimal grid and intersected
//! with the buffered tile box before encoding. Snapping removes floating
//! noise that otherwise makes the boolean operations produce slivers or
//! fail on nearly coincident edges; it is not a simplification.

use geo::{
    BooleanOps, Coord, Geometry, GeometryCollection, LineString, MapCoords, MultiLineString,
    MultiPolygon, Polygon,
};
use tile_common::{BoundingBox, Feature};
use tracing::debug;

use crate::error::{EncodeError, EncodeResult};

/// Decimal places kept by the default grid.
pub const DEFAULT_PRECISION_DECIMALS: u32 = 7;

/// Beyond this the grid spacing falls below f64 resolution for world-scale values.
pub const MAX_PRECISION_DECIMALS: u32 = 12;

/// How a geometry is treated by the clipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStrategy {
    /// Points and multi-points pass through untouched.
    Skip,
    Lineal,
    Polygonal,
    /// Each member is clipped according to its own kind.
    Collection,
}

pub fn classify(geometry: &Geometry<f64>) -> ClipStrategy {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => ClipStrategy::Skip,
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
            ClipStrategy::Lineal
        }
        Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => ClipStrategy::Polygonal,
        Geometry::GeometryCollection(_) => ClipStrategy::Collection,
    }
}

/// A fixed decimal grid that coordinates are rounded onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionGrid {
    decimals: u32,
    scale: f64,
}

impl PrecisionGrid {
    pub fn new(decimals: u32) -> EncodeResult<Self> {
        if decimals > MAX_PRECISION_DECIMALS {
            return Err(EncodeError::InvalidPrecision(decimals));
        }
        Ok(Self {
            decimals,
            scale: 10f64.powi(decimals as i32),
        })
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn snap(&self, value: f64) -> f64 {
        (value * self.scale).round() / self.scale
    }

    pub fn snap_coord(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.snap(coord.x),
            y: self.snap(coord.y),
        }
    }

    pub fn snap_geometry(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        geometry.map_coords(|coord| self.snap_coord(coord))
    }

    pub fn snap_bbox(&self, bbox: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.snap(bbox.min_x),
            min_y: self.snap(bbox.min_y),
            max_x: self.snap(bbox.max_x),
            max_y: self.snap(bbox.max_y),
            srid: bbox.srid,
        }
    }
}

impl Default for PrecisionGrid {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_PRECISION_DECIMALS,
            scale: 10f64.powi(DEFAULT_PRECISION_DECIMALS as i32),
        }
    }
}

/// Intersect a geometry with the clip polygon.
///
/// Returns `None` when nothing of the geometry remains. Points are returned
/// unchanged whether or not they fall inside `clip`.
pub fn clip_geometry(geometry: &Geometry<f64>, clip: &Polygon<f64>) -> Option<Geometry<f64>> {
    match classify(geometry) {
        ClipStrategy::Skip => Some(geometry.clone()),
        ClipStrategy::Lineal => clip_lineal(&lineal_parts(geometry), clip),
        ClipStrategy::Polygonal => clip_polygonal(&polygonal_parts(geometry), clip),
        ClipStrategy::Collection => clip_collection(geometry, clip),
    }
}

/// Snap and clip every feature to `bounds`, dropping those left empty.
///
/// `bounds` must be in the same reference system as the feature geometries.
pub fn clip_features(
    features: Vec<Feature>,
    bounds: &BoundingBox,
    grid: &PrecisionGrid,
) -> Vec<Feature> {
    let clip = grid.snap_bbox(bounds).to_polygon();
    let input = features.len();

    let clipped: Vec<Feature> = features
        .into_iter()
        .filter_map(|mut feature| {
            if classify(&feature.geometry) == ClipStrategy::Skip {
                return Some(feature);
            }
            let snapped = grid.snap_geometry(&feature.geometry);
            feature.geometry = clip_geometry(&snapped, &clip)?;
            Some(feature)
        })
        .collect();

    if clipped.len() < input {
        debug!(
            input = input,
            kept = clipped.len(),
            "Dropped features left empty by clipping"
        );
    }
    clipped
}

fn lineal_parts(geometry: &Geometry<f64>) -> MultiLineString<f64> {
    match geometry {
        Geometry::Line(line) => {
            MultiLineString::new(vec![LineString::new(vec![line.start, line.end])])
        }
        Geometry::LineString(ls) => MultiLineString::new(vec![ls.clone()]),
        Geometry::MultiLineString(mls) => mls.clone(),
        _ => MultiLineString::new(Vec::new()),
    }
}

fn polygonal_parts(geometry: &Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Polygon(poly) => MultiPolygon::new(vec![poly.clone()]),
        Geometry::MultiPolygon(mp) => mp.clone(),
        Geometry::Rect(rect) => MultiPolygon::new(vec![rect.to_polygon()]),
        Geometry::Triangle(tri) => MultiPolygon::new(vec![tri.to_polygon()]),
        _ => MultiPolygon::new(Vec::new()),
    }
}

fn clip_lineal(lines: &MultiLineString<f64>, clip: &Polygon<f64>) -> Option<Geometry<f64>> {
    let mut parts: Vec<LineString<f64>> = clip
        .clip(lines, false)
        .0
        .into_iter()
        .filter(|ls| ls.0.len() >= 2)
        .collect();

    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(MultiLineString::new(parts))),
    }
}

fn clip_polygonal(polygons: &MultiPolygon<f64>, clip: &Polygon<f64>) -> Option<Geometry<f64>> {
    let mut parts: Vec<Polygon<f64>> = polygons
        .intersection(clip)
        .0
        .into_iter()
        .filter(|poly| poly.exterior().0.len() >= 4)
        .collect();

    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon::new(parts))),
    }
}

fn clip_collection(geometry: &Geometry<f64>, clip: &Polygon<f64>) -> Option<Geometry<f64>> {
    let Geometry::GeometryCollection(collection) = geometry else {
        return None;
    };
    let parts: Vec<Geometry<f64>> = collection
        .0
        .iter()
        .filter_map(|member| clip_geometry(member, clip))
        .collect();

    (!parts.is_empty()).then(|| Geometry::GeometryCollection(GeometryCollection(parts)))
}
