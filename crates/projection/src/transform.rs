//! Geometry and bounding box reprojection.

use geo::{Coord, Geometry, MapCoords};
use proj4rs::proj::Proj;
use tile_common::BoundingBox;

use crate::{CrsDefinition, CrsRegistry, ProjectionError, ProjectionResult};

/// A geometry together with the srid its coordinates are expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct SridGeometry {
    pub srid: i32,
    pub geometry: Geometry<f64>,
}

impl SridGeometry {
    pub fn new(srid: i32, geometry: Geometry<f64>) -> Self {
        Self { srid, geometry }
    }
}

struct ProjPair {
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

/// Transforms coordinates between two srids from the registry.
///
/// Equal source and target srids build an identity transform that never
/// touches proj4rs.
pub struct Reprojector {
    source_srid: i32,
    target_srid: i32,
    projs: Option<ProjPair>,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("source_srid", &self.source_srid)
            .field("target_srid", &self.target_srid)
            .field("identity", &self.is_identity())
            .finish()
    }
}

fn parse_proj(definition: &CrsDefinition) -> ProjectionResult<Proj> {
    Proj::from_proj_string(&definition.definition).map_err(|e| {
        ProjectionError::InvalidDefinition {
            srid: definition.code,
            reason: format!("{:?}", e),
        }
    })
}

impl Reprojector {
    pub fn new(registry: &CrsRegistry, source_srid: i32, target_srid: i32) -> ProjectionResult<Self> {
        if source_srid == target_srid {
            return Ok(Self {
                source_srid,
                target_srid,
                projs: None,
            });
        }

        let source_def = registry.get(source_srid)?;
        let target_def = registry.get(target_srid)?;

        Ok(Self {
            source_srid,
            target_srid,
            projs: Some(ProjPair {
                source: parse_proj(source_def)?,
                target: parse_proj(target_def)?,
                source_geographic: source_def.is_geographic(),
                target_geographic: target_def.is_geographic(),
            }),
        })
    }

    pub fn source_srid(&self) -> i32 {
        self.source_srid
    }

    pub fn target_srid(&self) -> i32 {
        self.target_srid
    }

    pub fn is_identity(&self) -> bool {
        self.projs.is_none()
    }

    /// Transform a single coordinate. Geographic input and output are in degrees.
    pub fn transform_point(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        let Some(projs) = &self.projs else {
            return Ok((x, y));
        };

        let mut point = if projs.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&projs.source, &projs.target, &mut point).map_err(|e| {
            ProjectionError::TransformFailed {
                source_srid: self.source_srid,
                target_srid: self.target_srid,
                reason: format!("{:?}", e),
            }
        })?;

        let (out_x, out_y) = if projs.target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(ProjectionError::TransformFailed {
                source_srid: self.source_srid,
                target_srid: self.target_srid,
                reason: format!("non-finite result for ({}, {})", x, y),
            });
        }

        Ok((out_x, out_y))
    }

    /// Return a reprojected copy of `input`, tagged with the target srid.
    pub fn transform_geometry(&self, input: &SridGeometry) -> ProjectionResult<SridGeometry> {
        if input.srid != self.source_srid {
            return Err(ProjectionError::SridMismatch {
                expected: self.source_srid,
                actual: input.srid,
            });
        }
        if self.is_identity() {
            return Ok(SridGeometry::new(self.target_srid, input.geometry.clone()));
        }

        let geometry = input.geometry.try_map_coords(|c: Coord<f64>| {
            self.transform_point(c.x, c.y)
                .map(|(x, y)| Coord { x, y })
        })?;

        Ok(SridGeometry::new(self.target_srid, geometry))
    }

    /// Project a box by transforming its corners and edge midpoints and taking
    /// the envelope of the results.
    pub fn transform_bbox(&self, bbox: &BoundingBox) -> ProjectionResult<BoundingBox> {
        if bbox.srid != self.source_srid {
            return Err(ProjectionError::SridMismatch {
                expected: self.source_srid,
                actual: bbox.srid,
            });
        }
        if self.is_identity() {
            return Ok(bbox.with_srid(self.target_srid));
        }

        let projected = bbox
            .sample_points()
            .iter()
            .map(|&(x, y)| self.transform_point(x, y))
            .collect::<ProjectionResult<Vec<_>>>()?;

        BoundingBox::from_points(projected, self.target_srid).ok_or(
            ProjectionError::TransformFailed {
                source_srid: self.source_srid,
                target_srid: self.target_srid,
                reason: "empty bounding box".to_string(),
            },
        )
    }
}

/// Reproject a geometry into `target_srid`, resolving both srids in `registry`.
pub fn transform_geometry(
    registry: &CrsRegistry,
    input: &SridGeometry,
    target_srid: i32,
) -> ProjectionResult<SridGeometry> {
    Reprojector::new(registry, input.srid, target_srid)?.transform_geometry(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    fn registry() -> CrsRegistry {
        let csv = "auth_name,auth_srid,proj4text\n\
EPSG,4326,+proj=longlat +datum=WGS84 +no_defs\n\
EPSG,3857,+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs\n";
        CrsRegistry::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_identity_skips_registry() {
        let empty = CrsRegistry::default();
        let reprojector = Reprojector::new(&empty, 2154, 2154).unwrap();
        assert!(reprojector.is_identity());
        assert_eq!(reprojector.transform_point(1.5, 2.5).unwrap(), (1.5, 2.5));
    }

    #[test]
    fn test_unknown_srid() {
        let err = Reprojector::new(&registry(), 4326, 27700).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownSrid(27700)));
    }

    #[test]
    fn test_geographic_to_mercator() {
        let reprojector = Reprojector::new(&registry(), 4326, 3857).unwrap();
        let (x, y) = reprojector.transform_point(180.0, 0.0).unwrap();
        assert!((x - 20037508.342789244).abs() < 1e-3);
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn test_geometry_input_untouched() {
        let input = SridGeometry::new(4326, Geometry::Point(point!(x: 10.0, y: 20.0)));
        let output = transform_geometry(&registry(), &input, 3857).unwrap();
        assert_eq!(output.srid, 3857);
        assert_eq!(input.geometry, Geometry::Point(point!(x: 10.0, y: 20.0)));
        assert_ne!(output.geometry, input.geometry);
    }

    #[test]
    fn test_srid_mismatch() {
        let reprojector = Reprojector::new(&registry(), 4326, 3857).unwrap();
        let input = SridGeometry::new(3857, Geometry::Point(point!(x: 0.0, y: 0.0)));
        assert!(matches!(
            reprojector.transform_geometry(&input),
            Err(ProjectionError::SridMismatch { expected: 4326, actual: 3857 })
        ));
    }
}
