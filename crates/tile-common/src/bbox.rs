//! Bounding box types and operations.

use geo::{coord, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::crs::EPSG_4326;

/// A geographic or projected bounding box tagged with its spatial reference id.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, etc.), coordinates are in the CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub srid: i32,
}

impl BoundingBox {
    /// Create a new EPSG:4326 bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            srid: EPSG_4326,
        }
    }

    /// Same corners, different reference system tag.
    pub fn with_srid(self, srid: i32) -> Self {
        Self { srid, ..self }
    }

    /// Smallest box containing every point. Returns `None` for an empty iterator
    /// or when any coordinate is not finite.
    pub fn from_points<I>(points: I, srid: i32) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bbox = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
            srid,
        };
        for (x, y) in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        let finite = [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
            .iter()
            .all(|v| v.is_finite());
        finite.then_some(bbox)
    }

    /// True when both axes have strictly positive extent.
    pub fn is_valid(&self) -> bool {
        self.min_x < self.max_x && self.min_y < self.max_y
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grow the box by `dx` on the left and right and `dy` on the top and bottom.
    pub fn expand(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
            srid: self.srid,
        }
    }

    /// Pull every edge inside `limits`. The srid is kept.
    pub fn clamp_to(&self, limits: &BoundingBox) -> Self {
        Self {
            min_x: self.min_x.clamp(limits.min_x, limits.max_x),
            min_y: self.min_y.clamp(limits.min_y, limits.max_y),
            max_x: self.max_x.clamp(limits.min_x, limits.max_x),
            max_y: self.max_y.clamp(limits.min_y, limits.max_y),
            srid: self.srid,
        }
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// True when `other` lies inside this box with a margin on all four sides.
    pub fn strictly_contains(&self, other: &BoundingBox) -> bool {
        self.min_x < other.min_x
            && self.min_y < other.min_y
            && self.max_x > other.max_x
            && self.max_y > other.max_y
    }

    /// Corners and edge midpoints, used to project a box between reference systems.
    pub fn sample_points(&self) -> [(f64, f64); 8] {
        let mid_x = (self.min_x + self.max_x) / 2.0;
        let mid_y = (self.min_y + self.max_y) / 2.0;
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
            (mid_x, self.min_y),
            (mid_x, self.max_y),
            (self.min_x, mid_y),
            (self.max_x, mid_y),
        ]
    }

    /// The box as a closed polygon ring.
    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
        .to_polygon()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).expand(1.0, 2.0);
        assert_eq!(bbox.min_x, -1.0);
        assert_eq!(bbox.min_y, -2.0);
        assert_eq!(bbox.max_x, 11.0);
        assert_eq!(bbox.max_y, 12.0);
        assert_eq!(bbox.srid, EPSG_4326);
    }

    #[test]
    fn test_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_clamp_to() {
        let limits = BoundingBox::new(-180.0, -85.0, 180.0, 85.0);
        let clamped = BoundingBox::new(-191.25, -95.6, 11.25, 40.0).clamp_to(&limits);
        assert_eq!(clamped, BoundingBox::new(-180.0, -85.0, 11.25, 40.0));

        let inside = BoundingBox::new(1.0, 2.0, 3.0, 4.0).with_srid(3857);
        assert_eq!(inside.clamp_to(&limits), inside);
    }

    #[test]
    fn test_from_points() {
        let bbox = BoundingBox::from_points(vec![(3.0, -1.0), (-2.0, 4.0), (1.0, 1.0)], 3857)
            .unwrap();
        assert_eq!(bbox, BoundingBox::new(-2.0, -1.0, 3.0, 4.0).with_srid(3857));

        assert!(BoundingBox::from_points(Vec::new(), 4326).is_none());
        assert!(BoundingBox::from_points(vec![(f64::NAN, 0.0)], 4326).is_none());
    }
}
