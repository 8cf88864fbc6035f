//! Tests for BoundingBox operations.

use tile_common::{BoundingBox, EPSG_3857, EPSG_4326};

#[test]
fn test_bbox_new_defaults_to_geographic() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
    assert_eq!(bbox.srid, EPSG_4326);
    assert_eq!(bbox.width(), 360.0);
    assert_eq!(bbox.height(), 180.0);
}

#[test]
fn test_with_srid_keeps_corners() {
    let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0).with_srid(EPSG_3857);
    assert_eq!(bbox.srid, EPSG_3857);
    assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (1.0, 2.0, 3.0, 4.0));
}

#[test]
fn test_is_valid() {
    assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_valid());
    assert!(!BoundingBox::new(1.0, 0.0, 1.0, 1.0).is_valid());
    assert!(!BoundingBox::new(0.0, 2.0, 1.0, 1.0).is_valid());
}

#[test]
fn test_contains_point_includes_edges() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(0.0, 0.0));
    assert!(bbox.contains_point(10.0, 5.0));
    assert!(!bbox.contains_point(10.1, 5.0));
}

#[test]
fn test_touching_boxes_do_not_intersect() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    assert!(!a.intersects(&b));
}

#[test]
fn test_sample_points_cover_corners_and_midpoints() {
    let points = BoundingBox::new(0.0, 0.0, 4.0, 2.0).sample_points();
    assert!(points.contains(&(0.0, 0.0)));
    assert!(points.contains(&(4.0, 2.0)));
    assert!(points.contains(&(2.0, 0.0)));
    assert!(points.contains(&(0.0, 1.0)));
}

#[test]
fn test_to_polygon_is_closed() {
    let polygon = BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_polygon();
    let ring = &polygon.exterior().0;
    assert_eq!(ring.len(), 5);
    assert_eq!(ring.first(), ring.last());
}
