//! Tile coordinate and bounds tests.

use tile_common::{
    buffered_tile_bounds, tile_bounds, tile_to_lonlat, BoundingBox, TileBufferConfig, TileCoord,
    EPSG_4326,
};

const MAX_LAT: f64 = 85.05112878;

fn assert_bounds(actual: BoundingBox, min_x: f64, max_x: f64, min_y: f64, max_y: f64) {
    let eps = 1e-7;
    assert!((actual.min_x - min_x).abs() < eps, "min_x {} != {}", actual.min_x, min_x);
    assert!((actual.max_x - max_x).abs() < eps, "max_x {} != {}", actual.max_x, max_x);
    assert!((actual.min_y - min_y).abs() < eps, "min_y {} != {}", actual.min_y, min_y);
    assert!((actual.max_y - max_y).abs() < eps, "max_y {} != {}", actual.max_y, max_y);
}

// ============================================================================
// tile_to_lonlat
// ============================================================================

#[test]
fn test_lonlat_center_of_zoom_2() {
    let (lon, lat) = tile_to_lonlat(2, 2, 2);
    assert!(lon.abs() < 1e-12);
    assert!(lat.abs() < 1e-12);
}

#[test]
fn test_lonlat_world_corner() {
    let (lon, lat) = tile_to_lonlat(0, 0, 0);
    assert_eq!(lon, -180.0);
    assert!((lat - MAX_LAT).abs() < 1e-7);
}

// ============================================================================
// tile_bounds
// ============================================================================

#[test]
fn test_bounds_world_tile() {
    let bounds = tile_bounds(&TileCoord::new(0, 0, 0));
    assert_bounds(bounds, -180.0, 180.0, -MAX_LAT, MAX_LAT);
    assert_eq!(bounds.srid, EPSG_4326);
}

#[test]
fn test_bounds_zoom_1_south_east() {
    let bounds = tile_bounds(&TileCoord::new(1, 1, 1));
    assert_bounds(bounds, 0.0, 180.0, -MAX_LAT, 0.0);
}

#[test]
fn test_bounds_zoom_1_north_west() {
    let bounds = tile_bounds(&TileCoord::new(1, 0, 0));
    assert_bounds(bounds, -180.0, 0.0, 0.0, MAX_LAT);
}

#[test]
fn test_bounds_are_valid_at_every_zoom() {
    for z in 0..=20 {
        let n = 1u32 << z;
        for coord in [
            TileCoord::new(z, 0, 0),
            TileCoord::new(z, n - 1, n - 1),
            TileCoord::new(z, n / 2, n / 3),
        ] {
            let bounds = tile_bounds(&coord);
            assert!(bounds.is_valid(), "invalid bounds for {}", coord);
        }
    }
}

#[test]
fn test_neighbouring_tiles_share_edges() {
    let left = tile_bounds(&TileCoord::new(4, 6, 9));
    let right = tile_bounds(&TileCoord::new(4, 7, 9));
    let below = tile_bounds(&TileCoord::new(4, 6, 10));
    assert_eq!(left.max_x, right.min_x);
    assert_eq!(left.min_y, below.max_y);
}

// ============================================================================
// buffered_tile_bounds
// ============================================================================

#[test]
fn test_buffer_contains_tile() {
    let coord = TileCoord::new(8, 130, 90);
    let exact = tile_bounds(&coord);
    let buffered = buffered_tile_bounds(&coord, 4096, 256);
    assert!(buffered.strictly_contains(&exact));
}

#[test]
fn test_buffer_grows_by_fraction_of_extent() {
    let coord = TileCoord::new(3, 4, 2);
    let exact = tile_bounds(&coord);
    let buffered = buffered_tile_bounds(&coord, 4096, 256);

    let expected_dx = exact.width() * 256.0 / 4096.0;
    let expected_dy = exact.height() * 256.0 / 4096.0;
    assert!((exact.min_x - buffered.min_x - expected_dx).abs() < 1e-9);
    assert!((buffered.max_x - exact.max_x - expected_dx).abs() < 1e-9);
    assert!((exact.min_y - buffered.min_y - expected_dy).abs() < 1e-9);
    assert!((buffered.max_y - exact.max_y - expected_dy).abs() < 1e-9);
}

#[test]
fn test_zero_buffer_returns_exact_bounds() {
    let coord = TileCoord::new(12, 2200, 1343);
    assert_eq!(buffered_tile_bounds(&coord, 4096, 0), tile_bounds(&coord));
    assert_eq!(
        TileBufferConfig::new(4096, 0).buffered_bounds(&coord),
        tile_bounds(&coord)
    );
}

#[test]
fn test_default_buffer_config() {
    let config = TileBufferConfig::default();
    assert_eq!(config.extent, 4096);
    assert_eq!(config.buffer, 256);
}
