//! Spatial reference identifiers and spherical Mercator helpers.

/// Numeric spatial reference id as stored alongside geometries (EPSG code).
pub type Srid = i32;

/// WGS84 geographic, lon/lat in degrees. Tile bounds are produced in this CRS.
pub const EPSG_4326: Srid = 4326;

/// Spherical (Web) Mercator, meters.
pub const EPSG_3857: Srid = 3857;

/// Half the width of the Web Mercator square in meters.
pub const WEB_MERCATOR_MAX_EXTENT: f64 = 20037508.342789244;

/// Latitude where the Web Mercator square ends (atan(sinh(pi))).
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.0511287798066;

const EARTH_RADIUS: f64 = 6378137.0;

/// Project lon/lat degrees to Web Mercator meters. Latitude is clamped to the
/// Mercator square.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Inverse of [`lonlat_to_mercator`].
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Format an id the way it appears in logs and listings.
pub fn srid_label(srid: Srid) -> String {
    format!("EPSG:{}", srid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercator_extent() {
        let (x, y) = lonlat_to_mercator(180.0, WEB_MERCATOR_MAX_LAT);
        assert!((x - WEB_MERCATOR_MAX_EXTENT).abs() < 1e-6);
        assert!((y - WEB_MERCATOR_MAX_EXTENT).abs() < 1e-3);
    }

    #[test]
    fn test_mercator_inverse() {
        let (x, y) = lonlat_to_mercator(13.4, 52.5);
        let (lon, lat) = mercator_to_lonlat(x, y);
        assert!((lon - 13.4).abs() < 1e-9);
        assert!((lat - 52.5).abs() < 1e-9);
    }

    #[test]
    fn test_label() {
        assert_eq!(srid_label(EPSG_3857), "EPSG:3857");
    }
}
