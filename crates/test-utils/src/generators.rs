//! Builders for WKB and PostGIS EWKB byte strings.
//!
//! Geometry columns come back from PostGIS as EWKB: ordinary WKB with flag
//! bits in the type word for an embedded srid and Z/M ordinates. These
//! helpers produce both forms so decoders can be tested without a database.

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Byte order marker for generated WKB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WkbOrder {
    BigEndian,
    LittleEndian,
}

/// Incremental WKB writer.
#[derive(Debug, Clone)]
pub struct WkbWriter {
    buf: Vec<u8>,
    order: WkbOrder,
}

impl WkbWriter {
    pub fn new(order: WkbOrder) -> Self {
        Self {
            buf: Vec::new(),
            order,
        }
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        match self.order {
            WkbOrder::BigEndian => self.buf.extend_from_slice(&value.to_be_bytes()),
            WkbOrder::LittleEndian => self.buf.extend_from_slice(&value.to_le_bytes()),
        }
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        match self.order {
            WkbOrder::BigEndian => self.buf.extend_from_slice(&value.to_be_bytes()),
            WkbOrder::LittleEndian => self.buf.extend_from_slice(&value.to_le_bytes()),
        }
        self
    }

    /// Byte order marker, type word (with EWKB flags) and optional srid.
    pub fn header(&mut self, type_id: u32, srid: Option<i32>, with_z: bool) -> &mut Self {
        self.buf.push(match self.order {
            WkbOrder::BigEndian => 0,
            WkbOrder::LittleEndian => 1,
        });
        let mut word = type_id;
        if srid.is_some() {
            word |= EWKB_SRID;
        }
        if with_z {
            word |= EWKB_Z;
        }
        self.u32(word);
        if let Some(srid) = srid {
            self.u32(srid as u32);
        }
        self
    }

    pub fn coords(&mut self, coords: &[(f64, f64)], z: Option<f64>) -> &mut Self {
        self.u32(coords.len() as u32);
        for &(x, y) in coords {
            self.f64(x).f64(y);
            if let Some(z) = z {
                self.f64(z);
            }
        }
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Little-endian 2D point.
pub fn wkb_point(x: f64, y: f64) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(1, None, false).f64(x).f64(y);
    w.finish()
}

/// Big-endian 2D point.
pub fn wkb_point_be(x: f64, y: f64) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::BigEndian);
    w.header(1, None, false).f64(x).f64(y);
    w.finish()
}

/// Point with NaN coordinates, how empty points are written.
pub fn wkb_empty_point() -> Vec<u8> {
    wkb_point(f64::NAN, f64::NAN)
}

pub fn ewkb_point(srid: i32, x: f64, y: f64) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(1, Some(srid), false).f64(x).f64(y);
    w.finish()
}

/// EWKB point with a Z ordinate.
pub fn ewkb_point_z(srid: i32, x: f64, y: f64, z: f64) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(1, Some(srid), true).f64(x).f64(y).f64(z);
    w.finish()
}

pub fn wkb_linestring(coords: &[(f64, f64)]) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(2, None, false).coords(coords, None);
    w.finish()
}

pub fn ewkb_linestring_z(srid: i32, coords: &[(f64, f64)], z: f64) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(2, Some(srid), true).coords(coords, Some(z));
    w.finish()
}

pub fn wkb_polygon(rings: &[&[(f64, f64)]]) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(3, None, false).u32(rings.len() as u32);
    for ring in rings {
        w.coords(ring, None);
    }
    w.finish()
}

pub fn ewkb_polygon(srid: i32, rings: &[&[(f64, f64)]]) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(3, Some(srid), false).u32(rings.len() as u32);
    for ring in rings {
        w.coords(ring, None);
    }
    w.finish()
}

/// Multi-geometry or collection (type 4-7) wrapping already encoded parts.
pub fn wkb_multi(type_id: u32, parts: &[Vec<u8>]) -> Vec<u8> {
    let mut w = WkbWriter::new(WkbOrder::LittleEndian);
    w.header(type_id, None, false).u32(parts.len() as u32);
    for part in parts {
        w.raw(part);
    }
    w.finish()
}

/// Closed square ring, counter-clockwise.
pub fn square_ring(min_x: f64, min_y: f64, size: f64) -> Vec<(f64, f64)> {
    vec![
        (min_x, min_y),
        (min_x + size, min_y),
        (min_x + size, min_y + size),
        (min_x, min_y + size),
        (min_x, min_y),
    ]
}
