/*
This code is part of the geocodec library.
License: MIT
*/
use super::feature::{Geometry, PolygonGeometry};
use super::shapefile::geometry::Shape;
use crate::error::{Result, ShapefileError};
use crate::io_utils::Endianness;
use crate::structures::Coordinate;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Read;

const BIG_ENDIAN: u8 = 0;
const LITTLE_ENDIAN: u8 = 1;

// ISO dimension offsets added to the type code
const DIM_OFFSET_Z: u32 = 1000;
const DIM_OFFSET_M: u32 = 2000;
const DIM_OFFSET_ZM: u32 = 3000;

// EWKB (PostGIS) flags in the high bits of the type code
const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z | EWKB_M | EWKB_SRID;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_GEOMETRYCOLLECTION: u32 = 7;

const MAX_NESTING: usize = 32;

/// The shapes a WKB blob decodes to, one per geometry kind it contains.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapePacks {
    pub points: Option<Shape>,
    pub lines: Option<Shape>,
    pub polygons: Option<Shape>,
}

impl ShapePacks {
    pub fn len(&self) -> usize {
        [&self.points, &self.lines, &self.polygons]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_shapes(self) -> Vec<Shape> {
        vec![self.points, self.lines, self.polygons]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Per-kind accumulators that collection members are routed into.
#[derive(Default)]
struct Accumulator {
    points: Vec<Coordinate>,
    lines: Vec<Vec<Coordinate>>,
    polygons: Vec<PolygonGeometry>,
    // the outermost geometry was a single point
    single_point: bool,
}

struct Header {
    code: u32,
    has_z: bool,
    has_m: bool,
}

struct WkbReader<R: Read> {
    inner: R,
    byte_order: Endianness,
}

impl<R: Read> WkbReader<R> {
    fn read_u32(&mut self) -> Result<u32> {
        Ok(match self.byte_order {
            Endianness::LittleEndian => self.inner.read_u32::<LittleEndian>()?,
            Endianness::BigEndian => self.inner.read_u32::<BigEndian>()?,
        })
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(match self.byte_order {
            Endianness::LittleEndian => self.inner.read_f64::<LittleEndian>()?,
            Endianness::BigEndian => self.inner.read_f64::<BigEndian>()?,
        })
    }

    /// Reads the byte-order mark and type code that open every geometry.
    fn read_header(&mut self) -> Result<Header> {
        self.byte_order = match self.inner.read_u8()? {
            BIG_ENDIAN => Endianness::BigEndian,
            LITTLE_ENDIAN => Endianness::LittleEndian,
            other => {
                return Err(ShapefileError::Format(format!(
                    "invalid WKB byte order {}",
                    other
                )))
            }
        };
        let tag = self.read_u32()?;
        let mut has_z = tag & EWKB_Z != 0;
        let mut has_m = tag & EWKB_M != 0;
        if tag & EWKB_SRID != 0 {
            // the SRID is not carried by shapefile geometry
            self.read_u32()?;
        }
        let iso = tag & !EWKB_FLAGS;
        match iso - iso % 1000 {
            0 => {}
            DIM_OFFSET_Z => has_z = true,
            DIM_OFFSET_M => has_m = true,
            DIM_OFFSET_ZM => {
                has_z = true;
                has_m = true;
            }
            _ => {
                return Err(ShapefileError::Format(format!(
                    "unknown WKB geometry type {}",
                    tag
                )))
            }
        }
        Ok(Header {
            code: iso % 1000,
            has_z,
            has_m,
        })
    }

    fn read_coordinate(&mut self, header: &Header) -> Result<Coordinate> {
        let x = self.read_f64()?;
        let y = self.read_f64()?;
        let mut c = Coordinate::new(x, y);
        if header.has_z {
            c.z = Some(self.read_f64()?);
        }
        if header.has_m {
            let m = self.read_f64()?;
            if !m.is_nan() {
                c.m = Some(m);
            }
        }
        Ok(c)
    }

    fn read_coordinates(&mut self, header: &Header) -> Result<Vec<Coordinate>> {
        let n = self.read_u32()? as usize;
        // the count is untrusted, so don't reserve all of it up front
        let mut coords = Vec::with_capacity(n.min(4096));
        for _ in 0..n {
            coords.push(self.read_coordinate(header)?);
        }
        Ok(coords)
    }

    /// Reads one geometry, routing whatever it holds into `acc`. `expected`
    /// restricts the member type inside Multi* containers.
    fn read_geometry(&mut self, acc: &mut Accumulator, expected: Option<u32>, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(ShapefileError::Format(
                "WKB collections are nested too deeply".to_string(),
            ));
        }
        let header = self.read_header()?;
        if let Some(expected) = expected {
            if header.code != expected {
                return Err(ShapefileError::Format(format!(
                    "expected WKB type {} inside a multi-geometry, found {}",
                    expected, header.code
                )));
            }
        }
        if depth == 0 {
            acc.single_point = header.code == WKB_POINT;
        }
        match header.code {
            WKB_POINT => {
                let c = self.read_coordinate(&header)?;
                // an empty point is written as NaN coordinates
                if !(c.x.is_nan() && c.y.is_nan()) {
                    acc.points.push(c);
                }
            }
            WKB_LINESTRING => {
                let line = self.read_coordinates(&header)?;
                if !line.is_empty() {
                    acc.lines.push(line);
                }
            }
            WKB_POLYGON => {
                let num_rings = self.read_u32()? as usize;
                let mut rings = Vec::with_capacity(num_rings.min(256));
                for _ in 0..num_rings {
                    rings.push(self.read_coordinates(&header)?);
                }
                let mut rings = rings.into_iter();
                if let Some(exterior) = rings.next() {
                    if !exterior.is_empty() {
                        acc.polygons.push(PolygonGeometry {
                            exterior,
                            interiors: rings.filter(|r| !r.is_empty()).collect(),
                        });
                    }
                }
            }
            WKB_MULTIPOINT | WKB_MULTILINESTRING | WKB_MULTIPOLYGON | WKB_GEOMETRYCOLLECTION => {
                let member = match header.code {
                    WKB_MULTIPOINT => Some(WKB_POINT),
                    WKB_MULTILINESTRING => Some(WKB_LINESTRING),
                    WKB_MULTIPOLYGON => Some(WKB_POLYGON),
                    _ => None,
                };
                let n = self.read_u32()?;
                for _ in 0..n {
                    self.read_geometry(acc, member, depth + 1)?;
                }
            }
            other => {
                return Err(ShapefileError::Format(format!(
                    "unknown WKB geometry type {}",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// Decodes OGC Well-Known Binary (ISO or EWKB flavour) into shapes.
#[derive(Debug, Default, Copy, Clone)]
pub struct WkbDecoder;

impl WkbDecoder {
    fn accumulate<R: Read>(reader: R) -> Result<Accumulator> {
        let mut reader = WkbReader {
            inner: reader,
            byte_order: Endianness::LittleEndian,
        };
        let mut acc = Accumulator::default();
        reader.read_geometry(&mut acc, None, 0)?;
        Ok(acc)
    }

    /// Decodes a geometry into one shape per kind found. Collections may mix
    /// points, lines and polygons.
    pub fn decode_packs<R: Read>(reader: R) -> Result<ShapePacks> {
        let acc = WkbDecoder::accumulate(reader)?;
        let mut packs = ShapePacks::default();
        if !acc.points.is_empty() {
            let geometry = if acc.single_point && acc.points.len() == 1 {
                Geometry::Point(acc.points[0])
            } else {
                Geometry::MultiPoint(acc.points)
            };
            packs.points = Some(Shape::from_geometry(&geometry)?);
        }
        if !acc.lines.is_empty() {
            packs.lines = Some(Shape::from_geometry(&Geometry::MultiLineString(acc.lines))?);
        }
        if !acc.polygons.is_empty() {
            packs.polygons = Some(Shape::from_geometry(&Geometry::MultiPolygon(acc.polygons))?);
        }
        Ok(packs)
    }

    /// Decodes a geometry of a single kind. Empty geometries give a null shape.
    pub fn decode<R: Read>(reader: R) -> Result<Shape> {
        let packs = WkbDecoder::decode_packs(reader)?;
        if packs.len() > 1 {
            return Err(ShapefileError::NotSupported(
                "WKB collection mixes points, lines and polygons".to_string(),
            ));
        }
        Ok(packs.into_shapes().pop().unwrap_or_else(Shape::null))
    }
}

#[cfg(test)]
mod test {
    use super::WkbDecoder;
    use crate::error::ShapefileError;
    use crate::vector::shapefile::geometry::ShapeType;

    fn le_point(x: f64, y: f64) -> Vec<u8> {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes
    }

    fn le_line(tag: u32, coords: &[f64], dims: usize) -> Vec<u8> {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&tag.to_le_bytes());
        bytes.extend_from_slice(&((coords.len() / dims) as u32).to_le_bytes());
        for v in coords {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_point_both_byte_orders() {
        let shape = WkbDecoder::decode(&le_point(10.0, 20.0)[..]).unwrap();
        assert_eq!(shape.shape_type(), ShapeType::Point);
        assert_eq!(shape.vertices.xy, vec![10.0, 20.0]);

        let mut be = vec![0u8];
        be.extend_from_slice(&1u32.to_be_bytes());
        be.extend_from_slice(&10f64.to_be_bytes());
        be.extend_from_slice(&20f64.to_be_bytes());
        assert_eq!(WkbDecoder::decode(&be[..]).unwrap(), shape);
    }

    #[test]
    fn test_iso_and_ewkb_z() {
        let iso = le_line(1002, &[0.0, 0.0, 5.0, 1.0, 1.0, 6.0], 3);
        let shape = WkbDecoder::decode(&iso[..]).unwrap();
        assert_eq!(shape.shape_type(), ShapeType::PolyLineZ);
        assert_eq!(shape.vertices.z, Some(vec![5.0, 6.0]));

        // EWKB with Z and SRID flags
        let mut ewkb = vec![1u8];
        ewkb.extend_from_slice(&(0x8000_0000u32 | 0x2000_0000 | 2).to_le_bytes());
        ewkb.extend_from_slice(&4326u32.to_le_bytes());
        ewkb.extend_from_slice(&2u32.to_le_bytes());
        for v in &[0.0f64, 0.0, 5.0, 1.0, 1.0, 6.0] {
            ewkb.extend_from_slice(&v.to_le_bytes());
        }
        let decoded = WkbDecoder::decode(&ewkb[..]).unwrap();
        assert_eq!(decoded.shape_type(), ShapeType::PolyLineZ);
        assert_eq!(decoded.vertices.xy, shape.vertices.xy);
        assert_eq!(decoded.vertices.z, shape.vertices.z);
    }

    #[test]
    fn test_measured_linestring() {
        let wkb = le_line(2002, &[0.0, 0.0, 1.5, 3.0, 4.0, 2.5], 3);
        let shape = WkbDecoder::decode(&wkb[..]).unwrap();
        assert_eq!(shape.shape_type(), ShapeType::PolyLineM);
        let view = shape.view();
        assert_eq!(view.m, Some(&[1.5, 2.5][..]));
    }

    #[test]
    fn test_polygon_rings_are_oriented() {
        // counter-clockwise square
        let ring = [0.0f64, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0, 0.0, 0.0];
        let mut wkb = vec![1u8];
        wkb.extend_from_slice(&3u32.to_le_bytes());
        wkb.extend_from_slice(&1u32.to_le_bytes());
        wkb.extend_from_slice(&5u32.to_le_bytes());
        for v in &ring {
            wkb.extend_from_slice(&v.to_le_bytes());
        }
        let shape = WkbDecoder::decode(&wkb[..]).unwrap();
        assert_eq!(shape.shape_type(), ShapeType::Polygon);
        assert_eq!(&shape.vertices.xy[..4], &[0.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_collections() {
        let mut collection = vec![1u8];
        collection.extend_from_slice(&7u32.to_le_bytes());
        collection.extend_from_slice(&3u32.to_le_bytes());
        collection.extend(le_point(1.0, 1.0));
        collection.extend(le_point(2.0, 2.0));
        collection.extend(le_line(2, &[0.0, 0.0, 1.0, 1.0], 2));

        let packs = WkbDecoder::decode_packs(&collection[..]).unwrap();
        assert_eq!(packs.len(), 2);
        let points = packs.points.as_ref().unwrap();
        assert_eq!(points.shape_type(), ShapeType::MultiPoint);
        assert_eq!(points.num_points(), 2);
        assert_eq!(packs.lines.as_ref().unwrap().num_parts(), 1);
        assert!(packs.polygons.is_none());

        match WkbDecoder::decode(&collection[..]) {
            Err(ShapefileError::NotSupported(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_point_is_null() {
        let shape = WkbDecoder::decode(&le_point(f64::NAN, f64::NAN)[..]).unwrap();
        assert_eq!(shape.shape_type(), ShapeType::Null);
    }

    #[test]
    fn test_bad_input() {
        let mut bad_order = le_point(1.0, 1.0);
        bad_order[0] = 7;
        assert!(matches!(
            WkbDecoder::decode(&bad_order[..]),
            Err(ShapefileError::Format(_))
        ));
        let mut bad_type = le_point(1.0, 1.0);
        bad_type[1] = 9;
        assert!(matches!(
            WkbDecoder::decode(&bad_type[..]),
            Err(ShapefileError::Format(_))
        ));
        let truncated = &le_point(1.0, 1.0)[..12];
        assert!(matches!(
            WkbDecoder::decode(truncated),
            Err(ShapefileError::Io(_))
        ));
    }
}
