/*
This code is part of the geocodec library.
License: MIT
*/
use super::shapefile::attributes::FieldData;
use super::shapefile::geometry::{CoordinateType, Shape, ShapeType, ShapeView};
use super::shapefile::rings::{classify_rings, orient_ring};
use crate::configs::UnmatchedHolePolicy;
use crate::error::{Result, ShapefileError};
use crate::structures::{Coordinate, Point2D};
use std::f64;

/// A polygon with one exterior ring and any number of holes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonGeometry {
    pub exterior: Vec<Coordinate>,
    pub interiors: Vec<Vec<Coordinate>>,
}

impl PolygonGeometry {
    pub fn new(exterior: Vec<Coordinate>) -> PolygonGeometry {
        PolygonGeometry {
            exterior,
            interiors: vec![],
        }
    }

    pub fn with_hole(mut self, hole: Vec<Coordinate>) -> PolygonGeometry {
        self.interiors.push(hole);
        self
    }

    fn rings(&self) -> impl Iterator<Item = &Vec<Coordinate>> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }
}

/// The base kinds a shapefile can hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    Line,
    Polygon,
}

impl GeometryKind {
    pub fn base_shape_type(&self) -> ShapeType {
        match self {
            GeometryKind::Point => ShapeType::Point,
            GeometryKind::MultiPoint => ShapeType::MultiPoint,
            GeometryKind::Line => ShapeType::PolyLine,
            GeometryKind::Polygon => ShapeType::Polygon,
        }
    }
}

/// A materialized geometry. Coordinates carry z and m when the record has them.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    MultiPoint(Vec<Coordinate>),
    LineString(Vec<Coordinate>),
    MultiLineString(Vec<Vec<Coordinate>>),
    Polygon(PolygonGeometry),
    MultiPolygon(Vec<PolygonGeometry>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::LineString(_) | Geometry::MultiLineString(_) => GeometryKind::Line,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => GeometryKind::Polygon,
        }
    }

    fn for_each_coordinate<F: FnMut(&Coordinate)>(&self, mut f: F) {
        match self {
            Geometry::Point(c) => f(c),
            Geometry::MultiPoint(cs) | Geometry::LineString(cs) => cs.iter().for_each(f),
            Geometry::MultiLineString(lines) => lines.iter().flatten().for_each(f),
            Geometry::Polygon(poly) => poly.rings().flatten().for_each(f),
            Geometry::MultiPolygon(polys) => {
                polys.iter().flat_map(|p| p.rings()).flatten().for_each(f)
            }
        }
    }

    pub fn num_points(&self) -> usize {
        let mut n = 0;
        self.for_each_coordinate(|_| n += 1);
        n
    }

    /// Z if any coordinate has a z-value, else M if any has a measure.
    pub fn coordinate_type(&self) -> CoordinateType {
        let (mut has_z, mut has_m) = (false, false);
        self.for_each_coordinate(|c| {
            has_z |= c.z.is_some();
            has_m |= c.m.is_some();
        });
        if has_z {
            CoordinateType::Z
        } else if has_m {
            CoordinateType::M
        } else {
            CoordinateType::Regular
        }
    }
}

/// One record with its geometry and attribute row.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub record_number: i32,
    /// `None` for null shapes.
    pub geometry: Option<Geometry>,
    pub attributes: Option<Vec<FieldData>>,
}

/// Builds the geometry a record describes. Null and empty records have none.
pub fn materialize(view: &ShapeView, unmatched_holes: UnmatchedHolePolicy) -> Option<Geometry> {
    if view.is_null() || view.num_points() == 0 {
        return None;
    }
    match view.shape_type().base_shape_type() {
        ShapeType::Point => Some(Geometry::Point(view.coordinate(0))),
        ShapeType::MultiPoint => Some(Geometry::MultiPoint(
            (0..view.num_points()).map(|i| view.coordinate(i)).collect(),
        )),
        ShapeType::PolyLine => {
            let mut lines: Vec<Vec<Coordinate>> = (0..view.num_parts())
                .map(|part| view.part_coordinates(part))
                .collect();
            match lines.len() {
                0 => None,
                1 => lines.pop().map(Geometry::LineString),
                _ => Some(Geometry::MultiLineString(lines)),
            }
        }
        ShapeType::Polygon => {
            let rings: Vec<&[f64]> = (0..view.num_parts()).map(|p| view.part_xy(p)).collect();
            let mut polygons: Vec<PolygonGeometry> = classify_rings(&rings, unmatched_holes)
                .into_iter()
                .map(|group| PolygonGeometry {
                    exterior: view.part_coordinates(group.shell),
                    interiors: group
                        .holes
                        .iter()
                        .map(|h| view.part_coordinates(*h))
                        .collect(),
                })
                .collect();
            match polygons.len() {
                0 => None,
                1 => polygons.pop().map(Geometry::Polygon),
                _ => Some(Geometry::MultiPolygon(polygons)),
            }
        }
        _ => None,
    }
}

fn add_coordinates(shape: &mut Shape, coords: &[Coordinate]) -> Result<()> {
    let shape_type = shape.shape_type();
    let points: Vec<Point2D> = coords.iter().map(|c| c.xy()).collect();
    let measures: Option<Vec<f64>> = if shape_type.has_m() && coords.iter().any(|c| c.m.is_some()) {
        Some(coords.iter().map(|c| c.m.unwrap_or(f64::NAN)).collect())
    } else {
        None
    };
    if shape_type.has_z() {
        let z: Vec<f64> = coords.iter().map(|c| c.z.unwrap_or(0f64)).collect();
        shape.add_part_z(&points, &z, measures.as_deref())
    } else if let Some(m) = measures {
        shape.add_part_m(&points, &m)
    } else {
        shape.add_part(&points)
    }
}

fn add_polygon(shape: &mut Shape, polygon: &PolygonGeometry) -> Result<()> {
    let mut exterior = polygon.exterior.clone();
    orient_ring(&mut exterior, true);
    add_coordinates(shape, &exterior)?;
    for hole in &polygon.interiors {
        let mut hole = hole.clone();
        orient_ring(&mut hole, false);
        add_coordinates(shape, &hole)?;
    }
    Ok(())
}

impl Shape {
    /// Builds a shape from a geometry, picking the coordinate flavour from the
    /// geometry's coordinates.
    pub fn from_geometry(geometry: &Geometry) -> Result<Shape> {
        Shape::from_geometry_with(geometry, geometry.coordinate_type())
    }

    /// Builds a shape of the given coordinate flavour. Polygon exteriors are
    /// stored clockwise and holes counter-clockwise.
    pub fn from_geometry_with(geometry: &Geometry, coordinate_type: CoordinateType) -> Result<Shape> {
        let shape_type =
            ShapeType::with_coordinate_type(geometry.kind().base_shape_type(), coordinate_type);
        let mut shape = Shape::new(shape_type);
        match geometry {
            Geometry::Point(c) => add_coordinates(&mut shape, &[*c])?,
            Geometry::MultiPoint(cs) | Geometry::LineString(cs) => add_coordinates(&mut shape, cs)?,
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    add_coordinates(&mut shape, line)?;
                }
            }
            Geometry::Polygon(polygon) => add_polygon(&mut shape, polygon)?,
            Geometry::MultiPolygon(polygons) => {
                if polygons.is_empty() {
                    return Err(ShapefileError::InvariantViolation(
                        "a multipolygon needs at least one polygon".to_string(),
                    ));
                }
                for polygon in polygons {
                    add_polygon(&mut shape, polygon)?;
                }
            }
        }
        Ok(shape)
    }
}
