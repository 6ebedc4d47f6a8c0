/*
This code is part of the geocodec library.
License: MIT
*/
use super::attributes::FieldData;
use super::record::{content_length_words, has_m_block};
use crate::error::{Result, ShapefileError};
use crate::structures::{Coordinate, Extent, Point2D, Range};
use std::f64;
use std::fmt;

/// Shape type codes as they appear in the .shp/.shx headers and in every record.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
    MultiPatch = 31,
}

impl ShapeType {
    pub fn from_int(value: i32) -> Result<ShapeType> {
        let shape_type = match value {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            31 => ShapeType::MultiPatch,
            _ => return Err(ShapefileError::UnrecognizedShapeType(value)),
        };
        Ok(shape_type)
    }

    pub fn to_int(&self) -> i32 {
        *self as i32
    }

    /// The shape type with its M/Z flavour stripped, e.g. PolygonZ -> Polygon.
    pub fn base_shape_type(&self) -> ShapeType {
        match self {
            ShapeType::Null => ShapeType::Null,
            ShapeType::Point | ShapeType::PointM | ShapeType::PointZ => ShapeType::Point,
            ShapeType::MultiPoint | ShapeType::MultiPointM | ShapeType::MultiPointZ => {
                ShapeType::MultiPoint
            }
            ShapeType::PolyLine | ShapeType::PolyLineM | ShapeType::PolyLineZ => {
                ShapeType::PolyLine
            }
            ShapeType::Polygon | ShapeType::PolygonM | ShapeType::PolygonZ => ShapeType::Polygon,
            ShapeType::MultiPatch => ShapeType::MultiPatch,
        }
    }

    pub fn coordinate_type(&self) -> CoordinateType {
        match self {
            ShapeType::Null
            | ShapeType::Point
            | ShapeType::MultiPoint
            | ShapeType::PolyLine
            | ShapeType::Polygon => CoordinateType::Regular,
            ShapeType::PointM
            | ShapeType::MultiPointM
            | ShapeType::PolyLineM
            | ShapeType::PolygonM => CoordinateType::M,
            ShapeType::PointZ
            | ShapeType::MultiPointZ
            | ShapeType::PolyLineZ
            | ShapeType::PolygonZ
            | ShapeType::MultiPatch => CoordinateType::Z,
        }
    }

    /// Builds the concrete type for a base type and coordinate flavour.
    pub fn with_coordinate_type(base: ShapeType, coordinate_type: CoordinateType) -> ShapeType {
        use CoordinateType::*;
        match (base.base_shape_type(), coordinate_type) {
            (ShapeType::Point, Regular) => ShapeType::Point,
            (ShapeType::Point, M) => ShapeType::PointM,
            (ShapeType::Point, Z) => ShapeType::PointZ,
            (ShapeType::MultiPoint, Regular) => ShapeType::MultiPoint,
            (ShapeType::MultiPoint, M) => ShapeType::MultiPointM,
            (ShapeType::MultiPoint, Z) => ShapeType::MultiPointZ,
            (ShapeType::PolyLine, Regular) => ShapeType::PolyLine,
            (ShapeType::PolyLine, M) => ShapeType::PolyLineM,
            (ShapeType::PolyLine, Z) => ShapeType::PolyLineZ,
            (ShapeType::Polygon, Regular) => ShapeType::Polygon,
            (ShapeType::Polygon, M) => ShapeType::PolygonM,
            (ShapeType::Polygon, Z) => ShapeType::PolygonZ,
            (other, _) => other,
        }
    }

    /// True for types whose records may carry a measure block. Z types carry an
    /// optional one as well.
    pub fn has_m(&self) -> bool {
        self.coordinate_type() != CoordinateType::Regular
    }

    pub fn has_z(&self) -> bool {
        self.coordinate_type() == CoordinateType::Z
    }

    pub fn is_null(&self) -> bool {
        *self == ShapeType::Null
    }
}

impl Default for ShapeType {
    fn default() -> ShapeType {
        ShapeType::Null
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let printable = match *self {
            ShapeType::Null => "Null",
            ShapeType::Point => "Point",
            ShapeType::PolyLine => "PolyLine",
            ShapeType::Polygon => "Polygon",
            ShapeType::MultiPoint => "MultiPoint",
            ShapeType::PointZ => "PointZ",
            ShapeType::PolyLineZ => "PolyLineZ",
            ShapeType::PolygonZ => "PolygonZ",
            ShapeType::MultiPointZ => "MultiPointZ",
            ShapeType::PointM => "PointM",
            ShapeType::PolyLineM => "PolyLineM",
            ShapeType::PolygonM => "PolygonM",
            ShapeType::MultiPointM => "MultiPointM",
            ShapeType::MultiPatch => "MultiPatch",
        };
        write!(f, "{}", printable)
    }
}

/// Coordinate flavour of a shape type. Z implies an optional M block.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoordinateType {
    Regular,
    M,
    Z,
}

/// One part (ring or line) of a shape.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PartRange {
    /// First vertex of the part, relative to the shape, as stored on disk.
    pub start_index: usize,
    pub num_vertices: usize,
    /// First vertex of the part in the owning `VertexStore`.
    pub offset: usize,
}

impl PartRange {
    /// Builds part ranges from on-disk part starts. The last part runs to the
    /// end of the shape.
    pub fn from_starts(starts: &[i32], num_points: usize, offset: usize) -> Result<Vec<PartRange>> {
        let mut parts = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = match starts.get(i + 1) {
                Some(&next) => next,
                None => num_points as i32,
            };
            if start < 0 || start as usize >= num_points.max(1) || end < start {
                return Err(ShapefileError::Format(format!(
                    "part {} starts at vertex {} (next part at {}, {} vertices)",
                    i, start, end, num_points
                )));
            }
            parts.push(PartRange {
                start_index: start as usize,
                num_vertices: (end - start) as usize,
                offset: offset + start as usize,
            });
        }
        Ok(parts)
    }
}

/// Describes one record: where its vertices live in the arena, how its parts
/// are laid out, and the bounds declared for it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeRange {
    /// 1-based; 0 for shapes not yet added to a file.
    pub record_number: i32,
    /// Record content length in 16-bit words, excluding the 8-byte record header.
    pub content_length: i32,
    pub shape_type: ShapeType,
    /// Offset of the shape's first vertex in the arena.
    pub start_index: usize,
    pub num_points: usize,
    pub parts: Vec<PartRange>,
    pub extent: Extent,
}

impl ShapeRange {
    pub fn null(record_number: i32) -> ShapeRange {
        ShapeRange {
            record_number,
            content_length: 2,
            ..Default::default()
        }
    }

    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    pub fn is_null(&self) -> bool {
        self.shape_type.is_null()
    }

    /// Whether the record carries the optional measure block. The format has
    /// no flag for it; the content length is compared against the mandatory
    /// byte count instead.
    pub fn has_m_block(&self) -> bool {
        has_m_block(
            self.shape_type,
            self.content_length,
            self.parts.len(),
            self.num_points,
        )
    }

    /// Moves the shape to a new arena offset.
    pub fn relocate(&mut self, start_index: usize) {
        self.start_index = start_index;
        for part in self.parts.iter_mut() {
            part.offset = start_index + part.start_index;
        }
    }
}

/// Flat vertex arena shared by all shapes of a file. Z and M columns are only
/// allocated for shape types that can carry them. Vertices of shapes without
/// an M block hold NaN in the M column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexStore {
    pub xy: Vec<f64>,
    pub z: Option<Vec<f64>>,
    pub m: Option<Vec<f64>>,
}

impl VertexStore {
    pub fn new(shape_type: ShapeType) -> VertexStore {
        VertexStore {
            xy: vec![],
            z: if shape_type.has_z() { Some(vec![]) } else { None },
            m: if shape_type.has_m() { Some(vec![]) } else { None },
        }
    }

    /// Allocates room for `num_vertices` vertices in one go.
    pub fn allocate(shape_type: ShapeType, num_vertices: usize) -> VertexStore {
        VertexStore {
            xy: vec![0f64; 2 * num_vertices],
            z: if shape_type.has_z() {
                Some(vec![0f64; num_vertices])
            } else {
                None
            },
            m: if shape_type.has_m() {
                Some(vec![f64::NAN; num_vertices])
            } else {
                None
            },
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.xy.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.xy.is_empty()
    }

    /// Appends a vertex. Columns this store does not carry ignore the value;
    /// missing values are filled with 0 (Z) or NaN (M).
    pub fn push(&mut self, x: f64, y: f64, z: Option<f64>, m: Option<f64>) {
        self.xy.push(x);
        self.xy.push(y);
        if let Some(zs) = self.z.as_mut() {
            zs.push(z.unwrap_or(0f64));
        }
        if let Some(ms) = self.m.as_mut() {
            ms.push(m.unwrap_or(f64::NAN));
        }
    }

    /// Appends every vertex of a view.
    pub fn extend_from_view(&mut self, view: &ShapeView) {
        self.xy.extend_from_slice(view.xy);
        if let Some(zs) = self.z.as_mut() {
            match view.z {
                Some(z) => zs.extend_from_slice(z),
                None => zs.extend(std::iter::repeat(0f64).take(view.num_points())),
            }
        }
        if let Some(ms) = self.m.as_mut() {
            match view.m {
                Some(m) => ms.extend_from_slice(m),
                None => ms.extend(std::iter::repeat(f64::NAN).take(view.num_points())),
            }
        }
    }

    /// Removes `count` vertices starting at `start`.
    pub fn remove_range(&mut self, start: usize, count: usize) {
        self.xy.drain(2 * start..2 * (start + count));
        if let Some(zs) = self.z.as_mut() {
            zs.drain(start..start + count);
        }
        if let Some(ms) = self.m.as_mut() {
            ms.drain(start..start + count);
        }
    }
}

/// A borrowed look at one shape: its range plus the slices of the arena that
/// hold its vertices. Slices are shape-relative; `m` is only present when the
/// record carries a measure block.
#[derive(Clone, Copy, Debug)]
pub struct ShapeView<'a> {
    pub range: &'a ShapeRange,
    pub xy: &'a [f64],
    pub z: Option<&'a [f64]>,
    pub m: Option<&'a [f64]>,
}

impl<'a> ShapeView<'a> {
    pub fn new(range: &'a ShapeRange, store: &'a VertexStore) -> Result<ShapeView<'a>> {
        let start = range.start_index;
        let end = start + range.num_points;
        if end > store.num_vertices() {
            return Err(ShapefileError::OutOfBounds {
                index: end,
                len: store.num_vertices(),
            });
        }
        let z = match (&store.z, range.shape_type.has_z()) {
            (Some(z), true) => Some(&z[start..end]),
            _ => None,
        };
        let m = match (&store.m, range.has_m_block()) {
            (Some(m), true) => Some(&m[start..end]),
            _ => None,
        };
        Ok(ShapeView {
            range,
            xy: &store.xy[2 * start..2 * end],
            z,
            m,
        })
    }

    pub fn shape_type(&self) -> ShapeType {
        self.range.shape_type
    }

    pub fn num_parts(&self) -> usize {
        self.range.parts.len()
    }

    pub fn num_points(&self) -> usize {
        self.range.num_points
    }

    pub fn is_null(&self) -> bool {
        self.range.is_null()
    }

    pub fn part_xy(&self, part: usize) -> &'a [f64] {
        let p = &self.range.parts[part];
        &self.xy[2 * p.start_index..2 * (p.start_index + p.num_vertices)]
    }

    pub fn part_z(&self, part: usize) -> Option<&'a [f64]> {
        let p = &self.range.parts[part];
        self.z
            .map(|z| &z[p.start_index..p.start_index + p.num_vertices])
    }

    pub fn part_m(&self, part: usize) -> Option<&'a [f64]> {
        let p = &self.range.parts[part];
        self.m
            .map(|m| &m[p.start_index..p.start_index + p.num_vertices])
    }

    pub fn point(&self, index: usize) -> Point2D {
        Point2D::from_xy(self.xy, index)
    }

    /// The vertex at `index` with its Z and M values. NaN measures are absent.
    pub fn coordinate(&self, index: usize) -> Coordinate {
        Coordinate {
            x: self.xy[2 * index],
            y: self.xy[2 * index + 1],
            z: self.z.map(|z| z[index]),
            m: self.m.map(|m| m[index]).filter(|v| !v.is_nan()),
        }
    }

    pub fn part_coordinates(&self, part: usize) -> Vec<Coordinate> {
        let p = &self.range.parts[part];
        (p.start_index..p.start_index + p.num_vertices)
            .map(|i| self.coordinate(i))
            .collect()
    }
}

/// A shape that owns its vertices, detached from any file. Used to build new
/// records and to hand single records out of a file.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub range: ShapeRange,
    pub vertices: VertexStore,
    pub attributes: Option<Vec<FieldData>>,
}

impl Shape {
    pub fn new(shape_type: ShapeType) -> Shape {
        let mut range = ShapeRange {
            shape_type,
            ..Default::default()
        };
        range.content_length = content_length_words(shape_type, 0, 0, shape_type.has_m());
        Shape {
            range,
            vertices: VertexStore::new(shape_type),
            attributes: None,
        }
    }

    pub fn null() -> Shape {
        Shape::new(ShapeType::Null)
    }

    /// Copies a borrowed shape into an owned one.
    pub fn from_view(view: &ShapeView) -> Shape {
        let mut vertices = VertexStore::new(view.shape_type());
        vertices.extend_from_view(view);
        let mut range = view.range.clone();
        range.relocate(0);
        Shape {
            range,
            vertices,
            attributes: None,
        }
    }

    pub fn with_attributes(mut self, row: Vec<FieldData>) -> Shape {
        self.attributes = Some(row);
        self
    }

    pub fn shape_type(&self) -> ShapeType {
        self.range.shape_type
    }

    pub fn num_parts(&self) -> usize {
        self.range.parts.len()
    }

    pub fn num_points(&self) -> usize {
        self.range.num_points
    }

    pub fn extent(&self) -> &Extent {
        &self.range.extent
    }

    pub fn view(&self) -> ShapeView {
        let n = self.range.num_points;
        ShapeView {
            range: &self.range,
            xy: &self.vertices.xy[..2 * n],
            z: self.vertices.z.as_ref().map(|z| &z[..n]),
            m: if self.range.has_m_block() {
                self.vertices.m.as_ref().map(|m| &m[..n])
            } else {
                None
            },
        }
    }

    /// Adds a single point. Point shapes hold exactly one; MultiPoint shapes
    /// collect them into their single part.
    pub fn add_point(&mut self, p: Point2D) -> Result<()> {
        self.push_vertices(&[p], None, None)
    }

    pub fn add_point_m(&mut self, p: Point2D, m: f64) -> Result<()> {
        self.push_vertices(&[p], None, Some(&[m]))
    }

    pub fn add_point_z(&mut self, p: Point2D, z: f64, m: Option<f64>) -> Result<()> {
        match m {
            Some(m) => self.push_vertices(&[p], Some(&[z]), Some(&[m])),
            None => self.push_vertices(&[p], Some(&[z]), None),
        }
    }

    /// Adds a part (line or ring) of points.
    pub fn add_part(&mut self, points: &[Point2D]) -> Result<()> {
        self.push_vertices(points, None, None)
    }

    /// Adds a part of points and measures.
    pub fn add_part_m(&mut self, points: &[Point2D], measures: &[f64]) -> Result<()> {
        self.push_vertices(points, None, Some(measures))
    }

    /// Adds a part of points, z-values and, optionally, measures.
    pub fn add_part_z(
        &mut self,
        points: &[Point2D],
        z_values: &[f64],
        measures: Option<&[f64]>,
    ) -> Result<()> {
        self.push_vertices(points, Some(z_values), measures)
    }

    fn push_vertices(
        &mut self,
        points: &[Point2D],
        z_values: Option<&[f64]>,
        measures: Option<&[f64]>,
    ) -> Result<()> {
        let shape_type = self.range.shape_type;
        match shape_type.base_shape_type() {
            ShapeType::Null => {
                return Err(ShapefileError::InvariantViolation(
                    "cannot add vertices to a null shape".to_string(),
                ))
            }
            ShapeType::MultiPatch => {
                return Err(ShapefileError::NotSupported(
                    "MultiPatch shapes cannot be built".to_string(),
                ))
            }
            ShapeType::Point if self.range.num_points + points.len() > 1 => {
                return Err(ShapefileError::InvariantViolation(format!(
                    "a {} shape holds exactly one point",
                    shape_type
                )))
            }
            _ => {}
        }
        if let Some(z) = z_values {
            if !shape_type.has_z() {
                return Err(ShapefileError::InvariantViolation(format!(
                    "{} shapes do not carry z-values",
                    shape_type
                )));
            }
            if z.len() != points.len() {
                return Err(ShapefileError::InvariantViolation(
                    "points and z-values must be of equal length".to_string(),
                ));
            }
        } else if shape_type.has_z() {
            return Err(ShapefileError::InvariantViolation(format!(
                "{} shapes require z-values",
                shape_type
            )));
        }
        if let Some(m) = measures {
            if !shape_type.has_m() {
                return Err(ShapefileError::InvariantViolation(format!(
                    "{} shapes do not carry measures",
                    shape_type
                )));
            }
            if m.len() != points.len() {
                return Err(ShapefileError::InvariantViolation(
                    "points and measures must be of equal length".to_string(),
                ));
            }
        }

        let start = self.range.num_points;
        match shape_type.base_shape_type() {
            ShapeType::PolyLine | ShapeType::Polygon => self.range.parts.push(PartRange {
                start_index: start,
                num_vertices: points.len(),
                offset: self.range.start_index + start,
            }),
            _ => match self.range.parts.first_mut() {
                Some(part) => part.num_vertices += points.len(),
                None => self.range.parts.push(PartRange {
                    start_index: 0,
                    num_vertices: points.len(),
                    offset: self.range.start_index,
                }),
            },
        }

        let extent = &mut self.range.extent;
        for (i, p) in points.iter().enumerate() {
            let z = z_values.map(|z| z[i]);
            let m = measures.map(|m| m[i]);
            self.vertices.push(p.x, p.y, z, m);
            extent.expand_to_include(p.x, p.y);
            if let Some(z) = z {
                extent.z = Range::include(extent.z, z);
            }
            if let Some(m) = m {
                extent.m = Range::include(extent.m, m);
            }
        }
        self.range.num_points += points.len();
        self.range.content_length = content_length_words(
            shape_type,
            self.range.parts.len(),
            self.range.num_points,
            shape_type.has_m(),
        );
        Ok(())
    }

    /// Checks that the vertex columns agree with the range.
    pub fn validate(&self) -> Result<()> {
        let n = self.range.num_points;
        let counted: usize = self.range.parts.iter().map(|p| p.num_vertices).sum();
        if self.vertices.num_vertices() != n || (!self.range.parts.is_empty() && counted != n) {
            return Err(ShapefileError::InvariantViolation(format!(
                "shape declares {} vertices, parts cover {}, store holds {}",
                n,
                counted,
                self.vertices.num_vertices()
            )));
        }
        let column_ok = |c: &Option<Vec<f64>>| c.as_ref().map_or(true, |v| v.len() == n);
        if !column_ok(&self.vertices.z) || !column_ok(&self.vertices.m) {
            return Err(ShapefileError::InvariantViolation(
                "z/m columns must hold one value per vertex".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "shape_type: {}\nnum_parts: {}\nnum_points: {}\nextent: {:?}",
            self.range.shape_type,
            self.range.parts.len(),
            self.range.num_points,
            self.range.extent
        )
    }
}
